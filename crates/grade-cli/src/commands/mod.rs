//! CLI command implementations

pub mod apply;
pub mod backends;
pub mod batch;
pub mod build;
pub mod matching;
pub mod plan;
pub mod texture;

use anyhow::{Context, Result, bail};
use grade_compute::Engine;
use grade_engine::{EngineConfig, GradingEngine, Transform};
use grade_io::{ImageData, OutputFormat};
use grade_ops::AdjustmentSettings;
use std::path::{Path, PathBuf};

use crate::TransformArgs;

/// Options shared by every command.
pub struct GlobalOpts {
    pub config: Option<PathBuf>,
    pub threads: Option<usize>,
    pub verbose: u8,
}

/// Config file (or defaults) with environment and CLI overrides applied.
pub fn load_config(opts: &GlobalOpts) -> Result<EngineConfig> {
    let config = match &opts.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let mut config = config.with_env_overrides();
    if let Some(threads) = opts.threads {
        config.workers = threads;
    }
    Ok(config)
}

/// Builds the engine; `engine` overrides the configured one.
pub fn build_engine(mut config: EngineConfig, engine: Option<&str>) -> Result<(GradingEngine, Engine)> {
    if let Some(name) = engine {
        config.engine = Engine::parse(name)?;
    }
    let selected = config.engine;
    let engine = GradingEngine::new(config).context("Failed to initialize grading engine")?;
    Ok((engine, selected))
}

/// Reads a file into memory.
pub fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read: {}", path.display()))
}

/// Reads and decodes an image.
pub fn load_image(path: &Path) -> Result<ImageData> {
    grade_io::decode(&read_bytes(path)?)
        .with_context(|| format!("Failed to decode: {}", path.display()))
}

/// Writes bytes, creating parent directories.
pub fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create: {}", parent.display()))?;
    }
    std::fs::write(path, bytes).with_context(|| format!("Failed to write: {}", path.display()))
}

/// Reads adjustment settings from YAML.
pub fn load_settings(path: &Path) -> Result<AdjustmentSettings> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings: {}", path.display()))?;
    let settings: AdjustmentSettings = serde_yaml::from_str(&text)
        .with_context(|| format!("Invalid settings: {}", path.display()))?;
    Ok(settings)
}

/// Turns the mutually exclusive transform flags into a [`Transform`].
pub fn load_transform(args: &TransformArgs) -> Result<Transform> {
    if let Some(lut) = &args.lut {
        return Ok(Transform::Cube(read_bytes(lut)?));
    }
    if let Some(name) = &args.preset {
        return Ok(Transform::Preset(name.clone()));
    }
    if let Some(settings) = &args.settings {
        return Ok(Transform::Procedural(load_settings(settings)?));
    }
    bail!("One of --lut, --preset or --settings is required")
}

/// Output format from a name such as `png` or `jpg`.
pub fn format_from_name(name: &str, quality: u8) -> Result<OutputFormat> {
    match name.to_ascii_lowercase().as_str() {
        "png" => Ok(OutputFormat::Png),
        "jpg" | "jpeg" => Ok(OutputFormat::Jpeg { quality }),
        other => bail!("Unsupported output format: {}", other),
    }
}

/// Output format from a file extension.
pub fn format_for_path(path: &Path, quality: u8) -> Result<OutputFormat> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    format_from_name(ext, quality)
        .with_context(|| format!("Cannot infer output format from: {}", path.display()))
}

/// Files matching a glob pattern, sorted.
pub fn expand_glob(pattern: &str) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = glob::glob(pattern)
        .with_context(|| format!("Invalid pattern: {}", pattern))?
        .filter_map(|r| r.ok())
        .filter(|p| p.is_file())
        .collect();
    if files.is_empty() {
        bail!("No files match pattern: {}", pattern);
    }
    files.sort();
    Ok(files)
}

/// `<dir>/<stem>.<ext>`.
pub fn output_path(dir: &Path, input: &Path, ext: &str) -> PathBuf {
    let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("output");
    dir.join(format!("{}.{}", stem, ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_from_extension() {
        assert_eq!(format_for_path(Path::new("a.PNG"), 90).unwrap(), OutputFormat::Png);
        assert_eq!(
            format_for_path(Path::new("b.jpeg"), 90).unwrap(),
            OutputFormat::Jpeg { quality: 90 }
        );
        assert!(format_for_path(Path::new("c.tiff"), 90).is_err());
        assert!(format_for_path(Path::new("noext"), 90).is_err());
    }

    #[test]
    fn output_paths() {
        let p = output_path(Path::new("out"), Path::new("album/IMG_01.jpg"), "png");
        assert_eq!(p, PathBuf::from("out/IMG_01.png"));
    }

    #[test]
    fn settings_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("look.yaml");
        std::fs::write(&path, "exposure: 0.5\ncurves:\n  master: [{x: 0.0, y: 0.1}, {x: 1.0, y: 0.9}]\n").unwrap();
        let settings = load_settings(&path).unwrap();
        assert_eq!(settings.exposure, 0.5);
        assert_eq!(settings.curves.master.len(), 2);
    }

    #[test]
    fn glob_without_matches() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = format!("{}/*.jpg", dir.path().display());
        assert!(expand_glob(&pattern).is_err());
    }
}
