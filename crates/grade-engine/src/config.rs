//! Engine configuration.
//!
//! Loaded from YAML, then overridden from the environment:
//!
//! ```yaml
//! engine: auto          # auto | cpu | gpu
//! memory_fraction: 0.5  # share of device memory a batch chunk may use
//! gpu_memory_mb: 8192   # replaces detected device memory
//! working_resolution: 512
//! workers: 0            # 0 = one per core, 1 = sequential
//! jpeg_quality: 92
//! output: jpeg          # jpeg | png
//! lut_dir: /srv/luts
//! ```
//!
//! # Environment Variables
//!
//! - `GRADE_BACKEND` - `engine`
//! - `GRADE_GPU_MEMORY_MB` - `gpu_memory_mb`
//! - `GRADE_MEMORY_FRACTION` - `memory_fraction`, accepted inside `(0, 1]`
//! - `GRADE_WORKERS` - `workers`
//! - `GRADE_JPEG_QUALITY` - `jpeg_quality`, accepted inside `1..=100`
//! - `GRADE_LUT_DIR` - `lut_dir`

use std::path::{Path, PathBuf};

use grade_compute::memory::DEFAULT_MEMORY_FRACTION;
use grade_compute::{DeviceLimits, Engine};
use grade_io::{DEFAULT_JPEG_QUALITY, OutputFormat};
use grade_ops::DEFAULT_WORKING_RESOLUTION;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{EngineError, EngineResult};

/// Encoded output kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    #[default]
    Jpeg,
    Png,
}

/// Engine settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Default execution engine.
    pub engine: Engine,
    /// Share of device memory one batch chunk may occupy.
    pub memory_fraction: f64,
    /// Device memory in megabytes; `None` uses detection.
    pub gpu_memory_mb: Option<u64>,
    /// Longest side of images used to build histograms.
    pub working_resolution: u32,
    /// Worker threads for per-image CPU work.
    pub workers: usize,
    /// JPEG encoder quality.
    pub jpeg_quality: u8,
    /// Default output encoding.
    pub output: OutputKind,
    /// Directory of preset `.cube` files.
    pub lut_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            engine: Engine::Auto,
            memory_fraction: DEFAULT_MEMORY_FRACTION,
            gpu_memory_mb: None,
            working_resolution: DEFAULT_WORKING_RESOLUTION,
            workers: 0,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            output: OutputKind::Jpeg,
            lut_dir: None,
        }
    }
}

impl EngineConfig {
    /// Parses YAML; missing fields take their defaults.
    pub fn from_yaml(yaml: &str) -> EngineResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a YAML config file.
    pub fn from_file(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        debug!(path = %path.display(), "loading engine config");
        Self::from_yaml(&text)
    }

    /// Applies `GRADE_*` environment overrides.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from `var`, a lookup by environment variable name.
    ///
    /// Unparseable or out-of-range values are ignored with a warning.
    pub fn with_overrides<F>(mut self, var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| var(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("GRADE_BACKEND") {
            match Engine::parse(&v) {
                Ok(engine) => self.engine = engine,
                Err(e) => warn!(value = %v, error = %e, "ignoring GRADE_BACKEND"),
            }
        }
        if let Some(v) = get("GRADE_GPU_MEMORY_MB") {
            match v.parse::<u64>() {
                Ok(mb) if mb > 0 => self.gpu_memory_mb = Some(mb),
                _ => warn!(value = %v, "ignoring GRADE_GPU_MEMORY_MB"),
            }
        }
        if let Some(v) = get("GRADE_MEMORY_FRACTION") {
            match v.parse::<f64>() {
                Ok(f) if f > 0.0 && f <= 1.0 => self.memory_fraction = f,
                _ => warn!(value = %v, "ignoring GRADE_MEMORY_FRACTION"),
            }
        }
        if let Some(v) = get("GRADE_WORKERS") {
            match v.parse::<usize>() {
                Ok(n) => self.workers = n,
                Err(_) => warn!(value = %v, "ignoring GRADE_WORKERS"),
            }
        }
        if let Some(v) = get("GRADE_JPEG_QUALITY") {
            match v.parse::<u8>() {
                Ok(q) if (1..=100).contains(&q) => self.jpeg_quality = q,
                _ => warn!(value = %v, "ignoring GRADE_JPEG_QUALITY"),
            }
        }
        if let Some(v) = get("GRADE_LUT_DIR") {
            self.lut_dir = Some(PathBuf::from(v));
        }
        self
    }

    /// Checks value ranges.
    pub fn validate(&self) -> EngineResult<()> {
        if !(self.memory_fraction > 0.0 && self.memory_fraction <= 1.0) {
            return Err(EngineError::Config(format!(
                "memory_fraction must be in (0, 1], got {}",
                self.memory_fraction
            )));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(EngineError::Config(format!(
                "jpeg_quality must be in 1..=100, got {}",
                self.jpeg_quality
            )));
        }
        if self.working_resolution == 0 {
            return Err(EngineError::Config("working_resolution must be positive".into()));
        }
        Ok(())
    }

    /// Default output encoding.
    pub fn output_format(&self) -> OutputFormat {
        match self.output {
            OutputKind::Jpeg => OutputFormat::Jpeg { quality: self.jpeg_quality },
            OutputKind::Png => OutputFormat::Png,
        }
    }

    /// Device limits pinned by `gpu_memory_mb`, if set.
    pub fn device_limits(&self) -> Option<DeviceLimits> {
        self.gpu_memory_mb
            .map(|mb| DeviceLimits::with_memory(mb.saturating_mul(1024 * 1024)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_yaml_is_default() {
        let config = EngineConfig::from_yaml("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.output_format(), OutputFormat::Jpeg { quality: 92 });
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = "
engine: cpu
memory_fraction: 0.25
gpu_memory_mb: 512
working_resolution: 256
workers: 1
jpeg_quality: 90
output: png
lut_dir: /tmp/luts
";
        let config = EngineConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.engine, Engine::Cpu);
        assert_eq!(config.workers, 1);
        assert_eq!(config.output_format(), OutputFormat::Png);
        assert_eq!(config.device_limits().map(|l| l.total_memory), Some(512 << 20));
        assert_eq!(config.lut_dir, Some(PathBuf::from("/tmp/luts")));
    }

    #[test]
    fn unknown_engine_rejected() {
        assert!(EngineConfig::from_yaml("engine: cuda").is_err());
    }

    #[test]
    fn out_of_range_values_rejected() {
        assert!(EngineConfig::from_yaml("memory_fraction: 1.5").is_err());
        assert!(EngineConfig::from_yaml("jpeg_quality: 0").is_err());
        assert!(EngineConfig::from_yaml("colour: red").is_err());
    }

    #[test]
    fn overrides_apply_on_top() {
        let vars: HashMap<&str, &str> = [
            ("GRADE_BACKEND", "gpu"),
            ("GRADE_WORKERS", "4"),
            ("GRADE_JPEG_QUALITY", "95"),
            ("GRADE_MEMORY_FRACTION", "2.0"),
            ("GRADE_LUT_DIR", "presets"),
        ]
        .into_iter()
        .collect();
        let config = EngineConfig::default().with_overrides(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.engine, Engine::Gpu);
        assert_eq!(config.workers, 4);
        assert_eq!(config.jpeg_quality, 95);
        // out of range, kept
        assert_eq!(config.memory_fraction, 0.5);
        assert_eq!(config.lut_dir, Some(PathBuf::from("presets")));
    }
}
