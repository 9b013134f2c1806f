//! LUT synthesis command

use anyhow::{Context, Result};
use grade_ops::AdjustmentSettings;
#[allow(unused_imports)]
use tracing::{debug, info, trace};

use super::GlobalOpts;
use crate::BuildArgs;

pub fn run(args: BuildArgs, opts: &GlobalOpts) -> Result<()> {
    let mut settings = match &args.settings {
        Some(path) => super::load_settings(path)?,
        None => AdjustmentSettings::default(),
    };
    if let Some(resolution) = args.resolution {
        settings.resolution = resolution;
    }

    let mut config = super::load_config(opts)?;
    // synthesis never samples, no need to probe for a device
    config.engine = grade_compute::Engine::Cpu;
    let (engine, _) = super::build_engine(config, None)?;

    let text = engine.procedural_cube(&settings).context("Failed to synthesize LUT")?;
    super::write_bytes(&args.output, text.as_bytes())?;
    info!(output = %args.output.display(), size = settings.grid_size(), "LUT written");

    if let Some(path) = &args.texture {
        let volume = engine.build_procedural(&settings)?;
        let png = engine.export_texture(&volume)?;
        super::write_bytes(path, &png)?;
        debug!(texture = %path.display(), "texture written");
    }

    if opts.verbose > 0 {
        println!(
            "Wrote {}^3 LUT to {}",
            settings.grid_size(),
            args.output.display()
        );
    }
    Ok(())
}
