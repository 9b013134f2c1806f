//! Tile texture export command

use anyhow::{Context, Result};
#[allow(unused_imports)]
use tracing::{debug, info, trace};

use super::GlobalOpts;
use crate::TextureArgs;

pub fn run(args: TextureArgs, opts: &GlobalOpts) -> Result<()> {
    let mut config = super::load_config(opts)?;
    config.engine = grade_compute::Engine::Cpu;
    let (engine, _) = super::build_engine(config, None)?;

    let bytes = super::read_bytes(&args.lut)?;
    let volume = engine
        .parse_cube(&bytes)
        .with_context(|| format!("Failed to parse LUT: {}", args.lut.display()))?;
    let png = engine.export_texture(&volume)?;
    super::write_bytes(&args.output, &png)?;

    let n = volume.size();
    info!(size = n, output = %args.output.display(), "texture exported");
    if opts.verbose > 0 {
        println!("Wrote {}x{} texture to {}", n * n, n, args.output.display());
    }
    Ok(())
}
