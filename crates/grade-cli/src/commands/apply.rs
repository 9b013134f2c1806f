//! Single-image grading command

use anyhow::{Context, Result};
#[allow(unused_imports)]
use tracing::{debug, info, trace};

use super::GlobalOpts;
use crate::ApplyArgs;

pub fn run(args: ApplyArgs, opts: &GlobalOpts) -> Result<()> {
    trace!(input = %args.input.display(), "apply::run");
    let config = super::load_config(opts)?;
    let quality = args.quality.unwrap_or(config.jpeg_quality);
    let format = super::format_for_path(&args.output, quality)?;
    let (engine, selected) = super::build_engine(config, args.engine.as_deref())?;

    let transform = super::load_transform(&args.transform)?;
    let input = super::read_bytes(&args.input)?;

    if opts.verbose > 0 {
        println!(
            "Applying {} to {} (engine {}, intensity {})",
            transform.label(),
            args.input.display(),
            selected,
            args.intensity
        );
    }

    let output = engine
        .apply(&input, &transform, selected, args.intensity, format)
        .with_context(|| format!("Failed to grade: {}", args.input.display()))?;
    super::write_bytes(&args.output, &output)?;

    info!(output = %args.output.display(), bytes = output.len(), "graded image written");
    if opts.verbose > 0 {
        println!("Done.");
    }
    Ok(())
}
