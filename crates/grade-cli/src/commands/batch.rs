//! Batch grading command

use anyhow::{Result, bail};
#[allow(unused_imports)]
use tracing::{debug, info, trace};

use super::GlobalOpts;
use crate::BatchArgs;

pub fn run(args: BatchArgs, opts: &GlobalOpts) -> Result<()> {
    trace!(pattern = %args.input, "batch::run");
    let files = super::expand_glob(&args.input)?;
    info!(files = files.len(), pattern = %args.input, "Starting batch grading");
    if opts.verbose > 0 {
        println!("Found {} files matching '{}'", files.len(), args.input);
    }

    let config = super::load_config(opts)?;
    let format = match &args.format {
        Some(name) => super::format_from_name(name, config.jpeg_quality)?,
        None => config.output_format(),
    };
    let (engine, selected) = super::build_engine(config, args.engine.as_deref())?;
    let transform = super::load_transform(&args.transform)?;

    let inputs = files
        .iter()
        .map(|f| super::read_bytes(f))
        .collect::<Result<Vec<_>>>()?;

    let report = engine.apply_batch(&inputs, &transform, selected, args.intensity, format)?;

    for item in &report.items {
        let input = &files[item.item];
        match (&item.output, &item.error) {
            (Some(bytes), _) => {
                let output = super::output_path(&args.output_dir, input, format.extension());
                super::write_bytes(&output, bytes)?;
                if opts.verbose > 0 {
                    println!("{} -> {}", input.display(), output.display());
                }
            }
            (None, error) => eprintln!(
                "Error: {}: {}",
                input.display(),
                error.as_deref().unwrap_or("unknown error")
            ),
        }
    }

    info!(success = report.succeeded, failed = report.failed(), "Batch grading complete");
    println!("Processed: {} success, {} failed", report.succeeded, report.failed());
    if report.failed() > 0 {
        bail!("{} files failed", report.failed());
    }
    Ok(())
}
