//! Histogram matching command

use anyhow::{Result, bail};
#[allow(unused_imports)]
use tracing::{debug, info, trace, warn};

use super::GlobalOpts;
use crate::MatchArgs;

pub fn run(args: MatchArgs, opts: &GlobalOpts) -> Result<()> {
    trace!(reference = %args.reference.display(), inputs = args.inputs.len(), "match::run");
    let mut config = super::load_config(opts)?;
    config.engine = grade_compute::Engine::Cpu;
    if let Some(res) = args.working_resolution {
        config.working_resolution = res;
    }
    let quality = config.jpeg_quality;
    let (engine, _) = super::build_engine(config, None)?;

    let reference = super::load_image(&args.reference)?;
    let matcher = engine.histogram_matcher(&reference);

    let mut failed = 0;
    let mut paths = Vec::new();
    let mut sources = Vec::new();
    for input in &args.inputs {
        match super::load_image(input) {
            Ok(img) => {
                paths.push(input);
                sources.push(img);
            }
            Err(e) => {
                failed += 1;
                eprintln!("Error: {:#}", e);
            }
        }
    }

    let matched = matcher.match_images(sources);
    for (input, image) in paths.iter().zip(&matched) {
        let ext = match &args.format {
            Some(f) => f.clone(),
            None => input
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("png")
                .to_string(),
        };
        let format = super::format_from_name(&ext, quality)?;
        let output = super::output_path(&args.output_dir, input, format.extension());
        let bytes = grade_io::encode(image, format)?;
        super::write_bytes(&output, &bytes)?;
        if opts.verbose > 0 {
            println!("{} -> {}", input.display(), output.display());
        }
    }

    info!(matched = matched.len(), failed, "histogram matching complete");
    println!("Matched: {} success, {} failed", matched.len(), failed);
    if failed > 0 {
        bail!("{} files failed", failed);
    }
    Ok(())
}
