//! Batch planning command

use anyhow::{Result, bail};
use grade_compute::memory::format_bytes;
#[allow(unused_imports)]
use tracing::{debug, info, trace, warn};

use super::GlobalOpts;
use crate::PlanArgs;

pub fn run(args: PlanArgs, opts: &GlobalOpts) -> Result<()> {
    let files = super::expand_glob(&args.input)?;
    let config = super::load_config(opts)?;
    let (engine, selected) = super::build_engine(config, args.engine.as_deref())?;

    let mut dims = Vec::with_capacity(files.len());
    let mut channels = 3;
    let mut names = Vec::with_capacity(files.len());
    for file in &files {
        match super::load_image(file) {
            Ok(img) => {
                dims.push((img.width, img.height));
                channels = channels.max(img.channels);
                names.push(file);
            }
            Err(e) => warn!(file = %file.display(), error = %e, "skipping"),
        }
    }
    if dims.is_empty() {
        bail!("No decodable images match pattern: {}", args.input);
    }

    let plan = engine.plan_batch(&dims, channels, selected)?;
    println!(
        "{} images, {} per image, budget {} ({})",
        plan.image_count(),
        format_bytes(plan.bytes_per_image),
        format_bytes(plan.budget),
        selected
    );
    println!("batch size {}, {} chunks", plan.batch_size, plan.chunk_count());
    for (i, chunk) in plan.chunks.iter().enumerate() {
        println!("  chunk {}: {} images", i, chunk.len());
        if opts.verbose > 0 {
            for name in &names[chunk.clone()] {
                println!("    {}", name.display());
            }
        }
    }
    Ok(())
}
