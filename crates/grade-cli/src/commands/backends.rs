//! Backend listing command

use anyhow::Result;

use super::GlobalOpts;

pub fn run(opts: &GlobalOpts) -> Result<()> {
    print!("{}", grade_compute::describe_backends());
    if opts.verbose > 0 {
        let config = super::load_config(opts)?;
        println!("configured engine: {}", config.engine);
        if let Some(limits) = config.device_limits() {
            println!(
                "device memory override: {}",
                grade_compute::memory::format_bytes(limits.total_memory)
            );
        }
    }
    Ok(())
}
