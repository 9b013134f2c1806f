//! grade - color grading from the command line
//!
//! Applies `.cube` LUTs, presets and slider settings to images, synthesizes
//! LUTs, matches histograms against a reference and exports tile textures.

use anyhow::Result;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "grade")]
#[command(author, version, about = "Color grading with 3D LUTs and histogram matching")]
#[command(long_about = "
Applies, synthesizes and transfers color grades.

Examples:
  grade apply photo.jpg -o graded.jpg -l film.cube
  grade apply photo.png -o warm.png -s warm.yaml --intensity 0.6
  grade build -s look.yaml -o look.cube
  grade match reference.jpg a.jpg b.jpg -o matched/
  grade texture film.cube -o film_tile.png
  grade batch 'album/*.jpg' -o graded/ -p \"Teal Orange\"
  grade plan 'album/*.jpg'
  grade backends
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Engine config file (YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Worker threads (0 = auto, 1 = sequential)
    #[arg(short = 'j', long, global = true)]
    threads: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a LUT, preset or settings to an image
    #[command(visible_alias = "a")]
    Apply(ApplyArgs),

    /// Synthesize a .cube LUT from settings
    Build(BuildArgs),

    /// Match images to a reference histogram
    #[command(visible_alias = "m")]
    Match(MatchArgs),

    /// Export a LUT as a 2D tile texture (PNG)
    #[command(visible_alias = "tx")]
    Texture(TextureArgs),

    /// Grade every file matching a glob pattern
    Batch(BatchArgs),

    /// Show how files would be split into memory-bounded chunks
    Plan(PlanArgs),

    /// List compute backends
    Backends,
}

/// Where the color transform comes from (exactly one).
#[derive(Args)]
#[group(required = true, multiple = false)]
struct TransformArgs {
    /// .cube LUT file
    #[arg(short, long)]
    lut: Option<PathBuf>,

    /// Preset name from the configured LUT directory
    #[arg(short, long)]
    preset: Option<String>,

    /// Adjustment settings (YAML)
    #[arg(short, long)]
    settings: Option<PathBuf>,
}

#[derive(Args)]
struct ApplyArgs {
    /// Input image (PNG or JPEG)
    input: PathBuf,

    /// Output image (.png or .jpg)
    #[arg(short, long)]
    output: PathBuf,

    #[command(flatten)]
    transform: TransformArgs,

    /// Blend strength (0-1)
    #[arg(short, long, default_value = "1.0")]
    intensity: f32,

    /// Engine: auto, cpu, gpu
    #[arg(short, long)]
    engine: Option<String>,

    /// JPEG quality (1-100)
    #[arg(short, long)]
    quality: Option<u8>,
}

#[derive(Args)]
struct BuildArgs {
    /// Adjustment settings (YAML); neutral when omitted
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Grid size (17, 33 or 65); overrides the settings file
    #[arg(short, long)]
    resolution: Option<usize>,

    /// Output .cube file
    #[arg(short, long)]
    output: PathBuf,

    /// Also write the tile texture here
    #[arg(long)]
    texture: Option<PathBuf>,
}

#[derive(Args)]
struct MatchArgs {
    /// Reference image
    reference: PathBuf,

    /// Images to match
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output directory
    #[arg(short, long)]
    output_dir: PathBuf,

    /// Output format: png, jpg (default: input extension)
    #[arg(short, long)]
    format: Option<String>,

    /// Longest side used to build histograms
    #[arg(long)]
    working_resolution: Option<u32>,
}

#[derive(Args)]
struct TextureArgs {
    /// .cube LUT file
    lut: PathBuf,

    /// Output PNG
    #[arg(short, long)]
    output: PathBuf,
}

#[derive(Args)]
struct BatchArgs {
    /// Input pattern (e.g. "album/*.jpg")
    input: String,

    /// Output directory
    #[arg(short, long)]
    output_dir: PathBuf,

    #[command(flatten)]
    transform: TransformArgs,

    /// Blend strength (0-1)
    #[arg(short, long, default_value = "1.0")]
    intensity: f32,

    /// Engine: auto, cpu, gpu
    #[arg(short, long)]
    engine: Option<String>,

    /// Output format: png, jpg (default: from config)
    #[arg(short, long)]
    format: Option<String>,
}

#[derive(Args)]
struct PlanArgs {
    /// Input pattern (e.g. "album/*.jpg")
    input: String,

    /// Engine whose memory budget to plan for
    #[arg(short, long)]
    engine: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let opts = commands::GlobalOpts {
        config: cli.config,
        threads: cli.threads,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Apply(args) => commands::apply::run(args, &opts),
        Commands::Build(args) => commands::build::run(args, &opts),
        Commands::Match(args) => commands::matching::run(args, &opts),
        Commands::Texture(args) => commands::texture::run(args, &opts),
        Commands::Batch(args) => commands::batch::run(args, &opts),
        Commands::Plan(args) => commands::plan::run(args, &opts),
        Commands::Backends => commands::backends::run(&opts),
    }
}
