//! pixbridge - raw pixel buffer tooling
//!
//! Inspects the pixel type registry, computes buffer sizes, validates raw
//! buffer files and round-trips them through images.

use anyhow::{Result, anyhow};
use clap::{Args, Parser, Subcommand};
use pixbridge_core::PixelId;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "pixbridge")]
#[command(author, version, about = "Raw pixel buffer marshaling tool")]
#[command(long_about = "
Validates and round-trips raw pixel buffers against typed image layouts.

Shapes list the fastest axis first (x, y[, z]), as images order them.

Examples:
  pixbridge types                                   # List pixel types
  pixbridge size --shape 5x3 -t uint16              # Expected buffer size
  pixbridge size --shape 64x64x8 -t vectorfloat32 -k 3
  pixbridge check frame.raw --shape 1920x1080 -t uint8
  pixbridge roundtrip in.raw -o out.raw --shape 5x3 -t uint16 --alias
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List the pixel type registry
    #[command(visible_alias = "t")]
    Types,

    /// Compute the buffer size of an image layout
    #[command(visible_alias = "s")]
    Size(SizeArgs),

    /// Validate raw buffer files against an image layout
    #[command(visible_alias = "c")]
    Check(CheckArgs),

    /// Import a raw buffer as an image and export it back
    #[command(visible_alias = "rt")]
    Roundtrip(RoundtripArgs),
}

/// Image layout shared by the buffer commands.
#[derive(Args, Clone)]
struct LayoutArgs {
    /// Image shape, fastest axis first: 5x3, 64x64x8 or 5,3
    #[arg(short, long, value_parser = commands::parse_shape)]
    shape: commands::Shape,

    /// Pixel type: uint8 .. float64, vectoruint8 .. vectorfloat64
    #[arg(short = 't', long = "pixel-type", value_parser = commands::parse_pixel_type)]
    pixel_type: PixelId,

    /// Components per pixel (vector types only)
    #[arg(short = 'k', long, default_value = "1")]
    components: usize,
}

#[derive(Args)]
struct SizeArgs {
    #[command(flatten)]
    layout: LayoutArgs,
}

#[derive(Args)]
struct CheckArgs {
    /// Raw buffer file(s)
    #[arg(required = true)]
    input: Vec<PathBuf>,

    #[command(flatten)]
    layout: LayoutArgs,
}

#[derive(Args)]
struct RoundtripArgs {
    /// Raw buffer file
    input: PathBuf,

    /// Output file
    #[arg(short, long)]
    output: PathBuf,

    #[command(flatten)]
    layout: LayoutArgs,

    /// Alias the loaded buffer instead of copying it into the image
    #[arg(long)]
    alias: bool,
}

/// Installs the log subscriber. `RUST_LOG` overrides the default level.
fn init_logging(verbose: bool) -> Result<()> {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {e}"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    match cli.command {
        Commands::Types => commands::types::run(cli.verbose),
        Commands::Size(args) => commands::size::run(args, cli.verbose),
        Commands::Check(args) => commands::check::run(args, cli.verbose),
        Commands::Roundtrip(args) => commands::roundtrip::run(args, cli.verbose),
    }
}
