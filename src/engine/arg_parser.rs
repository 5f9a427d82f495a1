use clap::Parser;
use std::path::PathBuf;

/// Download sprites listed in metadata files, decode them, and clean up after.
#[derive(Clone, Parser)]
#[command(name = "spriteflow")]
#[command(about = "Fetch, decode and observe remote sprites through a bounded pipeline.")]
pub struct Cli {
    /// Directory for transient artifacts. Cleared at start.
    #[arg(value_name = "OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// Metadata files (CSV, or JSON arrays) listing the items to fetch.
    #[arg(value_name = "INPUTS", num_args = 1.., required = true)]
    pub inputs: Vec<PathBuf>,

    /// Capacity of each stage channel.
    #[arg(long, short = 'c', value_parser = clap::value_parser!(usize))]
    pub capacity: Option<usize>,

    /// Maximum concurrent fetches.
    #[arg(long, short = 'w', value_parser = clap::value_parser!(usize))]
    pub workers: Option<usize>,

    /// Pause after each decode, in milliseconds.
    #[arg(long, short = 'd', value_parser = clap::value_parser!(u64))]
    pub decode_delay_ms: Option<u64>,

    /// Extension for persisted artifacts.
    #[arg(long, short = 'e')]
    pub extension: Option<String>,

    /// Load payloads as raw bytes instead of decoding them as images.
    #[arg(long)]
    pub raw: bool,

    /// Show a fetch progress bar.
    #[arg(long, short = 'p', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub progress: Option<bool>,

    /// Verbose output.
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,
}
