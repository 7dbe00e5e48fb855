//! Command-line argument definitions.

use std::path::PathBuf;

use clap::Parser;

/// Plain-text time log reader.
///
/// Reads a log of day markers, task starts, stops and resumes, checks that it
/// is consistent and prints the resulting tasks with their time totals.
#[derive(Debug, Parser)]
#[command(name = "ttlog", version, about, long_about = None)]
pub struct Cli {
    /// Path to the time log.
    pub file: PathBuf,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print JSON instead of text (overrides the configured format).
    #[arg(long)]
    pub json: bool,
}
