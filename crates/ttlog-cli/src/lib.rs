//! Time log reader CLI library.
//!
//! This crate provides the CLI interface for reading time logs.

mod cli;
mod config;
pub mod report;

pub use cli::Cli;
pub use config::{Config, OutputFormat};
