//! CLI layer for corpus-rs.
//!
//! Provides the command-line interface using clap, with commands for
//! ingesting, querying, validating and managing sources.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use output::OutputFormat;
pub use parser::{Cli, Commands};
