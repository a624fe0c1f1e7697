//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// corpus-rs: document ingestion and hybrid retrieval engine.
///
/// Ingests heterogeneous documents into a knowledge base of hierarchical,
/// multi-scale chunks and answers natural-language queries over them.
#[derive(Parser, Debug)]
#[command(name = "corpus-rs")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the chunk store database file.
    ///
    /// Defaults to `corpus.db` in the current directory.
    #[arg(short, long, env = "CORPUS_DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// Path to an engine configuration file (JSON).
    #[arg(short, long, env = "CORPUS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest a document into the knowledge base.
    #[command(disable_version_flag = true)]
    Ingest {
        /// Path to the document file.
        file: PathBuf,

        /// Stable source identifier; defaults to the file stem.
        #[arg(short, long)]
        source_id: Option<String>,

        /// Logical version label.
        #[arg(long, default_value = "v1")]
        version: String,

        /// Declared MIME type, when known.
        #[arg(long)]
        mime: Option<String>,
    },

    /// Query the knowledge base.
    Query {
        /// The natural-language query.
        query: String,

        /// Maximum results to return.
        #[arg(short = 'k', long, default_value = "10")]
        top_k: usize,

        /// Restrict to one source.
        #[arg(long)]
        source: Option<String>,

        /// Include each match's parent and children.
        #[arg(long)]
        expand: bool,

        /// Disable lost-in-the-middle reordering.
        #[arg(long)]
        no_reorder: bool,
    },

    /// List ingested sources.
    #[command(name = "sources", alias = "ls")]
    Sources {
        /// Restrict to one status (pending, running, completed, failed,
        /// cancelled).
        #[arg(long)]
        status: Option<String>,
    },

    /// Re-run validation over a source's persisted chunks.
    Validate {
        /// Source identifier.
        source_id: String,
    },

    /// Delete a source and all of its chunks.
    #[command(name = "delete", alias = "rm")]
    Delete {
        /// Source identifier.
        source_id: String,

        /// Skip confirmation prompt.
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Show store statistics.
    Stats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_ingest() {
        let cli = Cli::try_parse_from([
            "corpus-rs",
            "ingest",
            "guide.md",
            "--source-id",
            "guide",
            "--version",
            "v2",
        ])
        .unwrap();
        match cli.command {
            Commands::Ingest { file, source_id, version, mime } => {
                assert_eq!(file, PathBuf::from("guide.md"));
                assert_eq!(source_id.as_deref(), Some("guide"));
                assert_eq!(version, "v2");
                assert!(mime.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parses_query_defaults() {
        let cli = Cli::try_parse_from(["corpus-rs", "query", "how to create a fund"]).unwrap();
        match cli.command {
            Commands::Query { query, top_k, source, expand, no_reorder } => {
                assert_eq!(query, "how to create a fund");
                assert_eq!(top_k, 10);
                assert!(source.is_none());
                assert!(!expand);
                assert!(!no_reorder);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_sources_alias() {
        let cli = Cli::try_parse_from(["corpus-rs", "ls"]).unwrap();
        assert!(matches!(cli.command, Commands::Sources { .. }));
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["corpus-rs"]).is_err());
    }

    #[test]
    fn test_cli_global_format_flag() {
        let cli = Cli::try_parse_from(["corpus-rs", "stats", "--format", "json"]).unwrap();
        assert_eq!(cli.format, "json");
    }
}
