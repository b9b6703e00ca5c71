//! CLI argument parsing for `stacks`.
//!
//! CLI flags override every other configuration source.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use stacks_types::IndexerKind;

/// Stacks
///
/// Exact nearest-neighbor search over libraries of embedded text chunks.
#[derive(Parser, Debug)]
#[command(name = "stacks")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides the default in the platform config dir)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search a library snapshot for the chunks nearest to an embedding
    Search {
        /// Library snapshot (JSON)
        #[arg(long)]
        library: PathBuf,

        /// Query embedding as comma-separated floats, e.g. 1.0,0.0
        #[arg(
            short,
            long,
            required = true,
            value_delimiter = ',',
            allow_hyphen_values = true
        )]
        embedding: Vec<f32>,

        /// Number of results (default from config)
        #[arg(short, long)]
        k: Option<usize>,

        /// Index strategy: vp_tree or brute_force
        #[arg(long)]
        indexer: Option<IndexerKind>,

        /// Seed for vantage-point selection
        #[arg(long)]
        seed: Option<u64>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Summarize a library snapshot
    Inspect {
        /// Library snapshot (JSON)
        #[arg(long)]
        library: PathBuf,
    },

    /// Print the resolved configuration
    Config,
}
