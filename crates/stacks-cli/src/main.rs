//! stacks
//!
//! Exact k-nearest-neighbor search over library snapshots.
//!
//! # Usage
//!
//! ```bash
//! stacks search --library snapshot.json --embedding 1.0,0.0 [--k N]
//! stacks search --library snapshot.json --embedding 1.0,0.0 --indexer brute_force
//! stacks inspect --library snapshot.json
//! stacks config
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (<platform config dir>/stacks/config.toml)
//! 3. Environment variables (STACKS_*)
//! 4. CLI flags

use std::io;

use anyhow::Result;
use clap::Parser;

use stacks_cli::{
    init_logging, inspect_library, load_library, load_settings, print_hits, search_library,
    show_config, Cli, Commands, SearchOptions,
};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = load_settings(cli.config.as_deref(), cli.log_level.as_deref())?;
    init_logging(&settings.log_level)?;

    let mut stdout = io::stdout().lock();
    match cli.command {
        Commands::Search {
            library,
            embedding,
            k,
            indexer,
            seed,
            json,
        } => {
            let library = load_library(&library)?;
            let options = SearchOptions { k, indexer, seed };
            let hits = search_library(&settings, library, &embedding, &options)?;
            print_hits(&hits, json, &mut stdout)?;
        }
        Commands::Inspect { library } => {
            inspect_library(&library, &mut stdout)?;
        }
        Commands::Config => {
            show_config(&settings, &mut stdout)?;
        }
    }

    Ok(())
}
