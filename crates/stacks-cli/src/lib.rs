//! Command-line front end for stacks.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (search, inspect, config)

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands};
pub use commands::{
    init_logging, inspect_library, load_library, load_settings, print_hits, search_library,
    show_config, LibrarySummary, SearchOptions,
};
