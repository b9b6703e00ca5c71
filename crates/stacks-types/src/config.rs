//! Configuration loading for stacks.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at `<platform config dir>/stacks/config.{toml,json,yaml}`.

use std::fmt;
use std::path::PathBuf;

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::StacksError;

/// Which k-NN strategy backs library search.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IndexerKind {
    /// Full cosine scan with bounded top-k selection
    #[serde(alias = "bruteforce")]
    BruteForce,
    /// Vantage-point tree over Euclidean distance (default)
    #[default]
    #[serde(alias = "vptree")]
    VpTree,
}

impl IndexerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexerKind::BruteForce => "brute_force",
            IndexerKind::VpTree => "vp_tree",
        }
    }
}

impl fmt::Display for IndexerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for IndexerKind {
    type Err = StacksError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "brute_force" | "bruteforce" => Ok(IndexerKind::BruteForce),
            "vp_tree" | "vptree" => Ok(IndexerKind::VpTree),
            other => Err(StacksError::Config(format!(
                "unknown indexer '{}', expected brute_force or vp_tree",
                other
            ))),
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// k-NN strategy used for search
    #[serde(default)]
    pub indexer: IndexerKind,

    /// Seed for vantage-point selection; random per build when unset
    #[serde(default)]
    pub pivot_seed: Option<u64>,

    /// Result count used when a search does not specify one
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_top_k() -> usize {
    10
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            indexer: IndexerKind::default(),
            pivot_seed: None,
            default_top_k: default_top_k(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Default config file (optional)
    /// 3. CLI-specified config file (required when given)
    /// 4. Environment variables (STACKS_*)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, StacksError> {
        let mut builder = Config::builder()
            .set_default("log_level", default_log_level())
            .map_err(|e| StacksError::Config(e.to_string()))?
            .set_default("indexer", IndexerKind::default().as_str())
            .map_err(|e| StacksError::Config(e.to_string()))?
            .set_default("default_top_k", default_top_k() as i64)
            .map_err(|e| StacksError::Config(e.to_string()))?;

        if let Some(default_path) = default_config_path() {
            builder = builder
                .add_source(File::with_name(&default_path.to_string_lossy()).required(false));
        }

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // STACKS_LOG_LEVEL, STACKS_INDEXER, STACKS_PIVOT_SEED, STACKS_DEFAULT_TOP_K
        builder = builder.add_source(
            Environment::with_prefix("STACKS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Settings = builder
            .build()
            .map_err(|e| StacksError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| StacksError::Config(e.to_string()))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), StacksError> {
        if self.default_top_k == 0 {
            return Err(StacksError::Config(
                "default_top_k must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Default config file stem, without extension.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "stacks").map(|p| p.config_dir().join("config"))
}
