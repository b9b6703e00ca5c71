//! Command implementations for `stacks`.
//!
//! Handles:
//! - search: import a snapshot into a fresh store, build the index, query it
//! - inspect: summarize a snapshot
//! - config: show resolved settings

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use stacks_service::{SearchHit, Services};
use stacks_types::{IndexerKind, Library, Settings};

/// Load settings and apply CLI overrides (highest precedence).
pub fn load_settings(
    config_path: Option<&str>,
    log_level_override: Option<&str>,
) -> Result<Settings> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;
    if let Some(log_level) = log_level_override {
        settings.log_level = log_level.to_string();
    }
    Ok(settings)
}

/// Install the global tracing subscriber. `RUST_LOG` wins over `log_level`.
///
/// Logs go to stderr so command output on stdout stays machine-readable.
pub fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

/// Read a library snapshot from disk.
pub fn load_library(path: &Path) -> Result<Library> {
    let bytes = fs::read(path)
        .with_context(|| format!("Failed to read library snapshot {}", path.display()))?;
    let library = Library::from_bytes(&bytes)
        .with_context(|| format!("Failed to parse library snapshot {}", path.display()))?;
    debug!(
        library_id = %library.id,
        documents = library.documents.len(),
        chunks = library.chunk_count(),
        "Loaded snapshot"
    );
    Ok(library)
}

/// Options for one search run.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub k: Option<usize>,
    pub indexer: Option<IndexerKind>,
    pub seed: Option<u64>,
}

/// Import `library` into a fresh store and return its nearest chunks.
pub fn search_library(
    settings: &Settings,
    library: Library,
    embedding: &[f32],
    options: &SearchOptions,
) -> Result<Vec<SearchHit>> {
    let mut settings = settings.clone();
    if let Some(indexer) = options.indexer {
        settings.indexer = indexer;
    }
    if options.seed.is_some() {
        settings.pivot_seed = options.seed;
    }
    let k = options.k.unwrap_or(settings.default_top_k);

    let services = Services::from_settings(&settings);
    let lib_id = library.id.clone();
    services
        .libraries
        .create_library(library)
        .context("Invalid library snapshot")?;

    let hits = services
        .libraries
        .search_with_scores(&lib_id, embedding, k)
        .context("Search failed")?;
    info!(
        library_id = %lib_id,
        indexer = %settings.indexer,
        k,
        results = hits.len(),
        "Search finished"
    );
    Ok(hits)
}

#[derive(Debug, Serialize)]
struct HitOutput<'a> {
    id: &'a str,
    distance: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    similarity: Option<f32>,
    text: &'a str,
}

/// Print hits one per line (`id  distance  text`) or as a JSON array.
pub fn print_hits(hits: &[SearchHit], json: bool, out: &mut impl Write) -> Result<()> {
    if json {
        let rows: Vec<HitOutput<'_>> = hits
            .iter()
            .map(|h| HitOutput {
                id: &h.chunk.id,
                distance: h.distance,
                similarity: h.similarity,
                text: &h.chunk.text,
            })
            .collect();
        serde_json::to_writer_pretty(&mut *out, &rows)?;
        writeln!(out)?;
        return Ok(());
    }

    if hits.is_empty() {
        writeln!(out, "No results")?;
        return Ok(());
    }
    for hit in hits {
        writeln!(out, "{}\t{:.6}\t{}", hit.chunk.id, hit.distance, hit.chunk.text)?;
    }
    Ok(())
}

/// Counts describing a library snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibrarySummary {
    pub id: String,
    pub name: String,
    pub documents: usize,
    pub chunks: usize,
    /// Embedding dimension of the first chunk, if any
    pub dimension: Option<usize>,
}

impl LibrarySummary {
    pub fn of(library: &Library) -> Self {
        Self {
            id: library.id.clone(),
            name: library.name.clone(),
            documents: library.documents.len(),
            chunks: library.chunk_count(),
            dimension: library.chunks().next().map(|c| c.dimension()),
        }
    }
}

/// Summarize the snapshot at `path`.
pub fn inspect_library(path: &Path, out: &mut impl Write) -> Result<LibrarySummary> {
    let library = load_library(path)?;
    let summary = LibrarySummary::of(&library);

    writeln!(out, "Library:    {} ({})", summary.name, summary.id)?;
    writeln!(out, "Documents:  {}", summary.documents)?;
    writeln!(out, "Chunks:     {}", summary.chunks)?;
    match summary.dimension {
        Some(dim) => writeln!(out, "Dimension:  {}", dim)?,
        None => writeln!(out, "Dimension:  -")?,
    }
    Ok(summary)
}

/// Print resolved settings as JSON.
pub fn show_config(settings: &Settings, out: &mut impl Write) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, settings)?;
    writeln!(out)?;
    Ok(())
}
