//! Service wiring.

use std::sync::Arc;

use tracing::info;

use stacks_storage::{InMemoryRepository, Repository};
use stacks_types::{Library, Settings};

use crate::chunk::ChunkService;
use crate::document::DocumentService;
use crate::library::LibraryService;
use crate::search::SearchIndex;

/// The three services sharing one repository and one search index.
pub struct Services<R = InMemoryRepository<Library>> {
    pub libraries: LibraryService<R>,
    pub documents: DocumentService<R>,
    pub chunks: ChunkService<R>,
}

impl Services {
    /// Fresh in-memory store with the configured index strategy.
    pub fn from_settings(settings: &Settings) -> Self {
        info!(
            indexer = %settings.indexer,
            pivot_seed = ?settings.pivot_seed,
            "Creating services"
        );
        Self::new(
            Arc::new(InMemoryRepository::new()),
            Arc::new(SearchIndex::from_settings(settings)),
        )
    }
}

impl<R: Repository<Library>> Services<R> {
    pub fn new(repo: Arc<R>, index: Arc<SearchIndex>) -> Self {
        Self {
            libraries: LibraryService::new(Arc::clone(&repo), index),
            documents: DocumentService::new(Arc::clone(&repo)),
            chunks: ChunkService::new(repo),
        }
    }
}
