//! Library lifecycle and k-NN search.

use std::sync::Arc;

use tracing::{debug, info, warn};

use stacks_knn::IndexStats;
use stacks_storage::{InMemoryRepository, Repository};
use stacks_types::{Chunk, Library};

use crate::error::ServiceError;
use crate::search::{SearchHit, SearchIndex};

/// Reject a library whose chunks do not share one embedding dimension.
///
/// The index is built from every chunk of a library at once, so a mixed
/// library could never be searched.
pub(crate) fn check_uniform_dimension(lib: &Library) -> Result<(), ServiceError> {
    let mut chunks = lib.chunks();
    let Some(first) = chunks.next() else {
        return Ok(());
    };
    let expected = first.dimension();
    match chunks.find(|c| c.dimension() != expected) {
        Some(odd) => Err(ServiceError::Validation(format!(
            "Chunk '{}' has dimension {}, library '{}' uses {}",
            odd.id,
            odd.dimension(),
            lib.id,
            expected
        ))),
        None => Ok(()),
    }
}

/// Reject a library in which two chunks share an id.
///
/// Chunk ids break distance ties in the index, so they must be unique
/// across all documents, not only within one.
pub(crate) fn check_unique_chunk_ids(lib: &Library) -> Result<(), ServiceError> {
    match lib.duplicate_chunk_id() {
        Some(id) => Err(ServiceError::Validation(format!(
            "Chunk '{}' already exists in library '{}'",
            id, lib.id
        ))),
        None => Ok(()),
    }
}

/// Library CRUD plus search over a library's chunks.
pub struct LibraryService<R = InMemoryRepository<Library>> {
    repo: Arc<R>,
    index: Arc<SearchIndex>,
}

impl<R> Clone for LibraryService<R> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
            index: Arc::clone(&self.index),
        }
    }
}

impl<R: Repository<Library>> LibraryService<R> {
    pub fn new(repo: Arc<R>, index: Arc<SearchIndex>) -> Self {
        Self { repo, index }
    }

    pub fn create_library(&self, lib: Library) -> Result<Library, ServiceError> {
        debug!(library_id = %lib.id, "Creating library");
        lib.validate()?;
        check_uniform_dimension(&lib)?;

        let generation = self.repo.create(lib.clone())?;
        info!(library_id = %lib.id, generation, "Library created");
        Ok(lib)
    }

    pub fn get_library(&self, lib_id: &str) -> Result<Library, ServiceError> {
        debug!(library_id = lib_id, "Fetching library");
        self.repo.get(lib_id).ok_or_else(|| {
            warn!(library_id = lib_id, "Library not found");
            ServiceError::library_not_found(lib_id)
        })
    }

    pub fn list_libraries(&self) -> Vec<Library> {
        self.repo.list()
    }

    /// Replace a library wholesale. `lib.id` must equal `lib_id`.
    pub fn update_library(&self, lib_id: &str, lib: Library) -> Result<Library, ServiceError> {
        debug!(library_id = lib_id, "Updating library");
        if lib.id != lib_id {
            return Err(ServiceError::Validation(format!(
                "Library id '{}' does not match '{}'",
                lib.id, lib_id
            )));
        }
        lib.validate()?;
        check_uniform_dimension(&lib)?;

        let generation = self.repo.update(lib.clone())?;
        info!(library_id = lib_id, generation, "Library updated");
        Ok(lib)
    }

    pub fn delete_library(&self, lib_id: &str) -> Result<(), ServiceError> {
        debug!(library_id = lib_id, "Deleting library");
        self.repo.delete(lib_id)?;
        self.index.invalidate(lib_id);
        info!(library_id = lib_id, "Library deleted");
        Ok(())
    }

    /// Rebuild the search index from the library's current chunks.
    pub fn rebuild_index(&self, lib_id: &str) -> Result<IndexStats, ServiceError> {
        let library = self
            .repo
            .get_versioned(lib_id)
            .ok_or_else(|| ServiceError::library_not_found(lib_id))?;
        let stats = self.index.rebuild(&library)?;
        info!(
            library_id = lib_id,
            strategy = stats.strategy,
            items = stats.item_count,
            height = stats.height,
            "Index rebuilt"
        );
        Ok(stats)
    }

    /// The `k` chunks closest to `embedding`, nearest first.
    pub fn search(
        &self,
        lib_id: &str,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<Chunk>, ServiceError> {
        Ok(self
            .search_with_scores(lib_id, embedding, k)?
            .into_iter()
            .map(|hit| hit.chunk)
            .collect())
    }

    /// Like [`search`](Self::search) but keeps the distance of each hit.
    pub fn search_with_scores(
        &self,
        lib_id: &str,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<SearchHit>, ServiceError> {
        debug!(library_id = lib_id, k, "Searching library");
        if k == 0 {
            return Err(ServiceError::Validation("k must be positive".to_string()));
        }
        if embedding.is_empty() {
            return Err(ServiceError::Validation(
                "Query embedding cannot be empty".to_string(),
            ));
        }

        let library = self
            .repo
            .get_versioned(lib_id)
            .ok_or_else(|| ServiceError::library_not_found(lib_id))?;
        let hits = self.index.search(&library, embedding, k)?;

        info!(library_id = lib_id, results = hits.len(), "Search complete");
        Ok(hits)
    }
}
