//! Generation-gated search index.
//!
//! One k-NN index is shared by all libraries. It remembers which library
//! and which write generation it was built from, and is rebuilt only when a
//! search targets a different library or the library has been written
//! since. Repeated read-only searches reuse the built structure.
//!
//! Build-then-query runs under the index mutex, so a search never observes
//! a half-built index.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use stacks_knn::{create_index, IndexStats, KnnError, KnnIndex, Metric};
use stacks_storage::Versioned;
use stacks_types::{Chunk, Library, Settings};

/// The library snapshot an index was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexGeneration {
    pub library_id: String,
    pub generation: u64,
}

impl IndexGeneration {
    fn of(library: &Versioned<Library>) -> Self {
        Self {
            library_id: library.value.id.clone(),
            generation: library.generation,
        }
    }
}

/// A matched chunk and its distance to the query (lower = closer).
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub chunk: Chunk,
    pub distance: f32,
    /// Cosine similarity when the index ranks by cosine distance
    pub similarity: Option<f32>,
}

struct Slot {
    index: Box<dyn KnnIndex<Chunk>>,
    built_for: Option<IndexGeneration>,
    rebuilds: u64,
}

/// Search index shared by the library services.
pub struct SearchIndex {
    slot: Mutex<Slot>,
}

impl SearchIndex {
    pub fn new(index: Box<dyn KnnIndex<Chunk>>) -> Self {
        Self {
            slot: Mutex::new(Slot {
                index,
                built_for: None,
                rebuilds: 0,
            }),
        }
    }

    /// Index using the configured strategy and pivot seed.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(create_index(settings.indexer, settings.pivot_seed))
    }

    // A panic mid-build leaves `built_for` describing an older snapshot at
    // worst, which only forces another rebuild.
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Rebuild from `library` unconditionally.
    ///
    /// Returns the stats of the structure just built, read under the same
    /// lock so a concurrent search cannot swap in another library first.
    pub fn rebuild(&self, library: &Versioned<Library>) -> Result<IndexStats, KnnError> {
        let mut slot = self.lock();
        Self::rebuild_slot(&mut slot, library)?;
        Ok(slot.index.stats())
    }

    fn rebuild_slot(slot: &mut Slot, library: &Versioned<Library>) -> Result<(), KnnError> {
        let chunks: Vec<Chunk> = library.value.chunks().cloned().collect();
        debug!(
            library_id = %library.value.id,
            generation = library.generation,
            chunks = chunks.len(),
            "Rebuilding search index"
        );
        // Forget the previous snapshot first: a failed build must not leave
        // the slot claiming to be current for a library it does not hold.
        slot.built_for = None;
        slot.index.build(chunks)?;
        slot.built_for = Some(IndexGeneration::of(library));
        slot.rebuilds += 1;
        Ok(())
    }

    /// Query the index for `library`, rebuilding first if it is stale.
    pub fn search(
        &self,
        library: &Versioned<Library>,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<SearchHit>, KnnError> {
        let mut slot = self.lock();

        let current = IndexGeneration::of(library);
        if slot.built_for.as_ref() != Some(&current) {
            Self::rebuild_slot(&mut slot, library)?;
        } else {
            debug!(
                library_id = %current.library_id,
                generation = current.generation,
                "Search index is current"
            );
        }

        let hits: Vec<SearchHit> = slot
            .index
            .query(query, k)?
            .into_iter()
            .map(|n| SearchHit {
                similarity: n.similarity(),
                distance: n.distance,
                chunk: n.item.clone(),
            })
            .collect();
        Ok(hits)
    }

    /// Drop the built state if it belongs to `library_id`.
    pub fn invalidate(&self, library_id: &str) {
        let mut slot = self.lock();
        if slot
            .built_for
            .as_ref()
            .is_some_and(|b| b.library_id == library_id)
        {
            slot.built_for = None;
            // Release the chunk copies held by the stale structure.
            if let Err(e) = slot.index.build(Vec::new()) {
                debug!(error = %e, "Clearing search index failed");
            }
        }
    }

    /// Snapshot the index was last built from, if any.
    pub fn built_for(&self) -> Option<IndexGeneration> {
        self.lock().built_for.clone()
    }

    /// Number of rebuilds performed so far.
    pub fn rebuild_count(&self) -> u64 {
        self.lock().rebuilds
    }

    pub fn metric(&self) -> Metric {
        self.lock().index.metric()
    }

    pub fn stats(&self) -> IndexStats {
        self.lock().index.stats()
    }
}
