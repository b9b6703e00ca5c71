//! Repository trait.

use stacks_types::Entity;

use crate::error::StorageError;

/// A stored value together with the generation of its last write.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub value: T,
    pub generation: u64,
}

/// CRUD access to entities keyed by id.
///
/// Every successful write is stamped with a new, strictly increasing
/// generation. Callers compare generations to tell whether data derived
/// from an entity (such as a search index) is stale.
pub trait Repository<T: Entity + Clone>: Send + Sync {
    /// Get a copy of the entity
    fn get(&self, id: &str) -> Option<T> {
        self.get_versioned(id).map(|v| v.value)
    }

    /// Get a copy of the entity with its write generation
    fn get_versioned(&self, id: &str) -> Option<Versioned<T>>;

    /// Copies of all entities, ordered by id
    fn list(&self) -> Vec<T>;

    /// Number of stored entities
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Generation of the most recent write to the repository
    fn generation(&self) -> u64;

    /// Insert a new entity. Fails if the id is taken.
    fn create(&self, item: T) -> Result<u64, StorageError>;

    /// Replace an existing entity. Fails if the id is unknown.
    fn update(&self, item: T) -> Result<u64, StorageError>;

    /// Remove an entity. Fails if the id is unknown.
    fn delete(&self, id: &str) -> Result<(), StorageError>;

    /// Atomically read-modify-write one entity.
    ///
    /// `f` runs on a copy while the repository is locked; the copy is stored
    /// only if `f` succeeds, so a failed modification leaves no trace.
    fn modify<R, E, F>(&self, id: &str, f: F) -> Result<(R, u64), E>
    where
        Self: Sized,
        E: From<StorageError>,
        F: FnOnce(&mut T) -> Result<R, E>;
}
