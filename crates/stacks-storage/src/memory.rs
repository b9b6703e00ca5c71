//! In-memory repository guarded by a single mutex.
//!
//! One lock covers every read and write of the map, so all mutations of
//! libraries, documents and chunks form one critical section. Values are
//! cloned in and out; callers never hold references into the map.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use stacks_types::Entity;

use crate::error::StorageError;
use crate::repository::{Repository, Versioned};

struct Inner<T> {
    entries: BTreeMap<String, Versioned<T>>,
    generation: u64,
}

impl<T> Inner<T> {
    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }
}

/// Thread-safe in-memory entity store.
pub struct InMemoryRepository<T> {
    inner: Mutex<Inner<T>>,
}

impl<T> InMemoryRepository<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: BTreeMap::new(),
                generation: 0,
            }),
        }
    }

    // Entries are only replaced wholesale, so a panic elsewhere cannot leave
    // one half-written and the poisoned state is safe to keep using.
    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Default for InMemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity + Clone + Send> Repository<T> for InMemoryRepository<T> {
    fn get_versioned(&self, id: &str) -> Option<Versioned<T>> {
        self.lock().entries.get(id).cloned()
    }

    fn list(&self) -> Vec<T> {
        self.lock()
            .entries
            .values()
            .map(|v| v.value.clone())
            .collect()
    }

    fn len(&self) -> usize {
        self.lock().entries.len()
    }

    fn generation(&self) -> u64 {
        self.lock().generation
    }

    fn create(&self, item: T) -> Result<u64, StorageError> {
        let mut inner = self.lock();
        if inner.entries.contains_key(item.id()) {
            return Err(StorageError::AlreadyExists(item.id().to_string()));
        }
        let generation = inner.next_generation();
        debug!(id = item.id(), generation, "Created entry");
        inner.entries.insert(
            item.id().to_string(),
            Versioned {
                value: item,
                generation,
            },
        );
        Ok(generation)
    }

    fn update(&self, item: T) -> Result<u64, StorageError> {
        let mut inner = self.lock();
        if !inner.entries.contains_key(item.id()) {
            return Err(StorageError::NotFound(item.id().to_string()));
        }
        let generation = inner.next_generation();
        debug!(id = item.id(), generation, "Updated entry");
        inner.entries.insert(
            item.id().to_string(),
            Versioned {
                value: item,
                generation,
            },
        );
        Ok(generation)
    }

    fn delete(&self, id: &str) -> Result<(), StorageError> {
        let mut inner = self.lock();
        if inner.entries.remove(id).is_none() {
            return Err(StorageError::NotFound(id.to_string()));
        }
        let generation = inner.next_generation();
        debug!(id, generation, "Deleted entry");
        Ok(())
    }

    fn modify<R, E, F>(&self, id: &str, f: F) -> Result<(R, u64), E>
    where
        E: From<StorageError>,
        F: FnOnce(&mut T) -> Result<R, E>,
    {
        let mut inner = self.lock();
        let mut value = inner
            .entries
            .get(id)
            .map(|v| v.value.clone())
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;

        let result = f(&mut value)?;

        let generation = inner.next_generation();
        debug!(id, generation, "Modified entry");
        inner.entries.insert(id.to_string(), Versioned { value, generation });
        Ok((result, generation))
    }
}
