//! Storage layer for stacks.
//!
//! Libraries are held in memory behind a single lock. Each write is stamped
//! with a repository-wide generation so derived state (the search index)
//! can detect when it is stale.

pub mod error;
pub mod memory;
pub mod repository;

pub use error::StorageError;
pub use memory::InMemoryRepository;
pub use repository::{Repository, Versioned};
