//! Storage layer error types.

use thiserror::Error;

/// Errors that can occur in the storage layer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// An entry with this id is already stored
    #[error("'{0}' already exists")]
    AlreadyExists(String),

    /// No entry with this id
    #[error("'{0}' not found")]
    NotFound(String),
}
