//! Service layer error types.

use thiserror::Error;

use stacks_knn::KnnError;
use stacks_storage::StorageError;
use stacks_types::StacksError;

/// Errors returned by the library, document and chunk services.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ServiceError {
    /// Library, document or chunk does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// Business rule violated (blank names, duplicate ids, bad k, ...)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The index rejected the operation
    #[error("Index error: {0}")]
    Index(#[from] KnnError),
}

impl ServiceError {
    pub fn library_not_found(lib_id: &str) -> Self {
        ServiceError::NotFound(format!("Library '{}'", lib_id))
    }

    pub fn document_not_found(doc_id: &str) -> Self {
        ServiceError::NotFound(format!("Document '{}'", doc_id))
    }

    pub fn chunk_not_found(chunk_id: &str) -> Self {
        ServiceError::NotFound(format!("Chunk '{}'", chunk_id))
    }
}

// The repository behind the services stores libraries, so storage ids are
// library ids.
impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(id) => ServiceError::library_not_found(&id),
            StorageError::AlreadyExists(id) => {
                ServiceError::Validation(format!("Library '{}' already exists", id))
            }
        }
    }
}

impl From<StacksError> for ServiceError {
    fn from(err: StacksError) -> Self {
        match err {
            StacksError::InvalidInput(msg) => ServiceError::Validation(msg),
            other => ServiceError::Validation(other.to_string()),
        }
    }
}
