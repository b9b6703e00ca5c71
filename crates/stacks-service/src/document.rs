//! Documents within a library.

use std::sync::Arc;

use tracing::{debug, info};

use stacks_storage::{InMemoryRepository, Repository};
use stacks_types::{Document, Library};

use crate::error::ServiceError;
use crate::library::{check_uniform_dimension, check_unique_chunk_ids};

pub struct DocumentService<R = InMemoryRepository<Library>> {
    repo: Arc<R>,
}

impl<R> Clone for DocumentService<R> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
        }
    }
}

impl<R: Repository<Library>> DocumentService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub fn add_document(&self, lib_id: &str, doc: Document) -> Result<Document, ServiceError> {
        debug!(library_id = lib_id, document_id = %doc.id, "Adding document");
        doc.validate()?;

        let (_, generation) = self.repo.modify(lib_id, |lib| {
            if lib.document(&doc.id).is_some() {
                return Err(ServiceError::Validation(format!(
                    "Document '{}' already exists",
                    doc.id
                )));
            }
            lib.documents.push(doc.clone());
            check_unique_chunk_ids(lib)?;
            check_uniform_dimension(lib)
        })?;

        info!(library_id = lib_id, document_id = %doc.id, generation, "Document added");
        Ok(doc)
    }

    pub fn get_document(&self, lib_id: &str, doc_id: &str) -> Result<Document, ServiceError> {
        debug!(library_id = lib_id, document_id = doc_id, "Fetching document");
        let lib = self
            .repo
            .get(lib_id)
            .ok_or_else(|| ServiceError::library_not_found(lib_id))?;
        lib.document(doc_id)
            .cloned()
            .ok_or_else(|| ServiceError::document_not_found(doc_id))
    }

    pub fn list_documents(&self, lib_id: &str) -> Result<Vec<Document>, ServiceError> {
        self.repo
            .get(lib_id)
            .map(|lib| lib.documents)
            .ok_or_else(|| ServiceError::library_not_found(lib_id))
    }

    /// Replace a document, chunks included. `doc.id` must equal `doc_id`.
    pub fn update_document(
        &self,
        lib_id: &str,
        doc_id: &str,
        doc: Document,
    ) -> Result<Document, ServiceError> {
        debug!(library_id = lib_id, document_id = doc_id, "Updating document");
        if doc.id != doc_id {
            return Err(ServiceError::Validation(format!(
                "Document id '{}' does not match '{}'",
                doc.id, doc_id
            )));
        }
        doc.validate()?;

        let (_, generation) = self.repo.modify(lib_id, |lib| {
            let existing = lib
                .document_mut(doc_id)
                .ok_or_else(|| ServiceError::document_not_found(doc_id))?;
            *existing = doc.clone();
            check_unique_chunk_ids(lib)?;
            check_uniform_dimension(lib)
        })?;

        info!(library_id = lib_id, document_id = doc_id, generation, "Document updated");
        Ok(doc)
    }

    pub fn delete_document(&self, lib_id: &str, doc_id: &str) -> Result<(), ServiceError> {
        debug!(library_id = lib_id, document_id = doc_id, "Deleting document");
        let (_, generation) = self.repo.modify(lib_id, |lib| {
            let before = lib.documents.len();
            lib.documents.retain(|d| d.id != doc_id);
            if lib.documents.len() == before {
                return Err(ServiceError::document_not_found(doc_id));
            }
            Ok(())
        })?;

        info!(library_id = lib_id, document_id = doc_id, generation, "Document deleted");
        Ok(())
    }
}
