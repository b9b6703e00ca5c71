//! Chunks within a document.

use std::sync::Arc;

use tracing::{debug, info};

use stacks_storage::{InMemoryRepository, Repository};
use stacks_types::{Chunk, Document, Library};

use crate::error::ServiceError;
use crate::library::{check_uniform_dimension, check_unique_chunk_ids};

fn document_in<'a>(lib: &'a Library, doc_id: &str) -> Result<&'a Document, ServiceError> {
    lib.document(doc_id)
        .ok_or_else(|| ServiceError::document_not_found(doc_id))
}

fn document_in_mut<'a>(
    lib: &'a mut Library,
    doc_id: &str,
) -> Result<&'a mut Document, ServiceError> {
    lib.document_mut(doc_id)
        .ok_or_else(|| ServiceError::document_not_found(doc_id))
}

pub struct ChunkService<R = InMemoryRepository<Library>> {
    repo: Arc<R>,
}

impl<R> Clone for ChunkService<R> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
        }
    }
}

impl<R: Repository<Library>> ChunkService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    fn library(&self, lib_id: &str) -> Result<Library, ServiceError> {
        self.repo
            .get(lib_id)
            .ok_or_else(|| ServiceError::library_not_found(lib_id))
    }

    pub fn add_chunk(
        &self,
        lib_id: &str,
        doc_id: &str,
        chunk: Chunk,
    ) -> Result<Chunk, ServiceError> {
        debug!(library_id = lib_id, document_id = doc_id, chunk_id = %chunk.id, "Adding chunk");
        chunk.validate()?;

        let (_, generation) = self.repo.modify(lib_id, |lib| {
            document_in_mut(lib, doc_id)?.chunks.push(chunk.clone());
            check_unique_chunk_ids(lib)?;
            check_uniform_dimension(lib)
        })?;

        info!(document_id = doc_id, chunk_id = %chunk.id, generation, "Chunk added");
        Ok(chunk)
    }

    pub fn get_chunk(
        &self,
        lib_id: &str,
        doc_id: &str,
        chunk_id: &str,
    ) -> Result<Chunk, ServiceError> {
        debug!(library_id = lib_id, document_id = doc_id, chunk_id, "Fetching chunk");
        let lib = self.library(lib_id)?;
        document_in(&lib, doc_id)?
            .chunk(chunk_id)
            .cloned()
            .ok_or_else(|| ServiceError::chunk_not_found(chunk_id))
    }

    pub fn list_chunks(&self, lib_id: &str, doc_id: &str) -> Result<Vec<Chunk>, ServiceError> {
        let lib = self.library(lib_id)?;
        Ok(document_in(&lib, doc_id)?.chunks.clone())
    }

    /// Replace a chunk. `chunk.id` must equal `chunk_id`.
    pub fn update_chunk(
        &self,
        lib_id: &str,
        doc_id: &str,
        chunk_id: &str,
        chunk: Chunk,
    ) -> Result<Chunk, ServiceError> {
        debug!(library_id = lib_id, document_id = doc_id, chunk_id, "Updating chunk");
        if chunk.id != chunk_id {
            return Err(ServiceError::Validation(format!(
                "Chunk id '{}' does not match '{}'",
                chunk.id, chunk_id
            )));
        }
        chunk.validate()?;

        let (_, generation) = self.repo.modify(lib_id, |lib| {
            let existing = document_in_mut(lib, doc_id)?
                .chunk_mut(chunk_id)
                .ok_or_else(|| ServiceError::chunk_not_found(chunk_id))?;
            *existing = chunk.clone();
            check_uniform_dimension(lib)
        })?;

        info!(document_id = doc_id, chunk_id, generation, "Chunk updated");
        Ok(chunk)
    }

    pub fn delete_chunk(
        &self,
        lib_id: &str,
        doc_id: &str,
        chunk_id: &str,
    ) -> Result<(), ServiceError> {
        debug!(library_id = lib_id, document_id = doc_id, chunk_id, "Deleting chunk");
        let (_, generation) = self.repo.modify(lib_id, |lib| {
            let doc = document_in_mut(lib, doc_id)?;
            let before = doc.chunks.len();
            doc.chunks.retain(|c| c.id != chunk_id);
            if doc.chunks.len() == before {
                return Err(ServiceError::chunk_not_found(chunk_id));
            }
            Ok(())
        })?;

        info!(document_id = doc_id, chunk_id, generation, "Chunk deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> ChunkService {
        let repo = Arc::new(InMemoryRepository::new());
        repo.create(
            Library::new("lib", "Lib").with_documents(vec![
                Document::new("d1", "One"),
                Document::new("d2", "Two"),
            ]),
        )
        .unwrap();
        ChunkService::new(repo)
    }

    #[test]
    fn test_add_get_list() {
        let svc = service();
        svc.add_chunk("lib", "d1", Chunk::new("c1", "a", vec![1.0, 0.0]))
            .unwrap();
        svc.add_chunk("lib", "d1", Chunk::new("c2", "b", vec![0.0, 1.0]))
            .unwrap();

        assert_eq!(svc.get_chunk("lib", "d1", "c2").unwrap().text, "b");
        assert_eq!(svc.list_chunks("lib", "d1").unwrap().len(), 2);
        assert!(svc.list_chunks("lib", "d2").unwrap().is_empty());
    }

    #[test]
    fn test_add_duplicate_rejected() {
        let svc = service();
        svc.add_chunk("lib", "d1", Chunk::new("c1", "a", vec![1.0]))
            .unwrap();
        assert!(matches!(
            svc.add_chunk("lib", "d1", Chunk::new("c1", "again", vec![1.0])),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn test_add_rejects_id_used_in_another_document() {
        let svc = service();
        svc.add_chunk("lib", "d1", Chunk::new("x", "from-d1", vec![1.0, 0.0]))
            .unwrap();
        assert!(matches!(
            svc.add_chunk("lib", "d2", Chunk::new("x", "from-d2", vec![0.0, 1.0])),
            Err(ServiceError::Validation(_))
        ));
        assert!(svc.list_chunks("lib", "d2").unwrap().is_empty());
    }

    #[test]
    fn test_add_rejects_invalid_chunk() {
        let svc = service();
        assert!(matches!(
            svc.add_chunk("lib", "d1", Chunk::new("c1", "a", vec![])),
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            svc.add_chunk("lib", "d1", Chunk::new("c1", "  ", vec![1.0])),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn test_dimension_shared_across_documents() {
        let svc = service();
        svc.add_chunk("lib", "d1", Chunk::new("c1", "a", vec![1.0, 0.0]))
            .unwrap();
        assert!(matches!(
            svc.add_chunk("lib", "d2", Chunk::new("c2", "b", vec![1.0, 0.0, 0.0])),
            Err(ServiceError::Validation(_))
        ));
        assert!(svc.list_chunks("lib", "d2").unwrap().is_empty());
    }

    #[test]
    fn test_missing_parents() {
        let svc = service();
        assert_eq!(
            svc.add_chunk("nope", "d1", Chunk::new("c", "a", vec![1.0]))
                .unwrap_err(),
            ServiceError::library_not_found("nope")
        );
        assert_eq!(
            svc.add_chunk("lib", "d9", Chunk::new("c", "a", vec![1.0]))
                .unwrap_err(),
            ServiceError::document_not_found("d9")
        );
        assert_eq!(
            svc.get_chunk("lib", "d1", "c9").unwrap_err(),
            ServiceError::chunk_not_found("c9")
        );
    }

    #[test]
    fn test_update() {
        let svc = service();
        svc.add_chunk("lib", "d1", Chunk::new("c1", "a", vec![1.0, 0.0]))
            .unwrap();

        svc.update_chunk("lib", "d1", "c1", Chunk::new("c1", "new", vec![0.0, 1.0]))
            .unwrap();
        let stored = svc.get_chunk("lib", "d1", "c1").unwrap();
        assert_eq!(stored.text, "new");
        assert_eq!(stored.embedding, vec![0.0, 1.0]);

        assert!(matches!(
            svc.update_chunk("lib", "d1", "c1", Chunk::new("c2", "x", vec![1.0, 0.0])),
            Err(ServiceError::Validation(_))
        ));
        assert_eq!(
            svc.update_chunk("lib", "d1", "c9", Chunk::new("c9", "x", vec![1.0, 0.0]))
                .unwrap_err(),
            ServiceError::chunk_not_found("c9")
        );
    }

    #[test]
    fn test_delete() {
        let svc = service();
        svc.add_chunk("lib", "d1", Chunk::new("c1", "a", vec![1.0]))
            .unwrap();
        svc.delete_chunk("lib", "d1", "c1").unwrap();

        assert!(svc.list_chunks("lib", "d1").unwrap().is_empty());
        assert_eq!(
            svc.delete_chunk("lib", "d1", "c1").unwrap_err(),
            ServiceError::chunk_not_found("c1")
        );
        assert_eq!(
            svc.delete_chunk("lib", "d9", "c1").unwrap_err(),
            ServiceError::document_not_found("d9")
        );
    }
}
