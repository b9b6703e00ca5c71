//! Library / document / chunk hierarchy.
//!
//! A library owns documents, a document owns chunks, and every chunk carries
//! the embedding that the k-NN index searches over. Entities are plain data:
//! they are cloned in and out of the repository and serialized as JSON for
//! snapshots.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StacksError;

/// Anything stored under a string identifier.
pub trait Entity {
    /// Unique identifier within the owning collection
    fn id(&self) -> &str;
}

/// A piece of text together with its embedding vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique identifier within its document
    pub id: String,

    /// Raw chunk text
    pub text: String,

    /// Embedding vector (must be non-empty)
    pub embedding: Vec<f32>,

    /// Optional tags
    #[serde(default)]
    pub tags: Vec<String>,

    /// Creation time
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Chunk {
    pub fn new(id: impl Into<String>, text: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            embedding,
            tags: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Embedding dimension
    pub fn dimension(&self) -> usize {
        self.embedding.len()
    }

    pub fn validate(&self) -> Result<(), StacksError> {
        if self.text.trim().is_empty() {
            return Err(StacksError::InvalidInput(format!(
                "Chunk '{}' text cannot be blank",
                self.id
            )));
        }
        if self.embedding.is_empty() {
            return Err(StacksError::InvalidInput(format!(
                "Chunk '{}' embedding cannot be empty",
                self.id
            )));
        }
        Ok(())
    }
}

impl Entity for Chunk {
    fn id(&self) -> &str {
        &self.id
    }
}

fn default_language() -> Option<String> {
    Some("en".to_string())
}

/// A titled document made of chunks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier within its library
    pub id: String,

    /// Document title
    pub title: String,

    /// Author or source
    #[serde(default)]
    pub author: Option<String>,

    /// ISO language code
    #[serde(default = "default_language")]
    pub language: Option<String>,

    /// Chunks in this document
    #[serde(default)]
    pub chunks: Vec<Chunk>,

    /// Optional tags
    #[serde(default)]
    pub tags: Vec<String>,

    /// Creation time
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Document {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            author: None,
            language: default_language(),
            chunks: Vec::new(),
            tags: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_chunks(mut self, chunks: Vec<Chunk>) -> Self {
        self.chunks = chunks;
        self
    }

    /// Find a chunk by ID
    pub fn chunk(&self, chunk_id: &str) -> Option<&Chunk> {
        self.chunks.iter().find(|c| c.id == chunk_id)
    }

    /// Find a chunk by ID for in-place modification
    pub fn chunk_mut(&mut self, chunk_id: &str) -> Option<&mut Chunk> {
        self.chunks.iter_mut().find(|c| c.id == chunk_id)
    }

    pub fn validate(&self) -> Result<(), StacksError> {
        if self.title.trim().is_empty() {
            return Err(StacksError::InvalidInput(format!(
                "Document '{}' title cannot be blank",
                self.id
            )));
        }
        let mut seen = HashSet::new();
        for chunk in &self.chunks {
            if !seen.insert(chunk.id.as_str()) {
                return Err(StacksError::InvalidInput(format!(
                    "Chunk '{}' appears twice in document '{}'",
                    chunk.id, self.id
                )));
            }
            chunk.validate()?;
        }
        Ok(())
    }
}

impl Entity for Document {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Top-level collection; the unit the repository stores and the index is built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Library {
    /// Unique identifier
    pub id: String,

    /// Library name
    pub name: String,

    /// Library description
    #[serde(default)]
    pub description: Option<String>,

    /// Documents in this library
    #[serde(default)]
    pub documents: Vec<Document>,

    /// Optional tags
    #[serde(default)]
    pub tags: Vec<String>,

    /// Creation time
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Library {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            documents: Vec::new(),
            tags: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_documents(mut self, documents: Vec<Document>) -> Self {
        self.documents = documents;
        self
    }

    /// Find a document by ID
    pub fn document(&self, doc_id: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == doc_id)
    }

    /// Find a document by ID for in-place modification
    pub fn document_mut(&mut self, doc_id: &str) -> Option<&mut Document> {
        self.documents.iter_mut().find(|d| d.id == doc_id)
    }

    /// All chunks across all documents, in document order.
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.documents.iter().flat_map(|d| d.chunks.iter())
    }

    /// Total number of chunks in the library
    pub fn chunk_count(&self) -> usize {
        self.documents.iter().map(|d| d.chunks.len()).sum()
    }

    /// First chunk id that occurs more than once across all documents.
    pub fn duplicate_chunk_id(&self) -> Option<&str> {
        let mut seen = HashSet::new();
        self.chunks()
            .map(|c| c.id.as_str())
            .find(|id| !seen.insert(*id))
    }

    pub fn validate(&self) -> Result<(), StacksError> {
        if self.name.trim().is_empty() {
            return Err(StacksError::InvalidInput(
                "Library name cannot be blank".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for doc in &self.documents {
            if !seen.insert(doc.id.as_str()) {
                return Err(StacksError::InvalidInput(format!(
                    "Document '{}' appears twice in library '{}'",
                    doc.id, self.id
                )));
            }
            doc.validate()?;
        }
        // The index is built over every document at once.
        if let Some(id) = self.duplicate_chunk_id() {
            return Err(StacksError::InvalidInput(format!(
                "Chunk '{}' appears in more than one document of library '{}'",
                id, self.id
            )));
        }
        Ok(())
    }

    /// Serialize to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, StacksError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Deserialize from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StacksError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl Entity for Library {
    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_library() -> Library {
        Library::new("lib-1", "Papers").with_documents(vec![
            Document::new("doc-a", "Alpha").with_chunks(vec![
                Chunk::new("c1", "first", vec![1.0, 0.0]),
                Chunk::new("c2", "second", vec![0.0, 1.0]),
            ]),
            Document::new("doc-b", "Beta").with_chunks(vec![Chunk::new(
                "c3",
                "third",
                vec![1.0, 1.0],
            )]),
        ])
    }

    #[test]
    fn test_chunks_flatten_in_document_order() {
        let lib = sample_library();
        let ids: Vec<&str> = lib.chunks().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2", "c3"]);
        assert_eq!(lib.chunk_count(), 3);
    }

    #[test]
    fn test_blank_library_name_rejected() {
        let lib = Library::new("x", "   ");
        assert!(matches!(lib.validate(), Err(StacksError::InvalidInput(_))));
    }

    #[test]
    fn test_empty_embedding_rejected() {
        let chunk = Chunk::new("c", "text", vec![]);
        assert!(chunk.validate().is_err());
    }

    #[test]
    fn test_duplicate_chunk_ids_rejected() {
        let doc = Document::new("d", "Title").with_chunks(vec![
            Chunk::new("c", "one", vec![1.0]),
            Chunk::new("c", "two", vec![2.0]),
        ]);
        assert!(doc.validate().is_err());
    }

    #[test]
    fn test_chunk_ids_unique_across_documents() {
        let mut lib = sample_library();
        assert_eq!(lib.duplicate_chunk_id(), None);
        assert!(lib.validate().is_ok());

        lib.documents[1].chunks[0].id = "c1".to_string();
        assert_eq!(lib.duplicate_chunk_id(), Some("c1"));
        assert!(lib.documents[1].validate().is_ok());
        assert!(matches!(lib.validate(), Err(StacksError::InvalidInput(_))));
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let json = r#"{
            "id": "lib",
            "name": "Minimal",
            "documents": [
                {"id": "d", "title": "T", "chunks": [
                    {"id": "c", "text": "hello", "embedding": [0.5, 0.5]}
                ]}
            ]
        }"#;
        let lib = Library::from_bytes(json.as_bytes()).unwrap();
        assert!(lib.tags.is_empty());
        assert_eq!(lib.documents[0].language.as_deref(), Some("en"));
        assert_eq!(lib.documents[0].chunks[0].dimension(), 2);
        assert!(lib.validate().is_ok());
    }

    #[test]
    fn test_lookup_helpers() {
        let mut lib = sample_library();
        assert!(lib.document("doc-b").is_some());
        assert!(lib.document("missing").is_none());

        let doc = lib.document_mut("doc-a").unwrap();
        doc.chunk_mut("c2").unwrap().text = "changed".to_string();
        assert_eq!(lib.document("doc-a").unwrap().chunk("c2").unwrap().text, "changed");
    }
}
