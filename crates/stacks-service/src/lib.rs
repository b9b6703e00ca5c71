//! # stacks-service
//!
//! Library, document and chunk services over a shared repository, plus
//! k-NN search through a generation-gated index.
//!
//! Every nested write goes through [`Repository::modify`], so the whole
//! read-modify-write of a library happens under the repository lock and a
//! rejected change leaves nothing behind. Searches rebuild the index only
//! when the library has been written since the last build.
//!
//! [`Repository::modify`]: stacks_storage::Repository::modify

pub mod chunk;
pub mod container;
pub mod document;
pub mod error;
pub mod library;
pub mod search;

pub use chunk::ChunkService;
pub use container::Services;
pub use document::DocumentService;
pub use error::ServiceError;
pub use library::LibraryService;
pub use search::{IndexGeneration, SearchHit, SearchIndex};
