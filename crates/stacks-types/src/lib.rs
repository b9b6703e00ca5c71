//! # stacks-types
//!
//! Shared domain types for stacks.
//!
//! - Entities: libraries, documents and the embedded chunks they hold
//! - Settings: layered configuration
//! - Errors: the workspace-wide `StacksError`

pub mod config;
pub mod entity;
pub mod error;

pub use self::config::{default_config_path, IndexerKind, Settings};
pub use entity::{Chunk, Document, Entity, Library};
pub use error::StacksError;
