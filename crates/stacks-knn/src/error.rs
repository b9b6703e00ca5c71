//! k-NN index error types.

use thiserror::Error;

/// Errors that can occur while building or querying an index.
///
/// Empty collections and `k == 0` are not errors; both simply produce
/// empty results.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KnnError {
    /// Vectors of different lengths in one build, or a query whose
    /// length differs from the indexed vectors.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}
