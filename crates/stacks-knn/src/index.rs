//! Index contract shared by every k-NN strategy.
//!
//! Every strategy reports results as ascending distances, so the
//! strategies are interchangeable behind [`KnnIndex`]. The metric that
//! produced a distance travels with it in [`Neighbor`].

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;

use stacks_types::Chunk;

use crate::error::KnnError;

/// An item that can be placed in a k-NN index.
pub trait Embedded {
    /// Identifier, unique within the collection being indexed
    fn id(&self) -> &str;

    /// Embedding vector
    fn embedding(&self) -> &[f32];
}

impl Embedded for Chunk {
    fn id(&self) -> &str {
        &self.id
    }

    fn embedding(&self) -> &[f32] {
        &self.embedding
    }
}

/// Distance function behind a result's score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// `1 - cosine_similarity`
    Cosine,
    /// L2 distance
    Euclidean,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Cosine => write!(f, "cosine"),
            Metric::Euclidean => write!(f, "euclidean"),
        }
    }
}

/// One query result: a borrowed item and its distance (lower = closer).
#[derive(Debug, Clone)]
pub struct Neighbor<'a, T> {
    pub item: &'a T,
    pub distance: f32,
    pub metric: Metric,
}

impl<T> Neighbor<'_, T> {
    /// Cosine similarity for cosine results; `None` for Euclidean results.
    pub fn similarity(&self) -> Option<f32> {
        match self.metric {
            Metric::Cosine => Some(1.0 - self.distance),
            Metric::Euclidean => None,
        }
    }
}

/// Index statistics
#[derive(Debug, Clone, PartialEq)]
pub struct IndexStats {
    /// Strategy name
    pub strategy: &'static str,
    /// Number of indexed items
    pub item_count: usize,
    /// Shared embedding dimension, `None` while empty
    pub dimension: Option<usize>,
    /// Tree height (0 for flat structures)
    pub height: usize,
}

/// Trait for k-NN indexes.
///
/// `build` replaces the whole structure; nothing is maintained
/// incrementally. Concurrent build/query pairs must be serialized by the
/// caller, which `&mut self` on `build` enforces for a single owner.
pub trait KnnIndex<T: Embedded>: Send + Sync {
    /// Distance function used to rank results
    fn metric(&self) -> Metric;

    /// Discard the current structure and index `items`.
    ///
    /// An empty vector yields an empty, queryable index. Items with
    /// differing embedding lengths are rejected and the previous
    /// structure is kept.
    fn build(&mut self, items: Vec<T>) -> Result<(), KnnError>;

    /// Return up to `k` items closest to `query`, best first.
    ///
    /// An empty index or `k == 0` returns an empty vector.
    fn query(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor<'_, T>>, KnnError>;

    /// Number of indexed items
    fn len(&self) -> usize;

    /// Check if the index is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Embedding dimension of the indexed items
    fn dimension(&self) -> Option<usize>;

    /// Get index statistics
    fn stats(&self) -> IndexStats;
}

/// Dimension shared by all `items`, or `None` for an empty slice.
pub(crate) fn uniform_dimension<T: Embedded>(items: &[T]) -> Result<Option<usize>, KnnError> {
    let Some(first) = items.first() else {
        return Ok(None);
    };
    let expected = first.embedding().len();
    for item in &items[1..] {
        let actual = item.embedding().len();
        if actual != expected {
            return Err(KnnError::DimensionMismatch { expected, actual });
        }
    }
    Ok(Some(expected))
}

pub(crate) fn check_query_dimension(expected: usize, query: &[f32]) -> Result<(), KnnError> {
    if query.len() != expected {
        return Err(KnnError::DimensionMismatch {
            expected,
            actual: query.len(),
        });
    }
    Ok(())
}

/// Heap entry ordered by (distance, id) so equal distances resolve by id.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Candidate<'a> {
    pub distance: f32,
    pub id: &'a str,
    pub slot: usize,
}

impl PartialEq for Candidate<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate<'_> {}

impl PartialOrd for Candidate<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.id.cmp(other.id))
    }
}

/// Bounded max-heap keeping the `k` best candidates seen so far.
pub(crate) struct TopK<'a> {
    k: usize,
    heap: BinaryHeap<Candidate<'a>>,
}

impl<'a> TopK<'a> {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            heap: BinaryHeap::with_capacity(k.saturating_add(1).min(1024)),
        }
    }

    pub fn is_full(&self) -> bool {
        self.heap.len() >= self.k
    }

    /// Largest kept distance, the eviction candidate.
    pub fn worst_distance(&self) -> Option<f32> {
        self.heap.peek().map(|c| c.distance)
    }

    /// Keep `candidate` if there is room or it beats the current worst.
    pub fn offer(&mut self, candidate: Candidate<'a>) {
        if self.k == 0 {
            return;
        }
        if self.heap.len() < self.k {
            self.heap.push(candidate);
        } else if let Some(mut worst) = self.heap.peek_mut() {
            if candidate < *worst {
                *worst = candidate;
            }
        }
    }

    /// Candidates ordered best first.
    pub fn into_sorted_vec(self) -> Vec<Candidate<'a>> {
        self.heap.into_sorted_vec()
    }
}
