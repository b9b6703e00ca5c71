//! Linear scanner: exact cosine search by full scan.
//!
//! Every stored vector is scored against the query and the best `k` are
//! kept in a bounded heap, O(n log k) per query.

use tracing::debug;

use crate::distance::cosine_distance;
use crate::error::KnnError;
use crate::index::{
    check_query_dimension, uniform_dimension, Candidate, Embedded, IndexStats, KnnIndex, Metric,
    Neighbor, TopK,
};

/// Flat buffer of items ranked by cosine distance (`1 - similarity`).
///
/// Results are best first: ascending distance, which is descending
/// similarity. Equal scores are ordered by item id.
pub struct LinearScanner<T> {
    items: Vec<T>,
    dimension: Option<usize>,
}

impl<T> LinearScanner<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            dimension: None,
        }
    }
}

impl<T> Default for LinearScanner<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Embedded + Send + Sync> KnnIndex<T> for LinearScanner<T> {
    fn metric(&self) -> Metric {
        Metric::Cosine
    }

    fn build(&mut self, items: Vec<T>) -> Result<(), KnnError> {
        let dimension = uniform_dimension(&items)?;
        debug!(items = items.len(), ?dimension, "Built linear scanner");
        self.items = items;
        self.dimension = dimension;
        Ok(())
    }

    fn query(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor<'_, T>>, KnnError> {
        let Some(dimension) = self.dimension else {
            return Ok(Vec::new());
        };
        if k == 0 {
            return Ok(Vec::new());
        }
        check_query_dimension(dimension, query)?;

        let mut top = TopK::new(k);
        for (slot, item) in self.items.iter().enumerate() {
            top.offer(Candidate {
                distance: cosine_distance(query, item.embedding()),
                id: item.id(),
                slot,
            });
        }

        Ok(top
            .into_sorted_vec()
            .into_iter()
            .map(|c| Neighbor {
                item: &self.items[c.slot],
                distance: c.distance,
                metric: Metric::Cosine,
            })
            .collect())
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    fn stats(&self) -> IndexStats {
        IndexStats {
            strategy: "brute_force",
            item_count: self.items.len(),
            dimension: self.dimension,
            height: 0,
        }
    }
}
