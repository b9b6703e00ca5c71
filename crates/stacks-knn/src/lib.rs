//! # stacks-knn
//!
//! Exact k-nearest-neighbor indexes for stacks.
//!
//! Two interchangeable strategies implement [`KnnIndex`]:
//! - [`LinearScanner`]: full cosine scan with bounded top-k selection
//! - [`MetricTree`]: vantage-point tree over Euclidean distance with
//!   branch-and-bound search
//!
//! Both return neighbors best first as ascending distances, ties broken by
//! item id. Indexes are always rebuilt wholesale from the current item set;
//! nothing is persisted or updated incrementally.

pub mod distance;
pub mod error;
pub mod index;
pub mod pivot;
pub mod scan;
pub mod vptree;

pub use error::KnnError;
pub use index::{Embedded, IndexStats, KnnIndex, Metric, Neighbor};
pub use pivot::{FirstPivot, PivotSelector, RandomPivot};
pub use scan::LinearScanner;
pub use vptree::MetricTree;

use stacks_types::IndexerKind;

/// Create an empty index for the configured strategy.
///
/// `pivot_seed` only affects the metric tree; with a seed its shape is
/// reproducible across builds.
pub fn create_index<T>(kind: IndexerKind, pivot_seed: Option<u64>) -> Box<dyn KnnIndex<T>>
where
    T: Embedded + Send + Sync + 'static,
{
    match kind {
        IndexerKind::BruteForce => Box::new(LinearScanner::<T>::new()),
        IndexerKind::VpTree => {
            let pivot = match pivot_seed {
                Some(seed) => RandomPivot::seeded(seed),
                None => RandomPivot::new(),
            };
            Box::new(MetricTree::<T>::with_pivot(pivot))
        }
    }
}
