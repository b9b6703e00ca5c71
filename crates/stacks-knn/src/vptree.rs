//! Vantage-point tree over Euclidean distance.
//!
//! Each node holds one vantage point and the median distance (`radius`)
//! from it to the items placed beneath it. Items within the radius go to
//! the near subtree, the rest to the far subtree. Queries descend the side
//! the query falls on first and visit the other side only when the
//! triangle inequality cannot rule it out, so the search is exact.
//!
//! Nodes live in an arena and both build and query run on explicit
//! stacks: heavily skewed partitions (e.g. many duplicate vectors) produce
//! deep trees, and the depth must not be bounded by the call stack.

use tracing::debug;

use crate::distance::euclidean_distance;
use crate::error::KnnError;
use crate::index::{
    check_query_dimension, uniform_dimension, Candidate, Embedded, IndexStats, KnnIndex, Metric,
    Neighbor, TopK,
};
use crate::pivot::{PivotSelector, RandomPivot};

/// Relative tolerance on pruning bounds, absorbs f32 rounding in the
/// distances the bound is derived from.
const BOUND_SLACK: f32 = 1e-5;

type NodeId = usize;

struct Node<T> {
    vantage: T,
    radius: f32,
    near: Option<NodeId>,
    far: Option<NodeId>,
}

/// Where a freshly built node is attached.
enum Link {
    Root,
    Near(NodeId),
    Far(NodeId),
}

/// Pending traversal work.
enum Step {
    Visit(NodeId),
    /// The side searched second, entered only if `bound` can still beat
    /// the worst kept distance once the first side is done.
    Deferred { node: NodeId, bound: f32 },
}

/// Exact k-NN index backed by a vantage-point tree.
pub struct MetricTree<T> {
    nodes: Vec<Node<T>>,
    root: Option<NodeId>,
    dimension: Option<usize>,
    height: usize,
    pivot: Box<dyn PivotSelector>,
}

impl<T> MetricTree<T> {
    /// Tree with OS-seeded random pivots.
    pub fn new() -> Self {
        Self::with_pivot(RandomPivot::new())
    }

    /// Tree with a custom pivot selector.
    pub fn with_pivot(pivot: impl PivotSelector + 'static) -> Self {
        Self {
            nodes: Vec::new(),
            root: None,
            dimension: None,
            height: 0,
            pivot: Box::new(pivot),
        }
    }

    /// Number of nodes on the longest root-to-leaf path.
    pub fn height(&self) -> usize {
        self.height
    }

    fn measure_height(&self) -> usize {
        let mut height = 0;
        let mut stack: Vec<(NodeId, usize)> = self.root.map(|r| (r, 1)).into_iter().collect();
        while let Some((id, depth)) = stack.pop() {
            height = height.max(depth);
            let node = &self.nodes[id];
            stack.extend(node.near.map(|c| (c, depth + 1)));
            stack.extend(node.far.map(|c| (c, depth + 1)));
        }
        height
    }
}

impl<T> Default for MetricTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Embedded> MetricTree<T> {
    fn build_nodes(&mut self, items: Vec<T>) -> (Vec<Node<T>>, Option<NodeId>) {
        self.pivot.reset();

        let mut nodes: Vec<Node<T>> = Vec::with_capacity(items.len());
        let mut root = None;
        let mut work: Vec<(Vec<T>, Link)> = vec![(items, Link::Root)];

        while let Some((mut bucket, link)) = work.pop() {
            if bucket.is_empty() {
                continue;
            }

            let pick = self.pivot.select(bucket.len()).min(bucket.len() - 1);
            let vantage = bucket.swap_remove(pick);

            let distances: Vec<f32> = bucket
                .iter()
                .map(|item| euclidean_distance(vantage.embedding(), item.embedding()))
                .collect();
            let radius = median(&distances);

            let mut near = Vec::new();
            let mut far = Vec::new();
            for (item, distance) in bucket.into_iter().zip(distances) {
                if distance <= radius {
                    near.push(item);
                } else {
                    far.push(item);
                }
            }

            let id = nodes.len();
            nodes.push(Node {
                vantage,
                radius,
                near: None,
                far: None,
            });
            match link {
                Link::Root => root = Some(id),
                Link::Near(parent) => nodes[parent].near = Some(id),
                Link::Far(parent) => nodes[parent].far = Some(id),
            }

            work.push((far, Link::Far(id)));
            work.push((near, Link::Near(id)));
        }

        (nodes, root)
    }
}

/// Upper median (`sorted[len / 2]`), 0 for no distances.
fn median(distances: &[f32]) -> f32 {
    if distances.is_empty() {
        return 0.0;
    }
    let mut scratch = distances.to_vec();
    let mid = scratch.len() / 2;
    let (_, median, _) = scratch.select_nth_unstable_by(mid, f32::total_cmp);
    *median
}

/// Whether a subtree whose points are at least `bound` away can still
/// contribute, given the current candidates.
fn may_contain_closer(top: &TopK<'_>, bound: f32) -> bool {
    match top.worst_distance() {
        Some(worst) if top.is_full() => bound <= worst + BOUND_SLACK * worst.max(1.0),
        _ => true,
    }
}

impl<T: Embedded + Send + Sync> KnnIndex<T> for MetricTree<T> {
    fn metric(&self) -> Metric {
        Metric::Euclidean
    }

    fn build(&mut self, items: Vec<T>) -> Result<(), KnnError> {
        let dimension = uniform_dimension(&items)?;
        let count = items.len();

        let (nodes, root) = self.build_nodes(items);
        self.nodes = nodes;
        self.root = root;
        self.dimension = dimension;
        self.height = self.measure_height();

        debug!(items = count, height = self.height, "Built metric tree");
        Ok(())
    }

    fn query(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor<'_, T>>, KnnError> {
        let (Some(root), Some(dimension)) = (self.root, self.dimension) else {
            return Ok(Vec::new());
        };
        if k == 0 {
            return Ok(Vec::new());
        }
        check_query_dimension(dimension, query)?;

        let mut top = TopK::new(k);
        let mut stack = vec![Step::Visit(root)];
        let mut visited = 0usize;

        while let Some(step) = stack.pop() {
            let id = match step {
                Step::Visit(id) => id,
                Step::Deferred { node, bound } => {
                    if may_contain_closer(&top, bound) {
                        stack.push(Step::Visit(node));
                    }
                    continue;
                }
            };

            visited += 1;
            let node = &self.nodes[id];
            let d = euclidean_distance(query, node.vantage.embedding());
            top.offer(Candidate {
                distance: d,
                id: node.vantage.id(),
                slot: id,
            });

            // Far points lie beyond the radius, near points within it; the
            // bound is the smallest distance the second side could hold.
            let (first, second, bound) = if d < node.radius {
                (node.near, node.far, node.radius - d)
            } else {
                (node.far, node.near, d - node.radius)
            };

            if let Some(second) = second {
                stack.push(Step::Deferred {
                    node: second,
                    bound,
                });
            }
            if let Some(first) = first {
                stack.push(Step::Visit(first));
            }
        }

        debug!(k, visited, total = self.nodes.len(), "Metric tree query complete");

        Ok(top
            .into_sorted_vec()
            .into_iter()
            .map(|c| Neighbor {
                item: &self.nodes[c.slot].vantage,
                distance: c.distance,
                metric: Metric::Euclidean,
            })
            .collect())
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }

    fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    fn stats(&self) -> IndexStats {
        IndexStats {
            strategy: "vp_tree",
            item_count: self.nodes.len(),
            dimension: self.dimension,
            height: self.height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pivot::FirstPivot;
    use stacks_types::Chunk;

    fn sample_chunks() -> Vec<Chunk> {
        vec![
            Chunk::new("c1", "a", vec![1.0, 0.0]),
            Chunk::new("c2", "b", vec![0.0, 1.0]),
            Chunk::new("c3", "ab", vec![1.0, 1.0]),
            Chunk::new("c4", "d", vec![2.0, 2.0]),
        ]
    }

    fn ids<T: Embedded>(results: &[Neighbor<'_, T>]) -> Vec<String> {
        results.iter().map(|n| n.item.id().to_string()).collect()
    }

    #[test]
    fn test_empty_index() {
        let mut tree = MetricTree::<Chunk>::new();
        tree.build(Vec::new()).unwrap();
        assert!(tree.is_empty());
        assert_eq!(tree.height(), 0);
        assert!(tree.query(&[0.0, 0.0], 3).unwrap().is_empty());
    }

    #[test]
    fn test_exact_match_first() {
        let mut tree = MetricTree::new();
        tree.build(sample_chunks()).unwrap();

        let results = tree.query(&[1.0, 1.0], 1).unwrap();
        assert_eq!(ids(&results), vec!["c3"]);
        assert_eq!(results[0].distance, 0.0);
        assert_eq!(results[0].similarity(), None);
    }

    #[test]
    fn test_origin_query_orders_ties_by_id() {
        let mut tree = MetricTree::with_pivot(FirstPivot);
        tree.build(sample_chunks()).unwrap();

        let results = tree.query(&[0.0, 0.0], 3).unwrap();
        assert_eq!(ids(&results), vec!["c1", "c2", "c3"]);
        assert_eq!(results[0].distance, 1.0);
        assert_eq!(results[1].distance, 1.0);
        assert!((results[2].distance - std::f32::consts::SQRT_2).abs() < 1e-6);
    }

    #[test]
    fn test_k_greater_than_size() {
        let mut tree = MetricTree::new();
        tree.build(sample_chunks()).unwrap();

        let results = tree.query(&[1.0, 1.0], 10).unwrap();
        assert_eq!(results.len(), 4);
        let mut got = ids(&results);
        got.sort();
        assert_eq!(got, vec!["c1", "c2", "c3", "c4"]);
        for pair in results.windows(2) {
            assert!(pair[0].distance <= pair[1].distance);
        }
    }

    #[test]
    fn test_k_zero() {
        let mut tree = MetricTree::new();
        tree.build(sample_chunks()).unwrap();
        assert!(tree.query(&[1.0, 1.0], 0).unwrap().is_empty());
    }

    #[test]
    fn test_first_pivot_shape_is_reproducible() {
        let mut a = MetricTree::with_pivot(FirstPivot);
        let mut b = MetricTree::with_pivot(FirstPivot);
        a.build(sample_chunks()).unwrap();
        b.build(sample_chunks()).unwrap();

        let ids_a: Vec<&str> = a.nodes.iter().map(|n| n.vantage.id.as_str()).collect();
        let ids_b: Vec<&str> = b.nodes.iter().map(|n| n.vantage.id.as_str()).collect();
        assert_eq!(ids_a, ids_b);
        assert_eq!(a.nodes[0].vantage.id, "c1");
    }

    #[test]
    fn test_radius_is_median_of_remaining() {
        let mut tree = MetricTree::with_pivot(FirstPivot);
        tree.build(sample_chunks()).unwrap();

        // Root is c1 = [1, 0]; distances to c4, c2, c3 are
        // sqrt(5), sqrt(2), 1, so the upper median is sqrt(2).
        let root = &tree.nodes[tree.root.unwrap()];
        assert!((root.radius - std::f32::consts::SQRT_2).abs() < 1e-6);
    }

    #[test]
    fn test_duplicates_build_deep_tree_without_overflow() {
        let items: Vec<Chunk> = (0..5_000)
            .map(|i| Chunk::new(format!("dup-{:05}", i), "same", vec![0.5, 0.5, 0.5]))
            .collect();

        let mut tree = MetricTree::with_pivot(FirstPivot);
        tree.build(items).unwrap();
        assert_eq!(tree.len(), 5_000);
        assert_eq!(tree.height(), 5_000);

        let results = tree.query(&[0.5, 0.5, 0.5], 3).unwrap();
        assert_eq!(ids(&results), vec!["dup-00000", "dup-00001", "dup-00002"]);
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut tree = MetricTree::new();
        tree.build(sample_chunks()).unwrap();

        assert_eq!(
            tree.query(&[1.0], 1).unwrap_err(),
            KnnError::DimensionMismatch {
                expected: 2,
                actual: 1
            }
        );

        let mut mixed = sample_chunks();
        mixed.push(Chunk::new("c5", "e", vec![1.0, 2.0, 3.0]));
        assert!(tree.build(mixed).is_err());
        assert_eq!(tree.len(), 4);
    }

    #[test]
    fn test_stats() {
        let mut tree = MetricTree::with_pivot(FirstPivot);
        tree.build(sample_chunks()).unwrap();
        let stats = tree.stats();
        assert_eq!(stats.strategy, "vp_tree");
        assert_eq!(stats.item_count, 4);
        assert_eq!(stats.dimension, Some(2));
        assert!(stats.height >= 2);
    }
}
