//! End-to-end test infrastructure for stacks.
//!
//! Provides a shared TestHarness and fixture helpers for E2E tests that
//! drive the services from library creation through search.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use stacks_knn::distance::euclidean_distance;
use stacks_knn::{FirstPivot, KnnIndex, LinearScanner, MetricTree, RandomPivot};
use stacks_service::{SearchIndex, Services};
use stacks_storage::InMemoryRepository;
use stacks_types::{Chunk, Document, IndexerKind, Library};

/// Shared test harness for E2E tests.
///
/// Wires the three services to one in-memory repository and keeps a handle
/// on the search index so tests can observe rebuilds.
pub struct TestHarness {
    pub services: Services,
    pub repo: Arc<InMemoryRepository<Library>>,
    pub index: Arc<SearchIndex>,
}

impl TestHarness {
    /// Harness backed by a deterministic metric tree (first-item pivots).
    pub fn new() -> Self {
        Self::with_index(Box::new(MetricTree::<Chunk>::with_pivot(FirstPivot)))
    }

    /// Harness backed by the given strategy. The tree uses a fixed seed.
    pub fn with_kind(kind: IndexerKind) -> Self {
        match kind {
            IndexerKind::BruteForce => Self::with_index(Box::new(LinearScanner::<Chunk>::new())),
            IndexerKind::VpTree => {
                Self::with_index(Box::new(MetricTree::<Chunk>::with_pivot(RandomPivot::seeded(7))))
            }
        }
    }

    pub fn with_index(index: Box<dyn KnnIndex<Chunk>>) -> Self {
        let repo = Arc::new(InMemoryRepository::new());
        let index = Arc::new(SearchIndex::new(index));
        let services = Services::new(Arc::clone(&repo), Arc::clone(&index));
        Self {
            services,
            repo,
            index,
        }
    }

    /// Create `library` and return its id.
    pub fn load(&self, library: Library) -> String {
        let id = library.id.clone();
        self.services
            .libraries
            .create_library(library)
            .expect("Failed to create library");
        id
    }

    /// Ids of the `k` nearest chunks.
    pub fn search_ids(&self, lib_id: &str, query: &[f32], k: usize) -> Vec<String> {
        self.services
            .libraries
            .search(lib_id, query, k)
            .expect("Search failed")
            .into_iter()
            .map(|c| c.id)
            .collect()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// The four-point library used across scenarios:
/// `c1=[1,0] c2=[0,1]` in `doc-a`, `c3=[1,1] c4=[2,2]` in `doc-b`.
pub fn scenario_library(id: &str) -> Library {
    Library::new(id, "Scenario").with_documents(vec![
        Document::new("doc-a", "Axes").with_chunks(vec![
            Chunk::new("c1", "east", vec![1.0, 0.0]),
            Chunk::new("c2", "north", vec![0.0, 1.0]),
        ]),
        Document::new("doc-b", "Diagonal").with_chunks(vec![
            Chunk::new("c3", "near diagonal", vec![1.0, 1.0]),
            Chunk::new("c4", "far diagonal", vec![2.0, 2.0]),
        ]),
    ])
}

/// A library of `docs` documents with `per_doc` random chunks each.
///
/// Components are drawn uniformly from [-1, 1) with a seeded RNG, so the
/// same arguments always produce the same library.
pub fn random_library(id: &str, docs: usize, per_doc: usize, dim: usize, seed: u64) -> Library {
    let mut rng = StdRng::seed_from_u64(seed);
    let documents = (0..docs)
        .map(|d| {
            let chunks = (0..per_doc)
                .map(|c| {
                    let embedding = random_vector(&mut rng, dim);
                    Chunk::new(format!("d{d:03}-c{c:04}"), format!("chunk {c} of {d}"), embedding)
                })
                .collect();
            Document::new(format!("d{d:03}"), format!("Document {d}")).with_chunks(chunks)
        })
        .collect();
    Library::new(id, "Random").with_documents(documents)
}

pub fn random_vector(rng: &mut StdRng, dim: usize) -> Vec<f32> {
    (0..dim).map(|_| rng.random_range(-1.0..1.0)).collect()
}

/// Reference Euclidean top-k ids computed by sorting every chunk.
pub fn reference_top_k(library: &Library, query: &[f32], k: usize) -> Vec<String> {
    let mut scored: Vec<(f32, &str)> = library
        .chunks()
        .map(|c| (euclidean_distance(query, &c.embedding), c.id.as_str()))
        .collect();
    scored.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(b.1)));
    scored
        .into_iter()
        .take(k)
        .map(|(_, id)| id.to_string())
        .collect()
}
