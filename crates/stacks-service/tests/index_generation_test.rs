//! Search index freshness across service writes.

use std::sync::Arc;
use std::thread;

use serde_json::json;

use stacks_knn::{FirstPivot, MetricTree};
use stacks_service::{SearchIndex, Services};
use stacks_storage::InMemoryRepository;
use stacks_types::{Chunk, Document, Library};

fn services() -> (Services, Arc<SearchIndex>) {
    let index = Arc::new(SearchIndex::new(Box::new(MetricTree::<Chunk>::with_pivot(
        FirstPivot,
    ))));
    let services = Services::new(Arc::new(InMemoryRepository::new()), Arc::clone(&index));
    (services, index)
}

fn scenario_library() -> Library {
    let value = json!({
        "id": "lib",
        "name": "Scenario",
        "documents": [{
            "id": "doc",
            "title": "Points",
            "chunks": [
                {"id": "c1", "text": "one", "embedding": [1.0, 0.0]},
                {"id": "c2", "text": "two", "embedding": [0.0, 1.0]},
                {"id": "c3", "text": "three", "embedding": [1.0, 1.0]},
                {"id": "c4", "text": "four", "embedding": [2.0, 2.0]}
            ]
        }]
    });
    serde_json::from_value(value).unwrap()
}

#[test]
fn test_repeated_searches_build_once() {
    let (services, index) = services();
    services
        .libraries
        .create_library(scenario_library())
        .unwrap();

    for _ in 0..5 {
        let hits = services.libraries.search("lib", &[1.0, 1.0], 1).unwrap();
        assert_eq!(hits[0].id, "c3");
    }
    assert_eq!(index.rebuild_count(), 1);
}

#[test]
fn test_every_kind_of_write_forces_rebuild() {
    let (services, index) = services();
    services
        .libraries
        .create_library(scenario_library())
        .unwrap();
    services.libraries.search("lib", &[1.0, 1.0], 1).unwrap();
    assert_eq!(index.rebuild_count(), 1);

    services
        .chunks
        .add_chunk("lib", "doc", Chunk::new("c5", "five", vec![3.0, 3.0]))
        .unwrap();
    let hits = services.libraries.search("lib", &[3.0, 3.0], 1).unwrap();
    assert_eq!(hits[0].id, "c5");
    assert_eq!(index.rebuild_count(), 2);

    services.chunks.delete_chunk("lib", "doc", "c5").unwrap();
    let hits = services.libraries.search("lib", &[3.0, 3.0], 1).unwrap();
    assert_eq!(hits[0].id, "c4");
    assert_eq!(index.rebuild_count(), 3);

    services
        .documents
        .add_document(
            "lib",
            Document::new("far", "Far away")
                .with_chunks(vec![Chunk::new("f1", "far", vec![10.0, 10.0])]),
        )
        .unwrap();
    let hits = services.libraries.search("lib", &[9.0, 9.0], 1).unwrap();
    assert_eq!(hits[0].id, "f1");
    assert_eq!(index.rebuild_count(), 4);

    let mut lib = services.libraries.get_library("lib").unwrap();
    lib.documents.retain(|d| d.id != "far");
    services.libraries.update_library("lib", lib).unwrap();
    let hits = services.libraries.search("lib", &[9.0, 9.0], 1).unwrap();
    assert_eq!(hits[0].id, "c4");
    assert_eq!(index.rebuild_count(), 5);
}

#[test]
fn test_rejected_write_keeps_index_current() {
    let (services, index) = services();
    services
        .libraries
        .create_library(scenario_library())
        .unwrap();
    services.libraries.search("lib", &[1.0, 1.0], 1).unwrap();

    let bad = Chunk::new("c9", "wrong width", vec![1.0, 2.0, 3.0]);
    assert!(services.chunks.add_chunk("lib", "doc", bad).is_err());

    services.libraries.search("lib", &[1.0, 1.0], 1).unwrap();
    assert_eq!(index.rebuild_count(), 1);
}

#[test]
fn test_alternating_libraries() {
    let (services, index) = services();
    services
        .libraries
        .create_library(scenario_library())
        .unwrap();
    let mut other = scenario_library();
    other.id = "other".to_string();
    other.documents[0].chunks.truncate(1);
    services.libraries.create_library(other).unwrap();

    assert_eq!(
        services.libraries.search("other", &[1.0, 1.0], 4).unwrap().len(),
        1
    );
    assert_eq!(
        services.libraries.search("lib", &[1.0, 1.0], 4).unwrap().len(),
        4
    );
    assert_eq!(index.rebuild_count(), 2);
}

#[test]
fn test_concurrent_writers_and_searchers() {
    let (services, _index) = services();
    services
        .libraries
        .create_library(scenario_library())
        .unwrap();
    let services = Arc::new(services);

    let writers: Vec<_> = (0..4)
        .map(|w| {
            let services = Arc::clone(&services);
            thread::spawn(move || {
                for i in 0..25 {
                    let chunk = Chunk::new(format!("w{w}-{i}"), "added", vec![5.0 + i as f32, 5.0]);
                    services.chunks.add_chunk("lib", "doc", chunk).unwrap();
                }
            })
        })
        .collect();
    let searchers: Vec<_> = (0..4)
        .map(|_| {
            let services = Arc::clone(&services);
            thread::spawn(move || {
                for _ in 0..25 {
                    let hits = services.libraries.search("lib", &[1.0, 1.0], 1).unwrap();
                    assert_eq!(hits[0].id, "c3");
                }
            })
        })
        .collect();

    for handle in writers.into_iter().chain(searchers) {
        handle.join().unwrap();
    }

    let lib = services.libraries.get_library("lib").unwrap();
    assert_eq!(lib.chunk_count(), 4 + 100);
    let all = services.libraries.search("lib", &[0.0, 0.0], 1000).unwrap();
    assert_eq!(all.len(), 104);
}
