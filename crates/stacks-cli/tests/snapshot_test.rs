//! Snapshot files and config files read from disk.

use std::io::Write;
use std::path::PathBuf;

use tempfile::{NamedTempFile, TempDir};

use stacks_cli::{
    inspect_library, load_library, load_settings, print_hits, search_library, SearchOptions,
};
use stacks_types::IndexerKind;

const SNAPSHOT: &str = r#"{
    "id": "papers",
    "name": "Papers",
    "documents": [
        {"id": "d1", "title": "First", "chunks": [
            {"id": "c1", "text": "east", "embedding": [1.0, 0.0]},
            {"id": "c2", "text": "north", "embedding": [0.0, 1.0]}
        ]},
        {"id": "d2", "title": "Second", "chunks": [
            {"id": "c3", "text": "diagonal", "embedding": [1.0, 1.0]},
            {"id": "c4", "text": "far diagonal", "embedding": [2.0, 2.0]}
        ]}
    ]
}"#;

fn write_snapshot(dir: &TempDir, contents: &str) -> PathBuf {
    let path = dir.path().join("snapshot.json");
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_search_snapshot_from_disk() {
    let dir = TempDir::new().unwrap();
    let path = write_snapshot(&dir, SNAPSHOT);
    let settings = load_settings(None, None).unwrap();

    let library = load_library(&path).unwrap();
    let options = SearchOptions {
        k: Some(1),
        indexer: Some(IndexerKind::VpTree),
        seed: Some(42),
    };
    let hits = search_library(&settings, library, &[1.0, 1.0], &options).unwrap();

    let mut out = Vec::new();
    print_hits(&hits, true, &mut out).unwrap();
    let rows: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(rows[0]["id"], "c3");
    assert_eq!(rows[0]["distance"], 0.0);
    assert!(rows[0].get("similarity").is_none());
}

#[test]
fn test_inspect_snapshot() {
    let dir = TempDir::new().unwrap();
    let path = write_snapshot(&dir, SNAPSHOT);

    let mut out = Vec::new();
    let summary = inspect_library(&path, &mut out).unwrap();
    assert_eq!(summary.documents, 2);
    assert_eq!(summary.chunks, 4);
    assert_eq!(summary.dimension, Some(2));

    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("Papers (papers)"));
    assert!(text.contains("Chunks:     4"));
}

#[test]
fn test_missing_snapshot_reports_path() {
    let dir = TempDir::new().unwrap();
    let err = load_library(&dir.path().join("absent.json")).unwrap_err();
    assert!(err.to_string().contains("absent.json"));
}

#[test]
fn test_malformed_snapshot() {
    let dir = TempDir::new().unwrap();
    let path = write_snapshot(&dir, "{\"id\": \"x\"");
    let err = load_library(&path).unwrap_err();
    assert!(err.to_string().contains("Failed to parse"));
}

#[test]
fn test_mixed_dimensions_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_snapshot(
        &dir,
        r#"{"id": "m", "name": "Mixed", "documents": [{"id": "d", "title": "T", "chunks": [
            {"id": "a", "text": "a", "embedding": [1.0, 0.0]},
            {"id": "b", "text": "b", "embedding": [1.0, 0.0, 0.0]}
        ]}]}"#,
    );
    let library = load_library(&path).unwrap();
    let result = search_library(
        &load_settings(None, None).unwrap(),
        library,
        &[1.0, 0.0],
        &SearchOptions::default(),
    );
    assert!(result.is_err());
}

#[test]
fn test_config_file_and_log_level_override() {
    let mut file = NamedTempFile::with_suffix(".toml").unwrap();
    writeln!(file, "indexer = \"brute_force\"").unwrap();
    writeln!(file, "default_top_k = 2").unwrap();
    writeln!(file, "log_level = \"warn\"").unwrap();

    let path = file.path().to_str().unwrap();
    let settings = load_settings(Some(path), Some("trace")).unwrap();
    assert_eq!(settings.indexer, IndexerKind::BruteForce);
    assert_eq!(settings.default_top_k, 2);
    assert_eq!(settings.log_level, "trace");
}

#[test]
fn test_missing_config_file_fails() {
    assert!(load_settings(Some("/nonexistent/stacks.toml"), None).is_err());
}
