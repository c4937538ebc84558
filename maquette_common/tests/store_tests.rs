//! File-backed configuration store tests.
//!
//! Save/load round trip through a real file, missing-file handling,
//! malformed file rejection and capacity enforcement on load.

use maquette_common::consts::MAX_STORE_ITEMS;
use maquette_common::store::{ConfigStore, StoreError, TomlFileStore};
use std::fs;
use tempfile::TempDir;

// ─── Tests ──────────────────────────────────────────────────────────

/// Test: values written through the store survive a save and reopen.
#[test]
fn save_then_open_restores_values() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("store.toml");

    let mut store = TomlFileStore::new(&path);
    store.set_raw("velocity_x", "12000").unwrap();
    store.set_raw("tilt_min", "30.5").unwrap();
    store.set_raw("operator", "bench").unwrap();
    store.set_bool("verbose", true).unwrap();
    store.save().unwrap();

    let reopened = TomlFileStore::open(&path).unwrap();
    assert_eq!(reopened.get_int("velocity_x", 0), 12000);
    assert_eq!(reopened.get_float("tilt_min", 0.0), 30.5);
    assert_eq!(reopened.get_string("operator", ""), "bench");
    assert!(reopened.get_bool("verbose", false));
    assert_eq!(reopened.keys().len(), 4);
}

/// Test: a missing file is an empty store, not an error.
#[test]
fn open_missing_file_starts_empty() {
    let tmp = TempDir::new().unwrap();
    let store = TomlFileStore::open(tmp.path().join("absent.toml")).unwrap();
    assert!(store.keys().is_empty());
    assert_eq!(store.get_float("tilt_max", 135.0), 135.0);
}

/// Test: load replaces unsaved in-memory edits.
#[test]
fn load_discards_unsaved_changes() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("store.toml");
    fs::write(&path, "acceleration = 50000\n").unwrap();

    let mut store = TomlFileStore::open(&path).unwrap();
    store.set_int("acceleration", 1).unwrap();
    store.set_int("scratch", 1).unwrap();
    store.load().unwrap();

    assert_eq!(store.get_int("acceleration", 0), 50000);
    assert!(!store.has_key("scratch"));
}

/// Test: nested tables are not a flat key/value file.
#[test]
fn nested_table_is_parse_error() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("store.toml");
    fs::write(&path, "[motion]\nvelocity = 1\n").unwrap();

    let result = TomlFileStore::open(&path);
    assert!(matches!(result, Err(StoreError::Parse(_))));
}

/// Test: an oversized file is truncated to the store capacity.
#[test]
fn oversized_file_is_truncated() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("store.toml");
    let text: String = (0..MAX_STORE_ITEMS + 5)
        .map(|i| format!("key_{i:03} = {i}\n"))
        .collect();
    fs::write(&path, text).unwrap();

    let store = TomlFileStore::open(&path).unwrap();
    assert_eq!(store.keys().len(), MAX_STORE_ITEMS);
}
