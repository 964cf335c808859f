//! Tests for LocalObjectStore
//!
//! These tests verify:
//! - put/get/download round trips
//! - Prefix listing and its limit
//! - Staged uploads leave nothing behind, even when the source fails

use std::io::{self, Read};
use std::path::PathBuf;

use romvault::store::{LocalObjectStore, ObjectStore};
use romvault::RomVaultError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_store() -> (TempDir, PathBuf, LocalObjectStore) {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("store");
    let store = LocalObjectStore::open(&root).unwrap();
    (temp_dir, root, store)
}

fn put_bytes(store: &LocalObjectStore, path: &str, bytes: &[u8]) {
    let mut source = bytes;
    store.put(path, &mut source).unwrap();
}

/// Yields some bytes, then fails mid-upload
struct BrokenSource {
    sent: bool,
}

impl Read for BrokenSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.sent {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "source vanished"));
        }
        self.sent = true;
        buf[..4].copy_from_slice(b"PART");
        Ok(4)
    }
}

// =============================================================================
// Open Tests
// =============================================================================

#[test]
fn test_open_creates_directory() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("new_store");
    assert!(!root.exists());

    let store = LocalObjectStore::open(&root).unwrap();

    assert!(root.is_dir());
    assert_eq!(store.root(), root.as_path());
    assert_eq!(store.staged_count().unwrap(), 0);
}

// =============================================================================
// Put / Get / Download
// =============================================================================

#[test]
fn test_put_then_get() {
    let (_temp, root, store) = setup_store();

    put_bytes(&store, "roms/a/1/2/abc/a.zip", b"blob");

    assert_eq!(store.get("roms/a/1/2/abc/a.zip").unwrap(), Some(b"blob".to_vec()));
    assert!(root.join("roms/a/1/2/abc/a.zip").is_file());
}

#[test]
fn test_get_missing_is_none() {
    let (_temp, _root, store) = setup_store();
    assert_eq!(store.get("roms/nothing/here.zip").unwrap(), None);
}

#[test]
fn test_put_overwrites() {
    let (_temp, _root, store) = setup_store();

    put_bytes(&store, "roms/x.zip", b"first");
    put_bytes(&store, "roms/x.zip", b"second");

    assert_eq!(store.get("roms/x.zip").unwrap(), Some(b"second".to_vec()));
}

#[test]
fn test_download_streams_content() {
    let (_temp, _root, store) = setup_store();
    let payload: Vec<u8> = (0..50_000u32).map(|i| i as u8).collect();
    put_bytes(&store, "roms/big.zip", &payload);

    let mut reader = store.download("roms/big.zip").unwrap();
    let mut out = Vec::new();
    reader.read_to_end(&mut out).unwrap();

    assert_eq!(out, payload);
}

#[test]
fn test_download_missing_is_transfer_error() {
    let (_temp, _root, store) = setup_store();

    let result = store.download("roms/missing.zip");
    assert!(matches!(result, Err(RomVaultError::Transfer { .. })));
}

#[test]
fn test_failed_upload_leaves_nothing() {
    let (_temp, _root, store) = setup_store();

    let result = store.put("roms/partial.zip", &mut BrokenSource { sent: false });

    assert!(matches!(result, Err(RomVaultError::Transfer { .. })));
    assert_eq!(store.get("roms/partial.zip").unwrap(), None);
    assert_eq!(store.staged_count().unwrap(), 0);
    assert!(store.list("roms/", 10).unwrap().is_empty());
}

#[test]
fn test_invalid_paths_rejected() {
    let (_temp, _root, store) = setup_store();

    for path in ["../escape.zip", "roms//double.zip", ".staging/sneaky"] {
        let result = store.put(path, &mut &b"x"[..]);
        assert!(
            matches!(result, Err(RomVaultError::InvalidPath(_))),
            "{:?} should be rejected",
            path
        );
    }
}

// =============================================================================
// Listing
// =============================================================================

#[test]
fn test_list_exact_path_as_prefix() {
    let (_temp, _root, store) = setup_store();
    put_bytes(&store, "roms/a.rom/3/9/abc/a.rom.zip", b"1");
    put_bytes(&store, "roms/a.rom/4/9/abc/a.rom.zip", b"2");

    let found = store.list("roms/a.rom/3/9/abc/a.rom.zip", 1).unwrap();
    assert_eq!(found, vec!["roms/a.rom/3/9/abc/a.rom.zip".to_string()]);
}

#[test]
fn test_list_partial_segment_prefix() {
    let (_temp, _root, store) = setup_store();
    put_bytes(&store, "roms/game1.rom/1/1/x/game1.rom.zip", b"1");
    put_bytes(&store, "roms/game2.rom/1/1/x/game2.rom.zip", b"2");
    put_bytes(&store, "roms/other.rom/1/1/x/other.rom.zip", b"3");

    let found = store.list("roms/game", 10).unwrap();
    assert_eq!(
        found,
        vec![
            "roms/game1.rom/1/1/x/game1.rom.zip".to_string(),
            "roms/game2.rom/1/1/x/game2.rom.zip".to_string(),
        ]
    );
}

#[test]
fn test_list_respects_limit() {
    let (_temp, _root, store) = setup_store();
    for i in 0..5 {
        put_bytes(&store, &format!("roms/many/{}.zip", i), b"x");
    }

    assert_eq!(store.list("roms/many/", 1).unwrap().len(), 1);
    assert_eq!(store.list("roms/many/", 3).unwrap().len(), 3);
    assert_eq!(store.list("roms/many/", 10).unwrap().len(), 5);
    assert!(store.list("roms/many/", 0).unwrap().is_empty());
}

#[test]
fn test_list_missing_directory_is_empty() {
    let (_temp, _root, store) = setup_store();
    assert!(store.list("roms/never/stored/", 1).unwrap().is_empty());
}

#[test]
fn test_reopen_sees_existing_blobs() {
    let (_temp, root, store) = setup_store();
    put_bytes(&store, "roms/keep.zip", b"kept");
    drop(store);

    let reopened = LocalObjectStore::open(&root).unwrap();
    assert_eq!(reopened.list("roms/keep", 1).unwrap(), vec!["roms/keep.zip".to_string()]);
}
