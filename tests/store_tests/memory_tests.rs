//! Tests for MemoryObjectStore

use std::io::Read;

use romvault::store::{MemoryObjectStore, ObjectStore};
use romvault::{ErrorCategory, RomVaultError};

#[test]
fn test_put_get_and_counters() {
    let store = MemoryObjectStore::new();
    assert!(store.is_empty());

    store.put("roms/a.zip", &mut &b"abc"[..]).unwrap();

    assert_eq!(store.len(), 1);
    assert_eq!(store.put_count(), 1);
    assert_eq!(store.get("roms/a.zip").unwrap(), Some(b"abc".to_vec()));
    assert_eq!(store.get("roms/b.zip").unwrap(), None);
}

#[test]
fn test_list_is_a_prefix_range() {
    let store = MemoryObjectStore::new();
    for path in ["roms/a/1.zip", "roms/a/2.zip", "roms/ab/1.zip", "roms/b/1.zip"] {
        store.put(path, &mut &b"x"[..]).unwrap();
    }

    assert_eq!(
        store.list("roms/a/", 10).unwrap(),
        vec!["roms/a/1.zip".to_string(), "roms/a/2.zip".to_string()]
    );
    assert_eq!(store.list("roms/a", 10).unwrap().len(), 3);
    assert_eq!(store.list("roms/a", 1).unwrap(), vec!["roms/a/1.zip".to_string()]);
    assert!(store.list("roms/c", 10).unwrap().is_empty());
    assert_eq!(store.list_count(), 4);
}

#[test]
fn test_download() {
    let store = MemoryObjectStore::new();
    store.put("roms/a.zip", &mut &b"payload"[..]).unwrap();

    let mut out = String::new();
    store
        .download("roms/a.zip")
        .unwrap()
        .read_to_string(&mut out)
        .unwrap();

    assert_eq!(out, "payload");
    assert_eq!(store.download_count(), 1);
    assert!(matches!(
        store.download("roms/missing.zip"),
        Err(RomVaultError::Transfer { .. })
    ));
}

#[test]
fn test_failing_queries() {
    let store = MemoryObjectStore::new();
    store.put("roms/a.zip", &mut &b"x"[..]).unwrap();
    store.set_fail_queries(true);

    let err = store.list("roms/a.zip", 1).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Query);

    store.set_fail_queries(false);
    assert_eq!(store.list("roms/a.zip", 1).unwrap().len(), 1);
}
