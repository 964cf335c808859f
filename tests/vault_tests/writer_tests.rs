//! Store Writer tests

use std::io::{Cursor, Read};

use romvault::store::ObjectStore;
use romvault::{derive_key, ErrorCategory, RomVaultError};
use zip::ZipArchive;

use super::{scratch_is_empty, setup, write_rom};

#[test]
fn test_store_uploads_single_entry_zip_at_key() {
    let fx = setup();
    let content = b"PRG ROM bank 0".repeat(100);
    let fp = write_rom(&fx.source_dir, "bank0.rom", &content);

    let key = fx.vault.store(&fx.source_dir, "bank0.rom", &fp).unwrap();
    assert_eq!(key, derive_key("bank0.rom", &fp));

    let blob = fx.store.get(key.as_str()).unwrap().expect("blob stored at key");
    let mut archive = ZipArchive::new(Cursor::new(blob)).unwrap();
    assert_eq!(archive.len(), 1);

    let mut entry = archive.by_index(0).unwrap();
    assert_eq!(entry.name(), "bank0.rom");
    assert_eq!(entry.compression(), zip::CompressionMethod::Deflated);

    let mut stored = Vec::new();
    entry.read_to_end(&mut stored).unwrap();
    assert_eq!(stored, content);
}

#[test]
fn test_store_cleans_scratch() {
    let fx = setup();
    let fp = write_rom(&fx.source_dir, "game.rom", b"tmp");

    fx.vault.store(&fx.source_dir, "game.rom", &fp).unwrap();

    assert!(scratch_is_empty(&fx.scratch_dir));
}

#[test]
fn test_store_twice_uploads_twice() {
    let fx = setup();
    let fp = write_rom(&fx.source_dir, "game.rom", b"twice");

    fx.vault.store(&fx.source_dir, "game.rom", &fp).unwrap();
    fx.vault.store(&fx.source_dir, "game.rom", &fp).unwrap();

    assert_eq!(fx.store.put_count(), 2);
    assert_eq!(fx.store.len(), 1);
}

#[test]
fn test_missing_source_fails_without_upload() {
    let fx = setup();
    let fp = write_rom(&fx.source_dir, "present.rom", b"x");

    let result = fx.vault.store(&fx.source_dir, "absent.rom", &fp);

    let err = result.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Transfer);
    assert_eq!(fx.store.put_count(), 0);
    assert!(!fx.vault.exists("absent.rom", &fp).unwrap());
    assert!(scratch_is_empty(&fx.scratch_dir));
}

#[test]
fn test_invalid_name_rejected() {
    let fx = setup();
    let fp = write_rom(&fx.source_dir, "ok.rom", b"x");

    let result = fx.vault.store(&fx.source_dir, "../ok.rom", &fp);

    assert!(matches!(result, Err(RomVaultError::InvalidName(_))));
    assert_eq!(fx.store.put_count(), 0);
}

#[test]
fn test_store_from_reader() {
    let fx = setup();
    let content = b"streamed straight in";
    let fp = fx.vault.fingerprint(&mut &content[..]).unwrap();

    let key = fx
        .vault
        .store_from_reader(&mut &content[..], "stream.rom", &fp)
        .unwrap();

    assert_eq!(key, derive_key("stream.rom", &fp));
    assert!(fx.vault.exists("stream.rom", &fp).unwrap());
}
