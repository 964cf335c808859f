//! Verifier tests

use std::io::Cursor;

use romvault::container::write_single_entry;
use romvault::store::ObjectStore;
use romvault::{
    derive_key, ErrorCategory, Fingerprint, FingerprintField, RomVaultError, VerifyOutcome,
};

use super::{scratch_is_empty, setup, write_rom};

// =============================================================================
// Helper Functions
// =============================================================================

fn zip_bytes(entry_name: &str, content: &[u8]) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    write_single_entry(&mut buf, entry_name, content.len() as u64, &mut &content[..]).unwrap();
    buf.into_inner()
}

fn with_crc(fp: &Fingerprint, crc32: u32) -> Fingerprint {
    Fingerprint::from_parts(fp.size(), crc32, fp.sha1()).unwrap()
}

// =============================================================================
// Outcomes
// =============================================================================

#[test]
fn test_round_trip_matches() {
    let fx = setup();
    let fp = write_rom(&fx.source_dir, "game.rom", b"\x01\x02\x03");
    fx.vault.store(&fx.source_dir, "game.rom", &fp).unwrap();

    let outcome = fx.vault.verify("game.rom", &fp).unwrap();

    assert_eq!(
        outcome,
        VerifyOutcome::Matched {
            key: derive_key("game.rom", &fp).into_string()
        }
    );
    assert!(outcome.is_matched());
    assert!(scratch_is_empty(&fx.scratch_dir));
}

#[test]
fn test_never_stored_is_absent() {
    let fx = setup();
    let fp = write_rom(&fx.source_dir, "ghost.rom", b"boo");

    assert_eq!(fx.vault.verify("ghost.rom", &fp).unwrap(), VerifyOutcome::Absent);
    assert_eq!(fx.store.download_count(), 0);
}

#[test]
fn test_altered_crc_is_absent_under_its_own_key() {
    // A different fingerprint derives a different key, so nothing is found
    let fx = setup();
    let fp = write_rom(&fx.source_dir, "game.rom", b"\x01\x02\x03");
    fx.vault.store(&fx.source_dir, "game.rom", &fp).unwrap();

    let altered = with_crc(&fp, fp.crc32().wrapping_add(1));

    assert_eq!(fx.vault.verify("game.rom", &altered).unwrap(), VerifyOutcome::Absent);
}

#[test]
fn test_altered_crc_blob_reports_crc_mismatch() {
    // The blob at the altered key holds the real content: only crc32 differs
    let fx = setup();
    let content = b"\x01\x02\x03";
    let fp = write_rom(&fx.source_dir, "game.rom", content);
    let altered = with_crc(&fp, fp.crc32().wrapping_add(1));

    let key = derive_key("game.rom", &altered);
    fx.store
        .put(key.as_str(), &mut Cursor::new(zip_bytes("game.rom", content)))
        .unwrap();

    let outcome = fx.vault.verify("game.rom", &altered).unwrap();

    match outcome {
        VerifyOutcome::Mismatched {
            key: found,
            expected,
            actual,
            fields,
        } => {
            assert_eq!(found, key.into_string());
            assert_eq!(fields, vec![FingerprintField::Crc32]);
            assert_eq!(expected, altered);
            assert_eq!(actual, fp);
        }
        other => panic!("expected mismatch, got {:?}", other),
    }
}

#[test]
fn test_tampered_content_flags_every_field() {
    let fx = setup();
    let fp = write_rom(&fx.source_dir, "game.rom", b"original");
    let key = derive_key("game.rom", &fp);
    fx.store
        .put(key.as_str(), &mut Cursor::new(zip_bytes("game.rom", b"corrupted!")))
        .unwrap();

    let outcome = fx.vault.verify("game.rom", &fp).unwrap();

    match outcome {
        VerifyOutcome::Mismatched { fields, .. } => assert_eq!(
            fields,
            vec![FingerprintField::Size, FingerprintField::Crc32, FingerprintField::Sha1]
        ),
        other => panic!("expected mismatch, got {:?}", other),
    }
}

// =============================================================================
// Format Errors
// =============================================================================

#[test]
fn test_garbage_blob_is_format_error() {
    let fx = setup();
    let fp = write_rom(&fx.source_dir, "game.rom", b"x");
    let key = derive_key("game.rom", &fp);
    fx.store
        .put(key.as_str(), &mut &b"this is not a zip archive at all"[..])
        .unwrap();

    let err = fx.vault.verify("game.rom", &fp).unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Format);
    assert!(scratch_is_empty(&fx.scratch_dir));
}

#[test]
fn test_blob_without_named_entry_is_missing_entry() {
    let fx = setup();
    let fp = write_rom(&fx.source_dir, "game.rom", b"x");
    let key = derive_key("game.rom", &fp);
    fx.store
        .put(key.as_str(), &mut Cursor::new(zip_bytes("other.rom", b"x")))
        .unwrap();

    let err = fx.vault.verify("game.rom", &fp).unwrap_err();

    match err {
        RomVaultError::MissingEntry { key: k, name } => {
            assert_eq!(k, key.into_string());
            assert_eq!(name, "game.rom");
        }
        other => panic!("expected missing entry, got {:?}", other),
    }
}

#[test]
fn test_query_failure_propagates() {
    let fx = setup();
    let fp = write_rom(&fx.source_dir, "game.rom", b"x");
    fx.store.set_fail_queries(true);

    let err = fx.vault.verify("game.rom", &fp).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Query);
}
