//! Tests for RomVault: existence checks, the store writer and the verifier

mod verify_tests;
mod writer_tests;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use romvault::store::MemoryObjectStore;
use romvault::{Config, Fingerprint, Fingerprinter, RomVault};
use tempfile::TempDir;

// =============================================================================
// Shared Fixtures
// =============================================================================

pub struct Fixture {
    pub _temp: TempDir,
    pub source_dir: PathBuf,
    pub scratch_dir: PathBuf,
    pub store: Arc<MemoryObjectStore>,
    pub vault: RomVault,
}

pub fn setup() -> Fixture {
    let temp = TempDir::new().unwrap();
    let source_dir = temp.path().join("source");
    let scratch_dir = temp.path().join("scratch");
    fs::create_dir_all(&source_dir).unwrap();

    let config = Config::builder()
        .store_root(temp.path().join("unused"))
        .scratch_dir(&scratch_dir)
        .build();
    let store = Arc::new(MemoryObjectStore::new());
    let vault = RomVault::new(store.clone(), &config).unwrap();

    Fixture {
        _temp: temp,
        source_dir,
        scratch_dir,
        store,
        vault,
    }
}

/// Write a source file and return its fingerprint
pub fn write_rom(dir: &Path, name: &str, content: &[u8]) -> Fingerprint {
    fs::write(dir.join(name), content).unwrap();
    Fingerprinter::default().fingerprint(&mut &content[..]).unwrap()
}

pub fn scratch_is_empty(dir: &Path) -> bool {
    fs::read_dir(dir).unwrap().next().is_none()
}
