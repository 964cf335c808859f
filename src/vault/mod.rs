//! Vault Module
//!
//! The content-addressed ROM store itself: derives keys, answers existence
//! queries, stores containers and verifies them.
//!
//! ## Responsibilities
//! - Own the single process-wide object store handle
//! - Existence checks via bounded prefix listing (no content transfer)
//! - Packaging and upload of single-entry containers (`writer`)
//! - Re-fingerprinting stored content on demand (`verify`)
//!
//! ## Existence semantics
//! A blob "exists" when listing with the full derived key as prefix returns
//! at least one path. The full key already names exactly one object, so this
//! behaves like an exact lookup today, while still matching if a key ever
//! grows extra objects beneath it.

mod verify;
mod writer;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::config::Config;
use crate::error::Result;
use crate::fingerprint::{Fingerprint, Fingerprinter};
use crate::key::{derive_key, StorageKey};
use crate::store::{LocalObjectStore, ObjectStore};

pub use verify::VerifyOutcome;

/// Content-addressed ROM store
#[derive(Debug)]
pub struct RomVault {
    /// Shared object store client (created once, reused for every call)
    store: Arc<dyn ObjectStore>,

    /// Chunked reader used for every fingerprint
    fingerprinter: Fingerprinter,

    /// Where temporary containers and downloads are created
    scratch_dir: PathBuf,
}

impl RomVault {
    /// Build a vault over an existing store handle
    pub fn new(store: Arc<dyn ObjectStore>, config: &Config) -> Result<Self> {
        config.validate()?;
        let scratch_dir = config.scratch_dir();
        std::fs::create_dir_all(&scratch_dir)?;

        Ok(Self {
            store,
            fingerprinter: Fingerprinter::new(config.chunk_size),
            scratch_dir,
        })
    }

    /// Open a vault over a local directory store at `config.store_root`
    pub fn open(config: &Config) -> Result<Self> {
        let store = LocalObjectStore::open(&config.store_root)?;
        Self::new(Arc::new(store), config)
    }

    /// Fingerprint a stream with the configured chunk size
    pub fn fingerprint<R: std::io::Read + ?Sized>(&self, reader: &mut R) -> Result<Fingerprint> {
        self.fingerprinter.fingerprint(reader)
    }

    /// Storage key for an identity
    pub fn key_for(&self, name: &str, fingerprint: &Fingerprint) -> StorageKey {
        derive_key(name, fingerprint)
    }

    /// Whether a blob is stored for (name, fingerprint)
    ///
    /// Store failures are returned as errors, never as `false`.
    pub fn exists(&self, name: &str, fingerprint: &Fingerprint) -> Result<bool> {
        Ok(self.locate(name, fingerprint)?.is_some())
    }

    /// First stored path matching the identity's key, if any
    pub fn locate(&self, name: &str, fingerprint: &Fingerprint) -> Result<Option<String>> {
        let key = derive_key(name, fingerprint);
        let found = self.store.list(key.as_str(), 1)?.into_iter().next();
        debug!(key = %key, found = found.is_some(), "existence check");
        Ok(found)
    }

    /// Get the underlying object store
    pub fn object_store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Get the scratch directory
    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }
}
