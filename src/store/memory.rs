//! In-memory Object Store
//!
//! A `BTreeMap` of path → bytes behind a `parking_lot::RwLock`. Prefix
//! listing is a range scan. Keeps per-operation counters and can be told to
//! fail queries, which is what the tests use it for.

use std::collections::BTreeMap;
use std::io::{self, Cursor, Read};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use bytes::Bytes;
use parking_lot::RwLock;

use crate::error::{Result, RomVaultError, TransferOp};

use super::ObjectStore;

/// Object store held entirely in process memory
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    /// Committed blobs
    blobs: RwLock<BTreeMap<String, Bytes>>,

    puts: AtomicUsize,
    lists: AtomicUsize,
    downloads: AtomicUsize,

    /// When set, `list` fails with a query error
    fail_queries: AtomicBool,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs
    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }

    /// All stored paths, sorted
    pub fn paths(&self) -> Vec<String> {
        self.blobs.read().keys().cloned().collect()
    }

    /// Total `put` calls so far
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// Total `list` calls so far
    pub fn list_count(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }

    /// Total `download` calls so far
    pub fn download_count(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    /// Make every subsequent `list` fail (or succeed again)
    pub fn set_fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }
}

impl ObjectStore for MemoryObjectStore {
    fn get(&self, path: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.blobs.read().get(path).map(|b| b.to_vec()))
    }

    fn list(&self, prefix: &str, limit: usize) -> Result<Vec<String>> {
        self.lists.fetch_add(1, Ordering::SeqCst);

        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(RomVaultError::Query {
                prefix: prefix.to_string(),
                source: io::Error::new(io::ErrorKind::ConnectionRefused, "store unavailable"),
            });
        }

        let blobs = self.blobs.read();
        Ok(blobs
            .range(prefix.to_string()..)
            .take_while(|(path, _)| path.starts_with(prefix))
            .take(limit)
            .map(|(path, _)| path.clone())
            .collect())
    }

    fn put(&self, path: &str, source: &mut dyn Read) -> Result<u64> {
        self.puts.fetch_add(1, Ordering::SeqCst);

        // Buffer fully before inserting so the blob appears all at once
        let mut buffer = Vec::new();
        source
            .read_to_end(&mut buffer)
            .map_err(|source| RomVaultError::Transfer {
                op: TransferOp::Upload,
                path: path.to_string(),
                source,
            })?;

        let written = buffer.len() as u64;
        self.blobs.write().insert(path.to_string(), Bytes::from(buffer));
        Ok(written)
    }

    fn download(&self, path: &str) -> Result<Box<dyn Read + Send>> {
        self.downloads.fetch_add(1, Ordering::SeqCst);

        let blob = self.blobs.read().get(path).cloned();
        match blob {
            Some(bytes) => Ok(Box::new(Cursor::new(bytes))),
            None => Err(RomVaultError::Transfer {
                op: TransferOp::Download,
                path: path.to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "no such blob"),
            }),
        }
    }
}
