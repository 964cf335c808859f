//! Object Store Module
//!
//! The blob store romvault writes into. Paths are opaque `/`-separated
//! strings; the store treats them as flat keys that support prefix listing.
//!
//! ## Responsibilities
//! - `get`: fetch a whole blob, or report it absent
//! - `list`: metadata-only prefix query, bounded by `limit`
//! - `put`: upload a blob so that it appears whole or not at all
//! - `download`: stream a blob's bytes
//!
//! ## Implementations
//! - [`LocalObjectStore`]: directory tree on disk, uploads staged then renamed
//! - [`MemoryObjectStore`]: in-process map, used by tests and dry runs

mod local;
mod memory;

use std::fmt::Debug;
use std::io::Read;

use crate::error::Result;

pub use local::LocalObjectStore;
pub use memory::MemoryObjectStore;

/// Blob store primitives
///
/// One handle is created at startup and shared (`Arc<dyn ObjectStore>`);
/// implementations must be safe to call from several workers at once.
pub trait ObjectStore: Send + Sync + Debug {
    /// Fetch a blob's full contents, `None` if nothing is stored at `path`
    fn get(&self, path: &str) -> Result<Option<Vec<u8>>>;

    /// Paths starting with `prefix`, at most `limit` of them
    ///
    /// Must not transfer blob content. Failures surface as
    /// `RomVaultError::Query`.
    fn list(&self, prefix: &str, limit: usize) -> Result<Vec<String>>;

    /// Store everything `source` yields at `path`, returning the byte count
    ///
    /// Readers of `path` see either the previous blob or the complete new one.
    fn put(&self, path: &str, source: &mut dyn Read) -> Result<u64>;

    /// Open a stream over the blob at `path`
    fn download(&self, path: &str) -> Result<Box<dyn Read + Send>>;
}
