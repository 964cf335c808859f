//! Local Object Store
//!
//! Keeps blobs as plain files under a root directory, one file per path.
//!
//! ## Layout
//! ```text
//! {root}/
//!   ├── .staging/     in-flight uploads (NamedTempFile)
//!   └── roms/...      committed blobs
//! ```
//!
//! Uploads are written to `.staging` and renamed into place, so a reader
//! never observes a half-written blob at its final path.

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Result, RomVaultError, TransferOp};

use super::ObjectStore;

/// Directory (under root) holding uploads that have not been committed yet
const STAGING_DIR: &str = ".staging";

/// Object store backed by a directory tree
#[derive(Debug)]
pub struct LocalObjectStore {
    /// Store root directory
    root: PathBuf,
}

impl LocalObjectStore {
    /// Open or create a store rooted at `root`
    pub fn open(root: &Path) -> Result<Self> {
        fs::create_dir_all(root.join(STAGING_DIR))?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Get the root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of uploads currently staged (for testing/debugging)
    pub fn staged_count(&self) -> Result<usize> {
        Ok(fs::read_dir(self.root.join(STAGING_DIR))?.count())
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Map a store path onto the filesystem, rejecting anything that could
    /// escape the root or land in the staging area
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let segments = Self::segments(path)?;
        if segments.is_empty() || segments[0] == STAGING_DIR {
            return Err(RomVaultError::InvalidPath(path.to_string()));
        }

        let mut resolved = self.root.clone();
        resolved.extend(segments);
        Ok(resolved)
    }

    fn segments(path: &str) -> Result<Vec<&str>> {
        if path.is_empty() {
            return Ok(Vec::new());
        }

        let segments: Vec<&str> = path.split('/').collect();
        let bad = segments
            .iter()
            .any(|s| s.is_empty() || *s == "." || *s == ".." || s.contains('\\'));
        if bad {
            return Err(RomVaultError::InvalidPath(path.to_string()));
        }
        Ok(segments)
    }

    /// Push every file under `dir` (as store paths under `rel`) until `limit`
    fn collect_files(dir: &Path, rel: &str, limit: usize, out: &mut Vec<String>) -> io::Result<()> {
        let mut names: Vec<(String, bool)> = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let is_dir = entry.file_type()?.is_dir();
            names.push((entry.file_name().to_string_lossy().into_owned(), is_dir));
        }
        names.sort();

        for (name, is_dir) in names {
            if out.len() >= limit {
                break;
            }
            let child_rel = format!("{}/{}", rel, name);
            if is_dir {
                Self::collect_files(&dir.join(&name), &child_rel, limit, out)?;
            } else {
                out.push(child_rel);
            }
        }
        Ok(())
    }

    fn list_inner(&self, prefix: &str, limit: usize) -> io::Result<Vec<String>> {
        let mut out = Vec::new();
        if limit == 0 {
            return Ok(out);
        }

        // Directory part must exist; the last (partial) segment is matched by name
        let (dir_part, leaf) = match prefix.rsplit_once('/') {
            Some((dir, leaf)) => (dir, leaf),
            None => ("", prefix),
        };
        let mut dir = self.root.clone();
        if !dir_part.is_empty() {
            dir.extend(dir_part.split('/'));
        }

        let mut names: Vec<(String, bool)> = Vec::new();
        let read_dir = match fs::read_dir(&dir) {
            Ok(rd) => rd,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(out),
            Err(e) => return Err(e),
        };
        for entry in read_dir {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if dir_part.is_empty() && name == STAGING_DIR {
                continue;
            }
            if name.starts_with(leaf) {
                names.push((name, entry.file_type()?.is_dir()));
            }
        }
        names.sort();

        for (name, is_dir) in names {
            if out.len() >= limit {
                break;
            }
            let rel = if dir_part.is_empty() {
                name.clone()
            } else {
                format!("{}/{}", dir_part, name)
            };
            if is_dir {
                Self::collect_files(&dir.join(&name), &rel, limit, &mut out)?;
            } else {
                out.push(rel);
            }
        }

        Ok(out)
    }
}

impl ObjectStore for LocalObjectStore {
    fn get(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let target = self.resolve(path)?;
        match fs::read(&target) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(RomVaultError::Transfer {
                op: TransferOp::Download,
                path: path.to_string(),
                source: e,
            }),
        }
    }

    fn list(&self, prefix: &str, limit: usize) -> Result<Vec<String>> {
        // Validate every complete segment; the trailing one may be partial
        if let Some((dir_part, _)) = prefix.rsplit_once('/') {
            Self::segments(dir_part)?;
        }

        self.list_inner(prefix, limit)
            .map_err(|source| RomVaultError::Query {
                prefix: prefix.to_string(),
                source,
            })
    }

    fn put(&self, path: &str, source: &mut dyn Read) -> Result<u64> {
        let target = self.resolve(path)?;
        let upload_err = |source: io::Error| RomVaultError::Transfer {
            op: TransferOp::Upload,
            path: path.to_string(),
            source,
        };

        // Step 1: Stage the bytes next to the final location (same filesystem)
        let staging = self.root.join(STAGING_DIR);
        fs::create_dir_all(&staging).map_err(upload_err)?;
        let mut staged = NamedTempFile::new_in(&staging).map_err(upload_err)?;
        let written = io::copy(source, &mut staged).map_err(upload_err)?;
        staged.as_file().sync_all().map_err(upload_err)?;

        // Step 2: Rename into place; a dropped NamedTempFile cleans itself up
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(upload_err)?;
        }
        staged.persist(&target).map_err(|e| upload_err(e.error))?;

        debug!(path, bytes = written, "committed blob");
        Ok(written)
    }

    fn download(&self, path: &str) -> Result<Box<dyn Read + Send>> {
        let target = self.resolve(path)?;
        let file = File::open(&target).map_err(|source| RomVaultError::Transfer {
            op: TransferOp::Download,
            path: path.to_string(),
            source,
        })?;
        Ok(Box::new(BufReader::new(file)))
    }
}
