//! Incoming archives
//!
//! Turns an uploaded zip into logical entries, either by extracting it to a
//! scratch directory ([`extract_archive`]) or by reading entries in place
//! ([`ArchiveReader`]).
//!
//! ## Rules
//! - A malformed archive is a format error; nothing is handed out
//! - Entries whose path would leave the extraction root are rejected
//! - Directory entries are skipped
//! - An entry's logical name is its base file name

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;
use zip::ZipArchive;

use crate::error::{Result, RomVaultError, TransferOp};
use crate::key::validate_name;

/// A named file produced by archive extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalEntry {
    /// Base file name, used verbatim in keys and as the container entry name
    pub name: String,

    /// Directory holding the extracted file
    pub dir: PathBuf,
}

impl LogicalEntry {
    /// Full path of the extracted file
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.name)
    }

    /// Open the entry's byte stream
    pub fn open(&self) -> Result<BufReader<File>> {
        Ok(BufReader::new(File::open(self.path())?))
    }
}

/// An archive unpacked into a scratch directory
///
/// The directory (and everything in it) is removed when this is dropped.
#[derive(Debug)]
pub struct ExtractedArchive {
    dir: TempDir,
    entries: Vec<LogicalEntry>,
}

impl ExtractedArchive {
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn entries(&self) -> &[LogicalEntry] {
        &self.entries
    }
}

/// Extract every file in the zip at `archive` into a new directory under `scratch`
pub fn extract_archive(archive: &Path, scratch: &Path) -> Result<ExtractedArchive> {
    let mut reader = ArchiveReader::open(archive)?;
    let dir = tempfile::Builder::new()
        .prefix("romvault-extract-")
        .tempdir_in(scratch)?;

    let extract_err = |source: io::Error| RomVaultError::Transfer {
        op: TransferOp::Extract,
        path: archive.display().to_string(),
        source,
    };

    let mut entries = Vec::new();
    for index in 0..reader.len() {
        let mut entry = reader.archive.by_index(index)?;
        if entry.is_dir() {
            continue;
        }

        let relative = entry_relative_path(entry.name(), entry.enclosed_name())?;
        let name = entry_name(&relative)?;
        let target = dir.path().join(&relative);

        debug!(entry = entry.name(), "extracting");
        let parent = target.parent().unwrap_or_else(|| dir.path()).to_path_buf();
        fs::create_dir_all(&parent).map_err(extract_err)?;
        let mut output = File::create(&target).map_err(extract_err)?;
        io::copy(&mut entry, &mut output).map_err(extract_err)?;

        entries.push(LogicalEntry { name, dir: parent });
    }

    Ok(ExtractedArchive { dir, entries })
}

/// Zip opened for reading entries in place
pub struct ArchiveReader {
    archive: ZipArchive<BufReader<File>>,
}

impl ArchiveReader {
    /// Open an archive, failing with a format error if it is not a valid zip
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| RomVaultError::Transfer {
            op: TransferOp::Extract,
            path: path.display().to_string(),
            source,
        })?;
        let archive = ZipArchive::new(BufReader::new(file))?;
        Ok(Self { archive })
    }

    /// Number of raw entries, directories included
    pub fn len(&self) -> usize {
        self.archive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archive.len() == 0
    }

    /// Logical name of entry `index`, `None` for directories
    pub fn entry_name(&mut self, index: usize) -> Result<Option<String>> {
        let entry = self.archive.by_index(index)?;
        if entry.is_dir() {
            return Ok(None);
        }
        let relative = entry_relative_path(entry.name(), entry.enclosed_name())?;
        entry_name(&relative).map(Some)
    }

    /// Run `f` over the decompressed stream of entry `index`
    pub fn with_entry<T, F>(&mut self, index: usize, f: F) -> Result<T>
    where
        F: FnOnce(&mut dyn Read) -> Result<T>,
    {
        let mut entry = self.archive.by_index(index)?;
        f(&mut entry)
    }
}

fn entry_relative_path(raw: &str, enclosed: Option<PathBuf>) -> Result<PathBuf> {
    enclosed.ok_or_else(|| RomVaultError::Format(format!("illegal entry path {:?}", raw)))
}

fn entry_name(relative: &Path) -> Result<String> {
    let name = relative
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| RomVaultError::Format(format!("entry has no usable name: {:?}", relative)))?;
    validate_name(name)?;
    Ok(name.to_string())
}
