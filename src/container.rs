//! Stored blob container
//!
//! Every blob is a deflate-compressed zip holding exactly one entry, whose
//! name is the ROM's logical name.

use std::io::{self, Read, Seek, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{Result, RomVaultError};

/// Zip entries above this size need the zip64 extension
const ZIP64_THRESHOLD: u64 = u32::MAX as u64;

/// Write `source` into `dest` as a single-entry zip named `name`
///
/// `size_hint` is the expected content length; it only decides whether the
/// entry is written in zip64 form. Returns the number of content bytes.
pub fn write_single_entry<W, R>(dest: W, name: &str, size_hint: u64, source: &mut R) -> Result<u64>
where
    W: Write + Seek,
    R: Read + ?Sized,
{
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(size_hint >= ZIP64_THRESHOLD);

    let mut writer = ZipWriter::new(dest);
    writer.start_file(name, options)?;
    let copied = io::copy(source, &mut writer)?;

    // Central directory
    writer.finish()?;
    Ok(copied)
}

/// Open the entry `name` in the container read from `source`, and hand its
/// decompressed stream to `f`
///
/// `key` is only used to label a missing-entry error.
pub fn with_entry<S, T, F>(source: S, key: &str, name: &str, f: F) -> Result<T>
where
    S: Read + Seek,
    F: FnOnce(&mut dyn Read) -> Result<T>,
{
    let mut archive = ZipArchive::new(source)?;
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => {
            return Err(RomVaultError::MissingEntry {
                key: key.to_string(),
                name: name.to_string(),
            })
        }
        Err(e) => return Err(e.into()),
    };
    f(&mut entry)
}
