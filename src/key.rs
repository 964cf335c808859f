//! Storage keys
//!
//! Maps a (name, fingerprint) identity onto its path in the object store:
//!
//! ```text
//! roms/<name>/<size>/<crc32>/<sha1>/<name>.zip
//! ```
//!
//! `size` and `crc32` are decimal, `sha1` is lowercase hex. Stored data is
//! addressed by this exact layout, so segment order and the suffix must not
//! change without migrating the store.
//!
//! Identity is (name, size, crc32, sha1). Two different contents sharing that
//! triple under one name would collide; that is only as unlikely as a SHA-1
//! collision, which is why stored blobs can be re-checked with the verifier.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RomVaultError};
use crate::fingerprint::Fingerprint;

/// Fixed namespace segment every key starts with
pub const ROOT_LABEL: &str = "roms";

/// Suffix appended to the name to form the container file name
pub const CONTAINER_SUFFIX: &str = ".zip";

/// A path in the object store derived from a name and fingerprint
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct StorageKey(String);

impl StorageKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Recover (name, fingerprint) from a well-formed key
    ///
    /// Returns `None` for anything `derive_key` could not have produced.
    pub fn parse(path: &str) -> Option<(String, Fingerprint)> {
        let segments: Vec<&str> = path.split('/').collect();
        if segments.len() != 6 || segments[0] != ROOT_LABEL {
            return None;
        }

        let name = segments[1];
        if validate_name(name).is_err() {
            return None;
        }
        if segments[5].strip_suffix(CONTAINER_SUFFIX) != Some(name) {
            return None;
        }

        let size: u64 = parse_decimal(segments[2])?;
        let crc32: u32 = parse_decimal(segments[3])?;
        // Keys always carry lowercase hex
        if segments[4].bytes().any(|b| b.is_ascii_uppercase()) {
            return None;
        }
        let fingerprint = Fingerprint::from_parts(size, crc32, segments[4]).ok()?;

        // Round trip guards against non-canonical spellings like "03"
        if derive_key(name, &fingerprint).as_str() != path {
            return None;
        }

        Some((name.to_string(), fingerprint))
    }
}

impl TryFrom<String> for StorageKey {
    type Error = RomVaultError;

    /// Accepts only paths `derive_key` could have produced
    fn try_from(path: String) -> Result<Self> {
        match StorageKey::parse(&path) {
            Some(_) => Ok(StorageKey(path)),
            None => Err(RomVaultError::InvalidPath(path)),
        }
    }
}

impl From<StorageKey> for String {
    fn from(key: StorageKey) -> Self {
        key.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StorageKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Derive the storage key for `name` with `fingerprint`
///
/// Pure function of its inputs.
pub fn derive_key(name: &str, fingerprint: &Fingerprint) -> StorageKey {
    StorageKey(format!(
        "{root}/{name}/{size}/{crc}/{sha1}/{name}{suffix}",
        root = ROOT_LABEL,
        name = name,
        size = fingerprint.size(),
        crc = fingerprint.crc32(),
        sha1 = fingerprint.sha1(),
        suffix = CONTAINER_SUFFIX,
    ))
}

/// Check that `name` can be used as a single key segment
///
/// Rejects empty names, `.`/`..`, and anything containing a path separator,
/// any of which would let two identities share a key.
pub fn validate_name(name: &str) -> Result<()> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0');

    if bad {
        Err(RomVaultError::InvalidName(name.to_string()))
    } else {
        Ok(())
    }
}

fn parse_decimal<T: std::str::FromStr>(segment: &str) -> Option<T> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}
