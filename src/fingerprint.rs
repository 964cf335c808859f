//! Fingerprint Module
//!
//! Content identity of a ROM file: byte count, CRC-32 and SHA-1.
//!
//! ## Responsibilities
//! - Stream a reader exactly once in fixed-size chunks
//! - Rolling CRC-32 seeded from the previous chunk's result (seed 0)
//! - Incremental SHA-1, finalized to lowercase hex
//! - Never report a fingerprint for a stream that failed part way

use std::fmt;
use std::io::{self, Read, Write};

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use crate::error::{Result, RomVaultError};

/// Default read size while fingerprinting
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Length of a hex-encoded SHA-1 digest
pub const SHA1_HEX_LEN: usize = 40;

/// Immutable (size, crc32, sha1) triple identifying a file's content
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawFingerprint")]
pub struct Fingerprint {
    size: u64,
    crc32: u32,
    sha1: String,
}

/// One of the three fingerprint fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FingerprintField {
    Size,
    Crc32,
    Sha1,
}

impl Fingerprint {
    /// Validate and build a fingerprint from externally supplied parts
    ///
    /// `sha1` must be 40 hex characters; it is stored lowercase.
    pub fn from_parts(size: u64, crc32: u32, sha1: &str) -> Result<Self> {
        if sha1.len() != SHA1_HEX_LEN || !sha1.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(RomVaultError::InvalidFingerprint(format!(
                "sha1 must be {} hex characters, got {:?}",
                SHA1_HEX_LEN, sha1
            )));
        }

        Ok(Self {
            size,
            crc32,
            sha1: sha1.to_ascii_lowercase(),
        })
    }

    /// Byte count
    pub fn size(&self) -> u64 {
        self.size
    }

    /// CRC-32 (IEEE)
    pub fn crc32(&self) -> u32 {
        self.crc32
    }

    /// SHA-1 as lowercase hex
    pub fn sha1(&self) -> &str {
        &self.sha1
    }

    /// Fields that differ between `self` and `other`, in (size, crc32, sha1) order
    pub fn diff(&self, other: &Fingerprint) -> Vec<FingerprintField> {
        let mut fields = Vec::new();
        if self.size != other.size {
            fields.push(FingerprintField::Size);
        }
        if self.crc32 != other.crc32 {
            fields.push(FingerprintField::Crc32);
        }
        if self.sha1 != other.sha1 {
            fields.push(FingerprintField::Sha1);
        }
        fields
    }
}

/// Unchecked wire form; deserialization goes through `from_parts`
#[derive(Deserialize)]
struct RawFingerprint {
    size: u64,
    crc32: u32,
    sha1: String,
}

impl TryFrom<RawFingerprint> for Fingerprint {
    type Error = RomVaultError;

    fn try_from(raw: RawFingerprint) -> Result<Self> {
        Fingerprint::from_parts(raw.size, raw.crc32, &raw.sha1)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "size={} crc32={} sha1={}", self.size, self.crc32, self.sha1)
    }
}

impl fmt::Display for FingerprintField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FingerprintField::Size => "size",
            FingerprintField::Crc32 => "crc32",
            FingerprintField::Sha1 => "sha1",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Incremental hasher
// =============================================================================

/// Running fingerprint state
///
/// Also an `io::Write` sink, so content can be fingerprinted while it is
/// copied somewhere else (e.g. `io::copy(&mut entry, &mut hasher)`).
#[derive(Clone)]
pub struct FingerprintHasher {
    size: u64,
    crc: u32,
    sha1: Sha1,
}

impl FingerprintHasher {
    pub fn new() -> Self {
        Self {
            size: 0,
            crc: 0,
            sha1: Sha1::new(),
        }
    }

    /// Fold one chunk into the running state
    pub fn update(&mut self, chunk: &[u8]) {
        self.size += chunk.len() as u64;

        // CRC continues from the previous chunk's result
        let mut crc = crc32fast::Hasher::new_with_initial(self.crc);
        crc.update(chunk);
        self.crc = crc.finalize();

        self.sha1.update(chunk);
    }

    /// Bytes seen so far
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn finalize(self) -> Fingerprint {
        Fingerprint {
            size: self.size,
            crc32: self.crc,
            sha1: hex::encode(self.sha1.finalize()),
        }
    }
}

impl Default for FingerprintHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for FingerprintHasher {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// =============================================================================
// Fingerprinter
// =============================================================================

/// Streams readers into fingerprints using a fixed chunk size
#[derive(Debug, Clone, Copy)]
pub struct Fingerprinter {
    chunk_size: usize,
}

impl Fingerprinter {
    /// Create a fingerprinter reading `chunk_size` bytes at a time (minimum 1)
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Consume `reader` to EOF and return its fingerprint
    ///
    /// A read error aborts the whole computation.
    pub fn fingerprint<R: Read + ?Sized>(&self, reader: &mut R) -> Result<Fingerprint> {
        let mut hasher = FingerprintHasher::new();
        let mut buffer = vec![0u8; self.chunk_size];

        loop {
            let bytes_read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(RomVaultError::Io(e)),
            };
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(hasher.finalize())
    }
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}
