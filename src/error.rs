//! Error types for romvault
//!
//! Provides a unified error type for all operations.

use std::fmt;
use std::io;

use thiserror::Error;

/// Result type alias using RomVaultError
pub type Result<T> = std::result::Result<T, RomVaultError>;

/// Store-level transfer that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOp {
    Upload,
    Download,
    Extract,
}

impl fmt::Display for TransferOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            TransferOp::Upload => "upload",
            TransferOp::Download => "download",
            TransferOp::Extract => "extract",
        };
        f.write_str(op)
    }
}

/// Coarse classification used by callers deciding whether to abort or skip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Moving bytes to or from the store or scratch space failed
    Transfer,
    /// Malformed container, or stored content not where the key says it is
    Format,
    /// The store could not answer an existence query
    Query,
    /// Bad input from the caller (names, paths, fingerprints, config)
    Usage,
}

/// Unified error type for romvault operations
#[derive(Debug, Error)]
pub enum RomVaultError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("{op} failed for {path}: {source}")]
    Transfer {
        op: TransferOp,
        path: String,
        #[source]
        source: io::Error,
    },

    // -------------------------------------------------------------------------
    // Store Query Errors
    // -------------------------------------------------------------------------
    #[error("store query failed for prefix {prefix}: {source}")]
    Query {
        prefix: String,
        #[source]
        source: io::Error,
    },

    // -------------------------------------------------------------------------
    // Format Errors
    // -------------------------------------------------------------------------
    #[error("Malformed archive: {0}")]
    Format(String),

    #[error("entry {name} missing from stored blob {key}")]
    MissingEntry { key: String, name: String },

    // -------------------------------------------------------------------------
    // Input Errors
    // -------------------------------------------------------------------------
    #[error("Invalid entry name: {0:?}")]
    InvalidName(String),

    #[error("Invalid store path: {0:?}")]
    InvalidPath(String),

    #[error("Invalid fingerprint: {0}")]
    InvalidFingerprint(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Pipeline Errors
    // -------------------------------------------------------------------------
    #[error("entry {name}: {source}")]
    Entry {
        name: String,
        #[source]
        source: Box<RomVaultError>,
    },

    #[error("Worker failed: {0}")]
    Worker(String),
}

impl RomVaultError {
    /// Attach the entry name to an error raised while processing that entry
    pub fn for_entry(name: impl Into<String>, source: RomVaultError) -> Self {
        RomVaultError::Entry {
            name: name.into(),
            source: Box::new(source),
        }
    }

    /// Classify the error (looks through `Entry` wrappers)
    pub fn category(&self) -> ErrorCategory {
        match self {
            RomVaultError::Io(_) | RomVaultError::Transfer { .. } | RomVaultError::Worker(_) => {
                ErrorCategory::Transfer
            }
            RomVaultError::Query { .. } => ErrorCategory::Query,
            RomVaultError::Format(_) | RomVaultError::MissingEntry { .. } => ErrorCategory::Format,
            RomVaultError::InvalidName(_)
            | RomVaultError::InvalidPath(_)
            | RomVaultError::InvalidFingerprint(_)
            | RomVaultError::Config(_) => ErrorCategory::Usage,
            RomVaultError::Entry { source, .. } => source.category(),
        }
    }
}

impl From<zip::result::ZipError> for RomVaultError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => RomVaultError::Io(e),
            other => RomVaultError::Format(other.to_string()),
        }
    }
}
