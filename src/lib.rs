//! # romvault
//!
//! A content-addressed, deduplicating store for ROM files:
//! - Fingerprints every file by size, CRC-32 and SHA-1
//! - Stores each distinct (name, fingerprint) exactly once
//! - Checks existence without transferring content
//! - Verifies stored content against an expected fingerprint on demand
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Incoming Archive (zip)                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ extract / stream entries
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                   Ingestion Pipeline                         │
//! │         (sequential, or a scoped worker pool)                │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ per entry
//!          ┌────────────┼─────────────────┐
//!          ▼            ▼                 ▼
//!   ┌─────────────┐ ┌──────────┐  ┌──────────────┐
//!   │ Fingerprint │→│   Key    │→ │ exists? list │── present → skip
//!   └─────────────┘ └──────────┘  └──────┬───────┘
//!                                        │ absent
//!                                        ▼
//!                                 ┌──────────────┐
//!                                 │ Store Writer │ zip + put
//!                                 └──────┬───────┘
//!                                        ▼
//!                                 ┌──────────────┐
//!                                 │ Object Store │ ← Verifier (download,
//!                                 └──────────────┘   re-fingerprint)
//! ```
//!
//! ## Storage Layout
//!
//! ```text
//! roms/<name>/<size>/<crc32>/<sha1>/<name>.zip
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod fingerprint;
pub mod key;
pub mod store;
pub mod container;
pub mod archive;
pub mod vault;
pub mod ingest;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{ErrorCategory, Result, RomVaultError};
pub use config::{Config, FailurePolicy, IngestMode};
pub use fingerprint::{Fingerprint, FingerprintField, Fingerprinter};
pub use key::{derive_key, StorageKey};
pub use vault::{RomVault, VerifyOutcome};
pub use ingest::{EntryOutcome, IngestReport, Ingestor};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of romvault
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
