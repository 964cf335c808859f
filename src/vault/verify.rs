//! Verifier
//!
//! Re-reads a stored blob and checks its content against an expected
//! fingerprint. Read-only and on demand; ingestion never calls it.

use std::io::{self, Seek};

use serde::Serialize;
use tracing::{info, warn};

use crate::container;
use crate::error::Result;
use crate::fingerprint::{Fingerprint, FingerprintField};

use super::RomVault;

/// Result of verifying one identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum VerifyOutcome {
    /// Nothing stored for this name and fingerprint
    Absent,

    /// Stored content fingerprints exactly as expected
    Matched { key: String },

    /// Stored content differs from the fingerprint its key claims
    Mismatched {
        key: String,
        expected: Fingerprint,
        actual: Fingerprint,
        fields: Vec<FingerprintField>,
    },
}

impl VerifyOutcome {
    pub fn is_matched(&self) -> bool {
        matches!(self, VerifyOutcome::Matched { .. })
    }
}

impl RomVault {
    /// Verify the blob stored for (name, expected)
    ///
    /// A malformed container, or one without an entry called `name`, is an
    /// error rather than a mismatch: the blob is not what its key says.
    pub fn verify(&self, name: &str, expected: &Fingerprint) -> Result<VerifyOutcome> {
        // Step 1: Find the most specific match
        let key = match self.locate(name, expected)? {
            Some(key) => key,
            None => {
                info!(name, "not in store");
                return Ok(VerifyOutcome::Absent);
            }
        };

        // Step 2: Download to scratch (zip needs a seekable source)
        let mut download = tempfile::tempfile_in(self.scratch_dir())?;
        {
            let mut blob = self.object_store().download(&key)?;
            io::copy(&mut blob, &mut download)?;
        }
        download.rewind()?;

        // Step 3: Fingerprint the named entry
        let actual = container::with_entry(io::BufReader::new(download), &key, name, |entry| {
            self.fingerprint(entry)
        })?;

        // Step 4: Compare
        let fields = expected.diff(&actual);
        if fields.is_empty() {
            info!(name, key = %key, "verified");
            return Ok(VerifyOutcome::Matched { key });
        }

        warn!(
            name,
            key = %key,
            expected = %expected,
            actual = %actual,
            differing = ?fields,
            "stored content does not match"
        );
        Ok(VerifyOutcome::Mismatched {
            key,
            expected: expected.clone(),
            actual,
            fields,
        })
    }
}
