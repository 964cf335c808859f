//! Store Writer
//!
//! Packages one ROM into a single-entry container and uploads it under its
//! derived key.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use std::time::Instant;

use tracing::{debug, info};

use crate::container;
use crate::error::Result;
use crate::fingerprint::Fingerprint;
use crate::key::{derive_key, validate_name, StorageKey};

use super::RomVault;

impl RomVault {
    /// Store `source_dir/name` under the key for (name, fingerprint)
    ///
    /// Does not check for an existing blob first; calling it twice uploads
    /// the same container twice. Callers wanting dedup check `exists` first.
    pub fn store(&self, source_dir: &Path, name: &str, fingerprint: &Fingerprint) -> Result<StorageKey> {
        validate_name(name)?;
        let mut source = BufReader::new(File::open(source_dir.join(name))?);
        self.store_from_reader(&mut source, name, fingerprint)
    }

    /// Store the content read from `source` under the key for (name, fingerprint)
    ///
    /// Steps:
    /// 1. Package `source` into a scratch zip with one entry named `name`
    /// 2. Derive the key
    /// 3. Upload the container to the key
    ///
    /// The scratch file is removed on every path out of this function.
    pub fn store_from_reader<R: Read + ?Sized>(
        &self,
        source: &mut R,
        name: &str,
        fingerprint: &Fingerprint,
    ) -> Result<StorageKey> {
        validate_name(name)?;
        let started = Instant::now();

        // Step 1: Package into a scratch container
        let mut scratch = tempfile::Builder::new()
            .prefix(&format!("{}_", name))
            .tempfile_in(self.scratch_dir())?;
        let packed = container::write_single_entry(scratch.as_file_mut(), name, fingerprint.size(), source)?;
        debug!(name, bytes = packed, "packaged container");

        // Step 2: Derive the key
        let key = derive_key(name, fingerprint);

        // Step 3: Upload from the start of the container
        let mut container_file = scratch.reopen()?;
        container_file.rewind()?;
        let uploaded = self.object_store().put(key.as_str(), &mut BufReader::new(container_file))?;

        info!(
            name,
            key = %key,
            container_bytes = uploaded,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "stored"
        );
        Ok(key)
    }
}
