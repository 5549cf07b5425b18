//! Function packaging.
//!
//! A deployable archive holds exactly two entries: the caller's code as
//! [`USER_ENTRY`] and the runtime wrapper as [`WRAPPER_ENTRY`]. The wrapper is
//! what the platform loads through the configured handler; it builds an
//! authenticated client from the invocation context, decodes structured input
//! and hands both to the user's handler, logging and rethrowing any failure.
//!
//! Archives are built in memory on every deployment. Entry timestamps are
//! fixed, so identical code always produces identical bytes.

use std::io::{Cursor, Read, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

use crate::error::{DeployError, DeployResult};

/// Archive entry holding the caller's code.
pub const USER_ENTRY: &str = "user.js";

/// Archive entry holding the runtime wrapper. Must match the handler module.
pub const WRAPPER_ENTRY: &str = "index.js";

/// Runtime wrapper source stored under [`WRAPPER_ENTRY`].
pub const WRAPPER_ASSET: &str = include_str!("../assets/index.js");

/// An in-memory deployable archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archive {
    bytes: Vec<u8>,
}

impl Archive {
    /// Archive bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume the archive, returning its bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Archive size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if the archive has no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Digest in the form the platform reports as `CodeSha256`.
    #[must_use]
    pub fn sha256(&self) -> String {
        code_sha256(&self.bytes)
    }

    /// Read back every entry as `(name, contents)` in archive order.
    pub fn entries(&self) -> DeployResult<Vec<(String, Vec<u8>)>> {
        let mut archive = ZipArchive::new(Cursor::new(self.bytes.as_slice()))?;
        let mut entries = Vec::with_capacity(archive.len());

        for index in 0..archive.len() {
            let mut file = archive.by_index(index)?;
            let mut contents = Vec::new();
            file.read_to_end(&mut contents)
                .map_err(|e| DeployError::packaging(e.to_string()))?;
            entries.push((file.name().to_owned(), contents));
        }

        Ok(entries)
    }
}

/// Package user code together with the runtime wrapper.
pub fn package(code: &str) -> DeployResult<Archive> {
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(0o644);

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    writer.start_file(USER_ENTRY, options)?;
    writer
        .write_all(code.as_bytes())
        .map_err(|e| DeployError::packaging(e.to_string()))?;

    writer.start_file(WRAPPER_ENTRY, options)?;
    writer
        .write_all(WRAPPER_ASSET.as_bytes())
        .map_err(|e| DeployError::packaging(e.to_string()))?;

    let bytes = writer.finish()?.into_inner();

    debug!(
        code_bytes = code.len(),
        archive_bytes = bytes.len(),
        "packaged function archive"
    );

    Ok(Archive { bytes })
}

/// Base64 SHA-256 of an archive, matching the platform's `CodeSha256`.
#[must_use]
pub fn code_sha256(bytes: &[u8]) -> String {
    STANDARD.encode(Sha256::digest(bytes))
}
