//! Unencrypted bundle metadata.

use crate::error::{BundleError, BundleResult};
use base64::{engine::general_purpose::STANDARD, Engine};
use quill_crypto::Salt;
use quill_types::RecordCounts;
use serde::{Deserialize, Serialize};

/// Bundle format version written by this client.
pub const FORMAT_VERSION: u32 = 1;

/// Algorithm identifier recorded in metadata. The nonce length used when
/// slicing the ciphertext prefix is fixed by this identifier.
pub const ENCRYPTION_ALGORITHM: &str = "ChaCha20-Poly1305";

/// Metadata stored unencrypted ahead of the ciphertext.
///
/// camelCase on the wire — the same JSON is read by the mobile clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleMetadata {
    pub version: u32,
    /// Creation time, ms since the Unix epoch. The sync high-water mark.
    pub created_at: i64,
    pub app_version: String,
    pub entry_count: u32,
    pub folder_count: u32,
    pub tag_count: u32,
    /// Base64-encoded 16-byte KDF salt, unique per bundle.
    pub salt: String,
    pub encryption_algorithm: String,
}

impl BundleMetadata {
    pub fn new(counts: RecordCounts, salt: &Salt, app_version: &str, created_at: i64) -> Self {
        Self {
            version: FORMAT_VERSION,
            created_at,
            app_version: app_version.to_string(),
            entry_count: counts.entries,
            folder_count: counts.folders,
            tag_count: counts.tags,
            salt: STANDARD.encode(salt.as_bytes()),
            encryption_algorithm: ENCRYPTION_ALGORITHM.to_string(),
        }
    }

    pub fn counts(&self) -> RecordCounts {
        RecordCounts {
            entries: self.entry_count,
            folders: self.folder_count,
            tags: self.tag_count,
        }
    }

    /// Decodes the embedded KDF salt.
    pub fn salt(&self) -> BundleResult<Salt> {
        let bytes = STANDARD
            .decode(&self.salt)
            .map_err(|e| BundleError::MalformedMetadata(format!("salt is not valid base64: {e}")))?;
        Ok(Salt::from_slice(&bytes)?)
    }
}
