//! Bundle error types.

use thiserror::Error;

/// Result type for bundle operations.
pub type BundleResult<T> = Result<T, BundleError>;

/// Errors that can occur while encoding or decoding a backup bundle.
///
/// `Truncated`, `InvalidLength` and `MalformedMetadata` are distinct so
/// the UI can tell "this file is not a valid backup" apart from "this
/// backup is corrupted".
#[derive(Debug, Error)]
pub enum BundleError {
    #[error("truncated bundle: {len} bytes")]
    Truncated { len: usize },

    #[error("invalid metadata length {declared} in bundle of {total} bytes")]
    InvalidLength { declared: u32, total: usize },

    #[error("malformed bundle metadata: {0}")]
    MalformedMetadata(String),

    #[error("bundle metadata too large: {size} bytes")]
    MetadataTooLarge { size: usize },

    #[error("invalid bundle payload: {0}")]
    Payload(String),

    #[error(transparent)]
    Crypto(#[from] quill_crypto::CryptoError),
}
