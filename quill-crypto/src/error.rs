//! Crypto error types.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur during key derivation and cipher operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    /// A wrong password and corrupted or tampered data are
    /// indistinguishable by design; both surface as this one variant with
    /// one fixed message.
    #[error("authentication failed: wrong password or corrupted data")]
    Authentication,

    #[error("ciphertext too short: {len} bytes, need at least {min}")]
    TruncatedCiphertext { len: usize, min: usize },

    #[error("invalid salt length: expected {expected}, got {actual}")]
    InvalidSaltLength { expected: usize, actual: usize },
}
