//! Sync error taxonomy.
//!
//! Lower-layer errors are folded into a small set of user-meaningful
//! kinds: a password problem, a broken bundle, an account that needs
//! reconnecting, a transient network failure, or a fatal crypto failure.

use quill_bundle::BundleError;
use quill_cloud::CloudError;
use quill_crypto::CryptoError;
use quill_types::{JournalError, Provider};
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can end a sync cycle.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Decryption failed its integrity check — wrong password or corrupted
    /// backup, deliberately not distinguished further.
    #[error("wrong password or corrupted backup")]
    PasswordRejected,

    #[error("encryption error: {0}")]
    Crypto(CryptoError),

    #[error("not a valid backup file: {0}")]
    MalformedBundle(BundleError),

    /// Actionable "reconnect account" state, not a transient failure.
    #[error("authorization required: reconnect {0}")]
    AuthorizationRequired(Provider),

    #[error("no account connected for {0}")]
    NotConnected(Provider),

    /// Transient; the cycle retries these internally with backoff before
    /// giving up.
    #[error("network failure: {0}")]
    Network(CloudError),

    #[error("cloud error: {0}")]
    Cloud(CloudError),

    #[error(transparent)]
    Journal(#[from] JournalError),

    #[error("a sync cycle is already running for {0}")]
    CycleInProgress(Provider),

    #[error("sync cycle deadline exceeded")]
    Timeout,

    /// Reserved for stricter conflict policies. The current
    /// last-writer-wins policy never raises it.
    #[error("conflict could not be resolved automatically")]
    ConflictUnresolvable,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal failure: {0}")]
    Internal(String),
}

impl From<CloudError> for SyncError {
    fn from(e: CloudError) -> Self {
        match e {
            CloudError::AuthorizationRequired(p) => SyncError::AuthorizationRequired(p),
            e if e.is_transient() => SyncError::Network(e),
            e => SyncError::Cloud(e),
        }
    }
}

impl From<CryptoError> for SyncError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::Authentication => SyncError::PasswordRejected,
            e => SyncError::Crypto(e),
        }
    }
}

impl From<BundleError> for SyncError {
    fn from(e: BundleError) -> Self {
        match e {
            BundleError::Crypto(inner) => SyncError::from(inner),
            e => SyncError::MalformedBundle(e),
        }
    }
}
