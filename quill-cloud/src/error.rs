//! Cloud error types.

use quill_types::Provider;
use thiserror::Error;

/// Result type for cloud operations.
pub type CloudResult<T> = Result<T, CloudError>;

/// Errors that can occur in the cloud layer.
#[derive(Debug, Error)]
pub enum CloudError {
    /// Tokens are missing, expired without a refresh token, or refresh was
    /// rejected. Actionable "reconnect account" state, not a transient
    /// error.
    #[error("authorization required: reconnect {0}")]
    AuthorizationRequired(Provider),

    #[error("authorization failed: {0}")]
    AuthorizationFailed(String),

    /// The provider rejected the access token (401). Internal marker — the
    /// provider client refreshes once and retries before converting this
    /// into `AuthorizationRequired`.
    #[error("access token rejected by provider")]
    Unauthorized,

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("provider returned HTTP {status}: {detail}")]
    Http { status: u16, detail: String },

    #[error("provider error: {0}")]
    Provider(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("key-value store error: {0}")]
    Store(String),

    #[error("invalid authorization state: {0}")]
    InvalidState(String),
}

impl CloudError {
    /// True for failures the caller may retry with backoff.
    pub fn is_transient(&self) -> bool {
        match self {
            CloudError::Network(_) => true,
            CloudError::Http { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
