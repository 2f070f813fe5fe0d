//! Storage provider capability interface and its auth-aware wrapper.
//!
//! Each adapter addresses exactly one application-scoped backup slot per
//! account — this is not a file browser. Adapters report a rejected token
//! as [`CloudError::Unauthorized`] and never retry internally; retry
//! policy stays with the sync orchestrator so it is centralized and
//! observable.

use crate::error::{CloudError, CloudResult};
use crate::oauth::OAuthFlow;
use async_trait::async_trait;
use quill_types::Provider;
use std::sync::Arc;
use tracing::debug;

/// Well-known name of the single backup slot in each account.
pub const BACKUP_FILE_NAME: &str = "quill_backup.qbak";

/// Upload/download of the opaque backup blob for one remote account.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    fn provider(&self) -> Provider;

    /// Overwrites the backup slot, returning the remote file id.
    async fn upload(&self, access_token: &str, bytes: &[u8]) -> CloudResult<String>;

    /// Reads the backup slot; `None` when no backup has been uploaded yet.
    async fn download(&self, access_token: &str) -> CloudResult<Option<Vec<u8>>>;
}

/// One connected account: an auth flow composed with a storage adapter.
///
/// Invokes the refresh sub-flow exactly once per call when the provider
/// answers 401, then gives up with `AuthorizationRequired`.
pub struct ProviderClient {
    flow: Arc<OAuthFlow>,
    storage: Arc<dyn StorageProvider>,
}

impl ProviderClient {
    pub fn new(flow: Arc<OAuthFlow>, storage: Arc<dyn StorageProvider>) -> Self {
        Self { flow, storage }
    }

    pub fn provider(&self) -> Provider {
        self.flow.provider()
    }

    pub fn flow(&self) -> &Arc<OAuthFlow> {
        &self.flow
    }

    pub async fn upload(&self, bytes: &[u8]) -> CloudResult<String> {
        let token = self.flow.authorized_access_token().await?;
        match self.storage.upload(&token, bytes).await {
            Err(CloudError::Unauthorized) => {
                debug!("401 on upload to {}, refreshing token", self.provider());
                let refreshed = self.flow.refresh().await?;
                self.storage
                    .upload(&refreshed.access_token, bytes)
                    .await
                    .map_err(|e| self.terminal_on_second_401(e))
            }
            other => other,
        }
    }

    pub async fn download(&self) -> CloudResult<Option<Vec<u8>>> {
        let token = self.flow.authorized_access_token().await?;
        match self.storage.download(&token).await {
            Err(CloudError::Unauthorized) => {
                debug!("401 on download from {}, refreshing token", self.provider());
                let refreshed = self.flow.refresh().await?;
                self.storage
                    .download(&refreshed.access_token)
                    .await
                    .map_err(|e| self.terminal_on_second_401(e))
            }
            other => other,
        }
    }

    /// A 401 straight after a successful refresh means the account lost
    /// access for good — no further retries.
    fn terminal_on_second_401(&self, e: CloudError) -> CloudError {
        match e {
            CloudError::Unauthorized => CloudError::AuthorizationRequired(self.provider()),
            other => other,
        }
    }
}
