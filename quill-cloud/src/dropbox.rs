//! Dropbox backup slot adapter.
//!
//! Talks to the content API with app-folder scoping — the access token
//! only sees the app's own folder, where the backup lives under its
//! well-known name. Upload always overwrites; download distinguishes an
//! empty slot (409 path/not_found) from real failures.

use crate::error::{CloudError, CloudResult};
use crate::google_drive::check_status;
use crate::provider::{StorageProvider, BACKUP_FILE_NAME};
use async_trait::async_trait;
use quill_types::Provider;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const CONTENT_API_BASE: &str = "https://content.dropboxapi.com";

#[derive(Debug, Deserialize)]
struct DropboxFileMetadata {
    id: String,
}

/// Dropbox content API adapter for the app-folder backup slot.
pub struct DropboxStorage {
    http: reqwest::Client,
    content_base: String,
}

impl DropboxStorage {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("failed to build HTTP client");
        Self {
            http,
            content_base: CONTENT_API_BASE.to_string(),
        }
    }

    /// Overrides the content endpoint (mock servers in tests).
    pub fn with_endpoint(mut self, content_base: &str) -> Self {
        self.content_base = content_base.trim_end_matches('/').to_string();
        self
    }

    fn slot_path() -> String {
        format!("/{BACKUP_FILE_NAME}")
    }
}

impl Default for DropboxStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageProvider for DropboxStorage {
    fn provider(&self) -> Provider {
        Provider::Dropbox
    }

    async fn upload(&self, access_token: &str, bytes: &[u8]) -> CloudResult<String> {
        let arg = serde_json::json!({
            "path": Self::slot_path(),
            "mode": "overwrite",
            "mute": true,
        });

        let url = format!("{}/2/files/upload", self.content_base);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .header("Dropbox-API-Arg", arg.to_string())
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes.to_vec())
            .send()
            .await?;
        let resp = check_status(resp).await?;

        let metadata: DropboxFileMetadata = resp.json().await?;
        debug!("uploaded {} bytes to Dropbox {}", bytes.len(), Self::slot_path());
        Ok(metadata.id)
    }

    async fn download(&self, access_token: &str) -> CloudResult<Option<Vec<u8>>> {
        let arg = serde_json::json!({ "path": Self::slot_path() });

        let url = format!("{}/2/files/download", self.content_base);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .header("Dropbox-API-Arg", arg.to_string())
            .send()
            .await?;

        // 409 with a path lookup failure means the slot has never been
        // written — an empty remote, not an error.
        if resp.status() == reqwest::StatusCode::CONFLICT {
            let body = resp.text().await.unwrap_or_default();
            if body.contains("not_found") {
                debug!("Dropbox backup slot is empty");
                return Ok(None);
            }
            return Err(CloudError::Http {
                status: 409,
                detail: body.chars().take(200).collect(),
            });
        }
        let resp = check_status(resp).await?;

        let bytes = resp.bytes().await?;
        debug!("downloaded {} bytes from Dropbox {}", bytes.len(), Self::slot_path());
        Ok(Some(bytes.to_vec()))
    }
}
