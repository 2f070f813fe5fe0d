//! Google Drive backup slot adapter.
//!
//! Uses the Drive v3 API against the hidden `appDataFolder` space, so the
//! backup never appears in the user's visible Drive. The slot is found by
//! its well-known name; upload creates it on first use and media-updates
//! it afterwards.

use crate::error::{CloudError, CloudResult};
use crate::provider::{StorageProvider, BACKUP_FILE_NAME};
use async_trait::async_trait;
use quill_types::Provider;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
const DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
}

#[derive(Debug, Deserialize)]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

/// Drive v3 adapter for the application-scoped backup slot.
pub struct GoogleDriveStorage {
    http: reqwest::Client,
    api_base: String,
    upload_base: String,
}

impl GoogleDriveStorage {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("failed to build HTTP client");
        Self {
            http,
            api_base: DRIVE_API_BASE.to_string(),
            upload_base: DRIVE_UPLOAD_BASE.to_string(),
        }
    }

    /// Overrides the API endpoints (mock servers in tests).
    pub fn with_endpoints(mut self, api_base: &str, upload_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self.upload_base = upload_base.trim_end_matches('/').to_string();
        self
    }

    /// Looks up the backup slot's file id in the appDataFolder.
    async fn find_backup(&self, access_token: &str) -> CloudResult<Option<String>> {
        let url = format!("{}/files", self.api_base);
        let query = format!("name = '{BACKUP_FILE_NAME}' and trashed = false");
        let resp = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&[
                ("spaces", "appDataFolder"),
                ("q", query.as_str()),
                ("fields", "files(id)"),
                ("pageSize", "1"),
            ])
            .send()
            .await?;
        let resp = check_status(resp).await?;

        let list: DriveFileList = resp.json().await?;
        Ok(list.files.into_iter().next().map(|f| f.id))
    }

    /// First upload: multipart create with appDataFolder parentage.
    async fn create_backup(&self, access_token: &str, bytes: &[u8]) -> CloudResult<String> {
        let metadata = serde_json::json!({
            "name": BACKUP_FILE_NAME,
            "parents": ["appDataFolder"],
        });

        let boundary = "quill_bundle_boundary";
        let mut body = Vec::with_capacity(bytes.len() + 512);
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
        body.extend_from_slice(metadata.to_string().as_bytes());
        body.extend_from_slice(format!("\r\n--{boundary}\r\n").as_bytes());
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{boundary}--").as_bytes());

        let url = format!("{}/files?uploadType=multipart", self.upload_base);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={boundary}"),
            )
            .body(body)
            .send()
            .await?;
        let resp = check_status(resp).await?;

        let file: DriveFile = resp.json().await?;
        Ok(file.id)
    }

    /// Subsequent uploads: overwrite the existing file's content.
    async fn update_backup(
        &self,
        access_token: &str,
        file_id: &str,
        bytes: &[u8],
    ) -> CloudResult<String> {
        let url = format!("{}/files/{file_id}?uploadType=media", self.upload_base);
        let resp = self
            .http
            .patch(&url)
            .bearer_auth(access_token)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes.to_vec())
            .send()
            .await?;
        let resp = check_status(resp).await?;

        let file: DriveFile = resp.json().await?;
        Ok(file.id)
    }
}

impl Default for GoogleDriveStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageProvider for GoogleDriveStorage {
    fn provider(&self) -> Provider {
        Provider::GoogleDrive
    }

    async fn upload(&self, access_token: &str, bytes: &[u8]) -> CloudResult<String> {
        let file_id = match self.find_backup(access_token).await? {
            Some(id) => self.update_backup(access_token, &id, bytes).await?,
            None => self.create_backup(access_token, bytes).await?,
        };
        debug!("uploaded {} bytes to Drive file {file_id}", bytes.len());
        Ok(file_id)
    }

    async fn download(&self, access_token: &str) -> CloudResult<Option<Vec<u8>>> {
        let Some(file_id) = self.find_backup(access_token).await? else {
            debug!("Drive backup slot is empty");
            return Ok(None);
        };

        let url = format!("{}/files/{file_id}?alt=media", self.api_base);
        let resp = self.http.get(&url).bearer_auth(access_token).send().await?;
        let resp = check_status(resp).await?;

        let bytes = resp.bytes().await?;
        debug!("downloaded {} bytes from Drive file {file_id}", bytes.len());
        Ok(Some(bytes.to_vec()))
    }
}

/// Maps 401 to the token-rejection marker and other failures to an HTTP
/// error carrying a trimmed body excerpt.
pub(crate) async fn check_status(resp: reqwest::Response) -> CloudResult<reqwest::Response> {
    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(CloudError::Unauthorized);
    }
    if !status.is_success() {
        let detail = resp.text().await.unwrap_or_default();
        return Err(CloudError::Http {
            status: status.as_u16(),
            detail: detail.chars().take(200).collect(),
        });
    }
    Ok(resp)
}
