//! Shared fixtures for cloud-layer tests.

#![allow(dead_code)]

use quill_cloud::{
    CloudTokenInfo, ConsentLauncher, MemoryKeyValueStore, OAuthConfig, OAuthFlow, TokenStore,
};
use quill_types::{now_millis, Provider};
use std::sync::{Arc, Mutex};

/// Records every consent URL instead of opening a browser.
#[derive(Default)]
pub struct RecordingLauncher {
    pub urls: Mutex<Vec<String>>,
}

impl RecordingLauncher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn opened(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

impl ConsentLauncher for RecordingLauncher {
    fn open_auth_url(&self, url: &str) {
        self.urls.lock().unwrap().push(url.to_string());
    }
}

/// OAuth config with endpoints pointed at a mock server.
pub fn mock_config(provider: Provider, base: &str) -> OAuthConfig {
    OAuthConfig {
        provider,
        client_id: "client-id".to_string(),
        client_secret: Some("client-secret".to_string()),
        auth_url: format!("{base}/auth"),
        token_url: format!("{base}/token"),
        scopes: vec!["scope.a".to_string()],
        redirect_uri: "com.quillapp.journal:/oauth2redirect".to_string(),
        extra_auth_params: vec![("access_type".to_string(), "offline".to_string())],
    }
}

pub fn new_token_store() -> Arc<TokenStore> {
    Arc::new(TokenStore::new(Arc::new(MemoryKeyValueStore::new())))
}

pub fn flow_against(
    base: &str,
    provider: Provider,
    token_store: Arc<TokenStore>,
) -> (Arc<OAuthFlow>, Arc<RecordingLauncher>) {
    let launcher = RecordingLauncher::new();
    let flow = Arc::new(OAuthFlow::new(
        mock_config(provider, base),
        token_store,
        launcher.clone(),
    ));
    (flow, launcher)
}

/// Token endpoint success body.
pub fn token_json(access: &str, refresh: Option<&str>) -> serde_json::Value {
    match refresh {
        Some(rt) => serde_json::json!({
            "access_token": access,
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": rt,
        }),
        None => serde_json::json!({
            "access_token": access,
            "token_type": "bearer",
            "expires_in": 3600,
        }),
    }
}

/// Stored tokens expiring `expires_in_ms` from now.
pub fn stored_tokens(access: &str, refresh: Option<&str>, expires_in_ms: i64) -> CloudTokenInfo {
    CloudTokenInfo {
        access_token: access.to_string(),
        refresh_token: refresh.map(|s| s.to_string()),
        expires_at: now_millis() + expires_in_ms,
    }
}
