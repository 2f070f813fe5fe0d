//! Durable per-provider OAuth token lifecycle.
//!
//! Tokens live in the injected key-value store, one JSON value per
//! provider. Expiry is always computed from `expires_at` against the clock
//! — never cached. The set of connected providers is derived from which
//! providers currently hold a non-empty access token and published through
//! a watch channel so the UI reflects connect/disconnect without polling.

use crate::error::{CloudError, CloudResult};
use crate::kv::KeyValueStore;
use base64::{engine::general_purpose::STANDARD, Engine};
use quill_crypto::{derive_key, Salt};
use quill_types::{now_millis, Provider};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

const SYNC_PASSWORD_KEY: &str = "cloud.sync_password";

fn tokens_key(provider: Provider) -> String {
    format!("cloud.tokens.{}", provider.key())
}

/// OAuth tokens for one provider account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudTokenInfo {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Access token expiry, ms since the Unix epoch.
    pub expires_at: i64,
}

impl CloudTokenInfo {
    /// Pure function of `expires_at` against the given clock reading.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.expires_at < now_ms
    }
}

/// Stored sync-password verifier: PBKDF2 salt + hash, never the password.
#[derive(Serialize, Deserialize)]
struct PasswordVerifier {
    salt: String,
    hash: String,
}

/// Per-provider CRUD over [`CloudTokenInfo`], plus sync-password
/// verification.
pub struct TokenStore {
    kv: Arc<dyn KeyValueStore>,
    connected_tx: watch::Sender<BTreeSet<Provider>>,
}

impl TokenStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        let initial = Self::derive_connected(kv.as_ref());
        let (connected_tx, _) = watch::channel(initial);
        Self { kv, connected_tx }
    }

    // ── Tokens ──

    /// Persists tokens for a provider, replacing any previous value.
    pub fn save_tokens(&self, provider: Provider, tokens: &CloudTokenInfo) -> CloudResult<()> {
        let json = serde_json::to_string(tokens)?;
        self.kv.put(&tokens_key(provider), &json)?;
        debug!("stored tokens for {provider}, expires at {}", tokens.expires_at);
        self.publish_connected();
        Ok(())
    }

    /// Returns the last stored tokens for a provider, if any.
    pub fn get_token_info(&self, provider: Provider) -> CloudResult<Option<CloudTokenInfo>> {
        match self.kv.get(&tokens_key(provider))? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// True when no usable access token exists right now. Missing tokens
    /// count as expired.
    pub fn is_token_expired(&self, provider: Provider) -> CloudResult<bool> {
        Ok(match self.get_token_info(provider)? {
            Some(tokens) => tokens.is_expired(now_millis()),
            None => true,
        })
    }

    /// Removes all stored keys for a provider. Used on explicit disconnect
    /// and on irrecoverable refresh failure.
    pub fn clear_tokens(&self, provider: Provider) -> CloudResult<()> {
        self.kv.remove(&tokens_key(provider))?;
        debug!("cleared tokens for {provider}");
        self.publish_connected();
        Ok(())
    }

    // ── Connected providers ──

    /// Providers that currently hold a non-empty access token.
    pub fn connected_providers(&self) -> BTreeSet<Provider> {
        Self::derive_connected(self.kv.as_ref())
    }

    /// Observable view of the connected set; updated on every token write.
    pub fn watch_connected(&self) -> watch::Receiver<BTreeSet<Provider>> {
        self.connected_tx.subscribe()
    }

    fn derive_connected(kv: &dyn KeyValueStore) -> BTreeSet<Provider> {
        Provider::ALL
            .iter()
            .copied()
            .filter(|p| {
                kv.get(&tokens_key(*p))
                    .ok()
                    .flatten()
                    .and_then(|json| serde_json::from_str::<CloudTokenInfo>(&json).ok())
                    .is_some_and(|t| !t.access_token.is_empty())
            })
            .collect()
    }

    fn publish_connected(&self) {
        let connected = self.connected_providers();
        self.connected_tx.send_replace(connected);
    }

    // ── Sync password ──

    /// Stores a one-way verifier for the sync password. The password
    /// itself is never persisted.
    pub fn set_sync_password(&self, password: &str) -> CloudResult<()> {
        let salt = Salt::random();
        let key = derive_key(password, &salt)
            .map_err(|e| CloudError::Store(format!("password hashing failed: {e}")))?;
        let verifier = PasswordVerifier {
            salt: STANDARD.encode(salt.as_bytes()),
            hash: STANDARD.encode(key.as_bytes()),
        };
        self.kv.put(&SYNC_PASSWORD_KEY, &serde_json::to_string(&verifier)?)
    }

    /// True when a sync-password verifier has been stored.
    pub fn has_sync_password(&self) -> CloudResult<bool> {
        Ok(self.kv.get(SYNC_PASSWORD_KEY)?.is_some())
    }

    /// Checks a password against the stored verifier in constant time.
    /// Returns `false` when no verifier is stored. The hash is never
    /// logged or returned.
    pub fn verify_sync_password(&self, password: &str) -> CloudResult<bool> {
        let Some(json) = self.kv.get(SYNC_PASSWORD_KEY)? else {
            return Ok(false);
        };
        let verifier: PasswordVerifier = serde_json::from_str(&json)?;
        let salt_bytes = STANDARD
            .decode(&verifier.salt)
            .map_err(|e| CloudError::Store(format!("corrupt password verifier: {e}")))?;
        let stored_hash = STANDARD
            .decode(&verifier.hash)
            .map_err(|e| CloudError::Store(format!("corrupt password verifier: {e}")))?;
        let salt = Salt::from_slice(&salt_bytes)
            .map_err(|e| CloudError::Store(format!("corrupt password verifier: {e}")))?;
        let key = derive_key(password, &salt)
            .map_err(|e| CloudError::Store(format!("password hashing failed: {e}")))?;
        Ok(constant_time_eq(key.as_bytes(), &stored_hash))
    }

    /// Removes the stored password verifier.
    pub fn clear_sync_password(&self) -> CloudResult<()> {
        self.kv.remove(SYNC_PASSWORD_KEY)
    }
}

/// Fixed-time byte comparison — no early exit on the first mismatch.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
