//! Sync settings bookkeeping.
//!
//! Settings have two writers — the configuration UI (toggles) and the
//! sync engine (timestamps). All mutation goes through `update`, which
//! holds a store-level lock across the read-modify-write.

use crate::error::CloudResult;
use crate::kv::KeyValueStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

const SETTINGS_KEY: &str = "cloud.sync_settings";

/// How often automatic sync runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoSyncInterval {
    Hourly,
    Every6Hours,
    Daily,
    Weekly,
}

impl AutoSyncInterval {
    pub fn as_duration(&self) -> Duration {
        match self {
            AutoSyncInterval::Hourly => Duration::from_secs(60 * 60),
            AutoSyncInterval::Every6Hours => Duration::from_secs(6 * 60 * 60),
            AutoSyncInterval::Daily => Duration::from_secs(24 * 60 * 60),
            AutoSyncInterval::Weekly => Duration::from_secs(7 * 24 * 60 * 60),
        }
    }
}

/// User-facing sync configuration plus engine bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudSyncSettings {
    pub auto_sync_enabled: bool,
    pub auto_sync_interval: AutoSyncInterval,
    pub wifi_only: bool,
    /// Timestamp of the last fully successful sync cycle (ms epoch).
    pub last_sync_time: Option<i64>,
    /// Timestamp of the last local journal mutation (ms epoch).
    pub last_local_modification_time: Option<i64>,
}

impl Default for CloudSyncSettings {
    fn default() -> Self {
        Self {
            auto_sync_enabled: false,
            auto_sync_interval: AutoSyncInterval::Daily,
            wifi_only: true,
            last_sync_time: None,
            last_local_modification_time: None,
        }
    }
}

/// Serialized access to [`CloudSyncSettings`] in the key-value store.
pub struct SettingsStore {
    kv: Arc<dyn KeyValueStore>,
    lock: std::sync::Mutex<()>,
}

impl SettingsStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            lock: std::sync::Mutex::new(()),
        }
    }

    /// Loads current settings; defaults when none are stored yet.
    pub fn load(&self) -> CloudResult<CloudSyncSettings> {
        match self.kv.get(SETTINGS_KEY)? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(CloudSyncSettings::default()),
        }
    }

    /// Applies a mutation under the store lock and persists the result.
    pub fn update<F>(&self, mutate: F) -> CloudResult<CloudSyncSettings>
    where
        F: FnOnce(&mut CloudSyncSettings),
    {
        let _guard = self.lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut settings = self.load()?;
        mutate(&mut settings);
        self.kv.put(SETTINGS_KEY, &serde_json::to_string(&settings)?)?;
        Ok(settings)
    }

    /// Records that the local journal changed at `now_ms`.
    pub fn mark_local_modified(&self, now_ms: i64) -> CloudResult<()> {
        self.update(|s| s.last_local_modification_time = Some(now_ms))?;
        Ok(())
    }

    /// Records a fully successful sync cycle at `synced_at_ms`.
    pub fn mark_synced(&self, synced_at_ms: i64) -> CloudResult<()> {
        self.update(|s| s.last_sync_time = Some(synced_at_ms))?;
        Ok(())
    }
}
