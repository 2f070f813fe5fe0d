//! In-memory fakes for sync engine tests.

#![allow(dead_code)]

use async_trait::async_trait;
use quill_cloud::{
    CloudError, CloudResult, CloudTokenInfo, ConsentLauncher, MemoryKeyValueStore, OAuthConfig,
    OAuthFlow, ProviderClient, SettingsStore, StorageProvider, TokenStore,
};
use quill_sync::{AlwaysUnmetered, NetworkMonitor, SyncConfig, SyncOrchestrator};
use quill_types::{
    now_millis, ApplyResult, JournalEntry, JournalError, JournalStore, Provider, RecordKind,
    RecordSet,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Opt-in log output for debugging test runs (`RUST_LOG=debug`).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ── Journal fake ──

/// Upserting in-memory journal with optional per-record apply failures.
pub struct FakeJournal {
    records: Mutex<RecordSet>,
    fail_ids: Mutex<HashSet<String>>,
}

impl FakeJournal {
    pub fn new(initial: RecordSet) -> Arc<Self> {
        Arc::new(Self {
            records: Mutex::new(initial),
            fail_ids: Mutex::new(HashSet::new()),
        })
    }

    pub fn snapshot(&self) -> RecordSet {
        self.records.lock().unwrap().clone()
    }

    /// Makes applying the given record id fail, simulating a local store
    /// write error.
    pub fn fail_id(&self, id: &str) {
        self.fail_ids.lock().unwrap().insert(id.to_string());
    }
}

#[async_trait]
impl JournalStore for FakeJournal {
    async fn export_all(&self) -> Result<RecordSet, JournalError> {
        Ok(self.snapshot())
    }

    async fn apply_imported(&self, records: RecordSet) -> Result<Vec<ApplyResult>, JournalError> {
        let fail = self.fail_ids.lock().unwrap().clone();
        let mut store = self.records.lock().unwrap();
        let mut results = Vec::new();

        for entry in records.entries {
            if fail.contains(&entry.id) {
                results.push(ApplyResult::failed(&entry.id, RecordKind::Entry, "write failed"));
                continue;
            }
            results.push(ApplyResult::ok(&entry.id, RecordKind::Entry));
            match store.entries.iter_mut().find(|e| e.id == entry.id) {
                Some(existing) => *existing = entry,
                None => store.entries.push(entry),
            }
        }
        for folder in records.folders {
            if fail.contains(&folder.id) {
                results.push(ApplyResult::failed(&folder.id, RecordKind::Folder, "write failed"));
                continue;
            }
            results.push(ApplyResult::ok(&folder.id, RecordKind::Folder));
            match store.folders.iter_mut().find(|f| f.id == folder.id) {
                Some(existing) => *existing = folder,
                None => store.folders.push(folder),
            }
        }
        for tag in records.tags {
            if fail.contains(&tag.id) {
                results.push(ApplyResult::failed(&tag.id, RecordKind::Tag, "write failed"));
                continue;
            }
            results.push(ApplyResult::ok(&tag.id, RecordKind::Tag));
            match store.tags.iter_mut().find(|t| t.id == tag.id) {
                Some(existing) => *existing = tag,
                None => store.tags.push(tag),
            }
        }

        Ok(results)
    }
}

// ── Remote fake ──

/// One in-memory backup slot with failure injection and latency control.
pub struct InMemoryRemote {
    pub slot: Mutex<Option<Vec<u8>>>,
    pub upload_count: Mutex<u32>,
    pub download_attempts: Mutex<u32>,
    pub fail_downloads: Mutex<u32>,
    pub fail_uploads: Mutex<u32>,
    pub delay: Mutex<Duration>,
}

impl InMemoryRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            slot: Mutex::new(None),
            upload_count: Mutex::new(0),
            download_attempts: Mutex::new(0),
            fail_downloads: Mutex::new(0),
            fail_uploads: Mutex::new(0),
            delay: Mutex::new(Duration::ZERO),
        })
    }

    pub fn set_slot(&self, bytes: Vec<u8>) {
        *self.slot.lock().unwrap() = Some(bytes);
    }

    pub fn slot_bytes(&self) -> Option<Vec<u8>> {
        self.slot.lock().unwrap().clone()
    }

    pub fn uploads(&self) -> u32 {
        *self.upload_count.lock().unwrap()
    }

    pub fn download_attempts(&self) -> u32 {
        *self.download_attempts.lock().unwrap()
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    fn transient() -> CloudError {
        CloudError::Http {
            status: 503,
            detail: "service unavailable".to_string(),
        }
    }

    async fn apply_delay(&self) {
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl StorageProvider for InMemoryRemote {
    fn provider(&self) -> Provider {
        Provider::Dropbox
    }

    async fn upload(&self, _access_token: &str, bytes: &[u8]) -> CloudResult<String> {
        self.apply_delay().await;
        {
            let mut fail = self.fail_uploads.lock().unwrap();
            if *fail > 0 {
                *fail -= 1;
                return Err(Self::transient());
            }
        }
        *self.upload_count.lock().unwrap() += 1;
        *self.slot.lock().unwrap() = Some(bytes.to_vec());
        Ok("remote-1".to_string())
    }

    async fn download(&self, _access_token: &str) -> CloudResult<Option<Vec<u8>>> {
        self.apply_delay().await;
        *self.download_attempts.lock().unwrap() += 1;
        {
            let mut fail = self.fail_downloads.lock().unwrap();
            if *fail > 0 {
                *fail -= 1;
                return Err(Self::transient());
            }
        }
        Ok(self.slot_bytes())
    }
}

// ── Harness ──

struct NoopLauncher;

impl ConsentLauncher for NoopLauncher {
    fn open_auth_url(&self, _url: &str) {}
}

pub struct Harness {
    pub orch: Arc<SyncOrchestrator>,
    pub journal: Arc<FakeJournal>,
    pub remote: Arc<InMemoryRemote>,
    pub settings: Arc<SettingsStore>,
    pub token_store: Arc<TokenStore>,
}

pub fn test_config() -> SyncConfig {
    SyncConfig {
        cycle_timeout: Duration::from_secs(10),
        max_network_attempts: 3,
        retry_base_delay: Duration::from_millis(10),
        scheduler_tick: Duration::from_secs(60),
        app_version: "test".to_string(),
    }
}

pub fn harness(initial: RecordSet) -> Harness {
    harness_opts(initial, Arc::new(AlwaysUnmetered), test_config())
}

pub fn harness_opts(
    initial: RecordSet,
    network: Arc<dyn NetworkMonitor>,
    config: SyncConfig,
) -> Harness {
    let kv = Arc::new(MemoryKeyValueStore::new());
    let token_store = Arc::new(TokenStore::new(kv.clone()));
    token_store
        .save_tokens(
            Provider::Dropbox,
            &CloudTokenInfo {
                access_token: "at".to_string(),
                refresh_token: Some("rt".to_string()),
                expires_at: now_millis() + 3_600_000,
            },
        )
        .unwrap();

    let settings = Arc::new(SettingsStore::new(kv));
    let journal = FakeJournal::new(initial);
    let remote = InMemoryRemote::new();

    let flow = Arc::new(OAuthFlow::new(
        OAuthConfig::dropbox("test-app-key"),
        token_store.clone(),
        Arc::new(NoopLauncher),
    ));
    let client = Arc::new(ProviderClient::new(flow, remote.clone()));

    let orch = Arc::new(SyncOrchestrator::new(
        journal.clone(),
        settings.clone(),
        network,
        config,
    ));
    orch.register_account(client);

    Harness {
        orch,
        journal,
        remote,
        settings,
        token_store,
    }
}

// ── Record builders ──

pub fn entry(id: &str, body: &str, updated_at: i64) -> JournalEntry {
    JournalEntry {
        id: id.to_string(),
        folder_id: None,
        tags: Vec::new(),
        title: format!("title {id}"),
        body: body.to_string(),
        created_at: 0,
        updated_at,
    }
}

pub fn set_of(entries: Vec<JournalEntry>) -> RecordSet {
    RecordSet {
        entries,
        folders: Vec::new(),
        tags: Vec::new(),
    }
}

/// Encrypts a record set into a bundle the way another device would.
pub fn remote_bundle(records: &RecordSet, password: &str) -> Vec<u8> {
    let payload = serde_json::to_string(records).unwrap();
    quill_bundle::create_bundle(&payload, records.counts(), "other-device", password).unwrap()
}
