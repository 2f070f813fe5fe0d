//! Sync orchestrator: one pull-merge-push cycle at a time per provider.
//!
//! Bookkeeping (`last_sync_time`) is committed only after a successful
//! upload — any earlier failure or cancellation leaves it untouched, so
//! retrying a cycle is always safe. An in-flight guard keyed by provider
//! prevents two concurrent cycles racing on the same remote slot; cycles
//! for different providers may run concurrently.

use crate::error::{SyncError, SyncResult};
use crate::merge::remote_winners;
use crate::report::SyncReport;
use quill_bundle::{create_bundle, extract_bundle, read_metadata, BundleError};
use quill_cloud::{ProviderClient, SettingsStore};
use quill_types::{now_millis, JournalStore, Provider, RecordSet};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

/// Reports whether the device is on an unmetered network. Injected by the
/// platform; consulted by the trigger policy when `wifi_only` is set.
pub trait NetworkMonitor: Send + Sync {
    fn is_unmetered(&self) -> bool;
}

/// Monitor for platforms without metered connections (desktop).
pub struct AlwaysUnmetered;

impl NetworkMonitor for AlwaysUnmetered {
    fn is_unmetered(&self) -> bool {
        true
    }
}

/// Supplies the sync password to scheduled cycles. Returns `None` when the
/// user must be prompted first; the scheduler then skips the cycle.
pub trait SyncPasswordSource: Send + Sync {
    fn sync_password(&self) -> Option<Zeroizing<String>>;
}

/// Why a provider was or was not synced by the trigger policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerDecision {
    Due,
    AutoSyncDisabled,
    NotConnected,
    /// `wifi_only` is set and the network is metered. The cycle is
    /// skipped, not queued — the next tick re-evaluates.
    MeteredNetwork,
    NotYetDue,
}

/// Tunables for the sync engine.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Overall deadline for one cycle, after which it fails with
    /// `SyncError::Timeout` rather than being silently abandoned.
    pub cycle_timeout: Duration,
    /// Bounded attempts for each network operation within a cycle.
    pub max_network_attempts: u32,
    /// Base delay for exponential backoff between attempts.
    pub retry_base_delay: Duration,
    /// How often the scheduler re-evaluates the trigger policy.
    pub scheduler_tick: Duration,
    /// Producer version written into bundle metadata.
    pub app_version: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            cycle_timeout: Duration::from_secs(300),
            max_network_attempts: 3,
            retry_base_delay: Duration::from_millis(500),
            scheduler_tick: Duration::from_secs(60),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Drives sync cycles and owns the conflict and trigger policies.
pub struct SyncOrchestrator {
    journal: Arc<dyn JournalStore>,
    settings: Arc<SettingsStore>,
    network: Arc<dyn NetworkMonitor>,
    accounts: Mutex<HashMap<Provider, Arc<ProviderClient>>>,
    in_flight: Mutex<HashSet<Provider>>,
    config: SyncConfig,
}

impl SyncOrchestrator {
    pub fn new(
        journal: Arc<dyn JournalStore>,
        settings: Arc<SettingsStore>,
        network: Arc<dyn NetworkMonitor>,
        config: SyncConfig,
    ) -> Self {
        Self {
            journal,
            settings,
            network,
            accounts: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashSet::new()),
            config,
        }
    }

    // ── Accounts ──

    pub fn register_account(&self, client: Arc<ProviderClient>) {
        let provider = client.provider();
        self.lock_accounts().insert(provider, client);
        debug!("registered sync account for {provider}");
    }

    pub fn remove_account(&self, provider: Provider) {
        self.lock_accounts().remove(&provider);
        debug!("removed sync account for {provider}");
    }

    pub fn registered_providers(&self) -> Vec<Provider> {
        let mut providers: Vec<Provider> = self.lock_accounts().keys().copied().collect();
        providers.sort();
        providers
    }

    fn account(&self, provider: Provider) -> SyncResult<Arc<ProviderClient>> {
        self.lock_accounts()
            .get(&provider)
            .cloned()
            .ok_or(SyncError::NotConnected(provider))
    }

    fn lock_accounts(&self) -> std::sync::MutexGuard<'_, HashMap<Provider, Arc<ProviderClient>>> {
        self.accounts.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    // ── One cycle ──

    /// Runs one complete pull-merge-push cycle for `provider` under the
    /// overall cycle deadline.
    pub async fn sync_now(&self, provider: Provider, password: &str) -> SyncResult<SyncReport> {
        let _guard = self.acquire_in_flight(provider)?;
        let client = self.account(provider)?;

        info!("starting sync cycle for {provider}");
        let outcome = tokio::time::timeout(
            self.config.cycle_timeout,
            self.run_cycle(provider, &client, password),
        )
        .await;

        match outcome {
            Ok(Ok(report)) => {
                info!(
                    "sync cycle for {provider} complete: merged {}, uploaded {}",
                    report.merged, report.uploaded
                );
                Ok(report)
            }
            Ok(Err(e)) => {
                warn!("sync cycle for {provider} failed: {e}");
                Err(e)
            }
            Err(_) => {
                warn!("sync cycle for {provider} exceeded deadline");
                Err(SyncError::Timeout)
            }
        }
    }

    async fn run_cycle(
        &self,
        provider: Provider,
        client: &ProviderClient,
        password: &str,
    ) -> SyncResult<SyncReport> {
        // Held only for the duration of this cycle, then wiped.
        let password = Zeroizing::new(password.to_string());
        let settings = self.settings.load()?;

        // 1. Pull the remote bundle; an empty slot means nothing to merge.
        let remote_bytes = self.download_with_retries(client, provider).await?;

        // 2–3. Decrypt and merge. Decryption runs before any upload
        // decision: a remote backup this password cannot read must never
        // be overwritten.
        let mut merged = 0usize;
        let mut failures = Vec::new();
        if let Some(bytes) = remote_bytes.clone() {
            let metadata = read_metadata(&bytes)?;
            let remote_json = {
                let password = password.clone();
                tokio::task::spawn_blocking(move || extract_bundle(&bytes, &password))
                    .await
                    .map_err(|e| SyncError::Internal(format!("decrypt task failed: {e}")))??
            };

            let remote_newer = settings
                .last_sync_time
                .is_none_or(|t| metadata.created_at > t);
            if remote_newer {
                let remote: RecordSet = serde_json::from_str(&remote_json).map_err(|e| {
                    SyncError::MalformedBundle(BundleError::Payload(e.to_string()))
                })?;
                let local = self.journal.export_all().await?;
                let winners = remote_winners(&local, &remote);
                if !winners.is_empty() {
                    debug!("applying {} remote records from {provider}", winners.len());
                    let results = self.journal.apply_imported(winners).await?;
                    merged = results.iter().filter(|r| r.is_ok()).count();
                    failures.extend(results.into_iter().filter(|r| !r.is_ok()));
                    if !failures.is_empty() {
                        warn!("{} records failed to apply during merge", failures.len());
                    }
                }
            }
        }

        // 4. Local changes since the last successful sync must ship
        // regardless of the merge outcome.
        let local_dirty = match (
            settings.last_local_modification_time,
            settings.last_sync_time,
        ) {
            (Some(modified), Some(synced)) => modified > synced,
            (Some(_), None) => true,
            (None, _) => false,
        };
        let never_synced = settings.last_sync_time.is_none();

        // 5. Push. Skipped when neither side changed — this is what makes
        // back-to-back cycles idempotent.
        let nothing_to_push = merged == 0
            && failures.is_empty()
            && !local_dirty
            && !never_synced
            && remote_bytes.is_some();
        if nothing_to_push {
            debug!("no changes on either side for {provider}, skipping upload");
            return Ok(SyncReport::no_change(provider));
        }

        let export = self.journal.export_all().await?;
        let payload = serde_json::to_string(&export)?;
        let bundle = {
            let counts = export.counts();
            let app_version = self.config.app_version.clone();
            let password = password.clone();
            tokio::task::spawn_blocking(move || {
                create_bundle(&payload, counts, &app_version, &password)
            })
            .await
            .map_err(|e| SyncError::Internal(format!("encrypt task failed: {e}")))??
        };
        let uploaded_at = read_metadata(&bundle)?.created_at;
        let remote_file_id = self.upload_with_retries(client, provider, &bundle).await?;

        // 6. Commit bookkeeping only now that the upload succeeded.
        self.settings.mark_synced(uploaded_at)?;

        Ok(SyncReport {
            provider,
            merged,
            failures,
            uploaded: true,
            remote_file_id: Some(remote_file_id),
            last_sync_time: Some(uploaded_at),
        })
    }

    // ── Trigger policy ──

    /// Evaluates whether an automatic sync should run for `provider` now.
    pub fn should_sync(&self, provider: Provider) -> SyncResult<TriggerDecision> {
        let settings = self.settings.load()?;
        if !settings.auto_sync_enabled {
            return Ok(TriggerDecision::AutoSyncDisabled);
        }
        if !self.lock_accounts().contains_key(&provider) {
            return Ok(TriggerDecision::NotConnected);
        }
        if settings.wifi_only && !self.network.is_unmetered() {
            return Ok(TriggerDecision::MeteredNetwork);
        }
        match settings.last_sync_time {
            None => Ok(TriggerDecision::Due),
            Some(last) => {
                let interval_ms = settings.auto_sync_interval.as_duration().as_millis() as i64;
                if now_millis() >= last + interval_ms {
                    Ok(TriggerDecision::Due)
                } else {
                    Ok(TriggerDecision::NotYetDue)
                }
            }
        }
    }

    /// Timer loop: re-evaluates the trigger policy each tick and runs due
    /// cycles. Stops when `shutdown` flips to true or its sender drops;
    /// cancelling mid-cycle leaves bookkeeping untouched.
    pub async fn run_scheduler(
        self: Arc<Self>,
        passwords: Arc<dyn SyncPasswordSource>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!("sync scheduler started");
        let mut tick = tokio::time::interval(self.config.scheduler_tick);
        // Skip the immediate first tick.
        tick.tick().await;

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    for provider in self.registered_providers() {
                        match self.should_sync(provider) {
                            Ok(TriggerDecision::Due) => {
                                let Some(password) = passwords.sync_password() else {
                                    debug!("sync due for {provider} but no password available");
                                    continue;
                                };
                                if let Err(e) = self.sync_now(provider, &password).await {
                                    warn!("scheduled sync for {provider} failed: {e}");
                                }
                            }
                            Ok(decision) => debug!("skipping {provider}: {decision:?}"),
                            Err(e) => warn!("trigger evaluation failed for {provider}: {e}"),
                        }
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("sync scheduler stopped");
    }

    // ── Internals ──

    fn acquire_in_flight(&self, provider: Provider) -> SyncResult<InFlightGuard<'_>> {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if !in_flight.insert(provider) {
            return Err(SyncError::CycleInProgress(provider));
        }
        Ok(InFlightGuard {
            set: &self.in_flight,
            provider,
        })
    }

    async fn download_with_retries(
        &self,
        client: &ProviderClient,
        provider: Provider,
    ) -> SyncResult<Option<Vec<u8>>> {
        let mut attempt = 0;
        loop {
            match client.download().await {
                Ok(bytes) => return Ok(bytes),
                Err(e) if e.is_transient() && attempt + 1 < self.config.max_network_attempts => {
                    let backoff = self.config.retry_base_delay * (1 << attempt);
                    warn!("download from {provider} failed, retrying in {backoff:?}: {e}");
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn upload_with_retries(
        &self,
        client: &ProviderClient,
        provider: Provider,
        bundle: &[u8],
    ) -> SyncResult<String> {
        let mut attempt = 0;
        loop {
            match client.upload(bundle).await {
                Ok(file_id) => return Ok(file_id),
                Err(e) if e.is_transient() && attempt + 1 < self.config.max_network_attempts => {
                    let backoff = self.config.retry_base_delay * (1 << attempt);
                    warn!("upload to {provider} failed, retrying in {backoff:?}: {e}");
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Releases the per-provider in-flight slot when the cycle ends, whether
/// it completed, failed, or was cancelled.
struct InFlightGuard<'a> {
    set: &'a Mutex<HashSet<Provider>>,
    provider: Provider,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(&self.provider);
    }
}
