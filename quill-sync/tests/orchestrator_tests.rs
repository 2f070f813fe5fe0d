mod support;

use quill_bundle::{extract_bundle, read_metadata};
use quill_sync::{NetworkMonitor, SyncError, SyncPasswordSource, TriggerDecision};
use quill_types::{now_millis, Provider, RecordSet};
use std::sync::Arc;
use std::time::Duration;
use support::{entry, harness, harness_opts, remote_bundle, set_of, test_config};
use zeroize::Zeroizing;

const PW: &str = "sync password";

// ── First sync ──

#[tokio::test]
async fn first_sync_uploads_full_state() {
    support::init_tracing();
    let h = harness(set_of(vec![entry("a", "first", 100), entry("b", "second", 200)]));

    let report = h.orch.sync_now(Provider::Dropbox, PW).await.unwrap();
    assert!(report.uploaded);
    assert_eq!(report.merged, 0);
    assert_eq!(report.remote_file_id.as_deref(), Some("remote-1"));

    let bytes = h.remote.slot_bytes().expect("remote slot written");
    let metadata = read_metadata(&bytes).unwrap();
    assert_eq!(metadata.entry_count, 2);

    let recovered: RecordSet =
        serde_json::from_str(&extract_bundle(&bytes, PW).unwrap()).unwrap();
    assert_eq!(recovered, h.journal.snapshot());

    let settings = h.settings.load().unwrap();
    assert_eq!(settings.last_sync_time, Some(metadata.created_at));
    assert_eq!(report.last_sync_time, Some(metadata.created_at));
}

// ── Idempotence ──

#[tokio::test]
async fn second_sync_without_changes_is_a_no_op() {
    let h = harness(set_of(vec![entry("a", "body", 100)]));

    h.orch.sync_now(Provider::Dropbox, PW).await.unwrap();
    let slot_after_first = h.remote.slot_bytes();
    let sync_time_after_first = h.settings.load().unwrap().last_sync_time;

    let report = h.orch.sync_now(Provider::Dropbox, PW).await.unwrap();
    assert!(!report.uploaded);
    assert_eq!(report.merged, 0);

    assert_eq!(h.remote.slot_bytes(), slot_after_first);
    assert_eq!(h.settings.load().unwrap().last_sync_time, sync_time_after_first);
    assert_eq!(h.remote.uploads(), 1);
    assert_eq!(h.journal.snapshot().entries.len(), 1);
}

// ── Conflict resolution ──

#[tokio::test]
async fn newer_remote_record_replaces_local() {
    let h = harness(set_of(vec![entry("r", "local version", 100)]));
    let bundle = remote_bundle(&set_of(vec![entry("r", "remote version", 200)]), PW);
    h.remote.set_slot(bundle);
    // Remote bundle was created after our last successful sync.
    h.settings.mark_synced(now_millis() - 60_000).unwrap();

    let report = h.orch.sync_now(Provider::Dropbox, PW).await.unwrap();
    assert_eq!(report.merged, 1);
    assert!(report.uploaded);

    let entries = h.journal.snapshot().entries;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].body, "remote version");
    assert_eq!(entries[0].updated_at, 200);
}

#[tokio::test]
async fn older_remote_record_keeps_local() {
    let h = harness(set_of(vec![entry("r", "local version", 200)]));
    let bundle = remote_bundle(&set_of(vec![entry("r", "remote version", 100)]), PW);
    h.remote.set_slot(bundle);
    h.settings.mark_synced(now_millis() - 60_000).unwrap();

    let report = h.orch.sync_now(Provider::Dropbox, PW).await.unwrap();
    assert_eq!(report.merged, 0);
    assert!(!report.uploaded);

    let entries = h.journal.snapshot().entries;
    assert_eq!(entries[0].body, "local version");
}

// ── Password handling ──

#[tokio::test]
async fn wrong_password_aborts_before_any_upload() {
    let h = harness(set_of(vec![entry("local", "precious", 100)]));
    let foreign = remote_bundle(&set_of(vec![entry("remote", "theirs", 200)]), "pw1");
    h.remote.set_slot(foreign.clone());

    let err = h.orch.sync_now(Provider::Dropbox, "wrong").await.unwrap_err();
    assert!(matches!(err, SyncError::PasswordRejected));

    // The unreadable remote backup was not overwritten and no bookkeeping
    // was committed.
    assert_eq!(h.remote.uploads(), 0);
    assert_eq!(h.remote.slot_bytes(), Some(foreign));
    assert!(h.settings.load().unwrap().last_sync_time.is_none());
}

#[tokio::test]
async fn malformed_remote_bundle_is_reported() {
    let h = harness(set_of(vec![entry("a", "body", 100)]));
    h.remote.set_slot(b"not a bundle at all".to_vec());

    let err = h.orch.sync_now(Provider::Dropbox, PW).await.unwrap_err();
    assert!(matches!(err, SyncError::MalformedBundle(_)));
    assert_eq!(h.remote.uploads(), 0);
}

// ── Local modifications ──

#[tokio::test]
async fn local_modification_triggers_next_upload() {
    let h = harness(set_of(vec![entry("a", "body", 100)]));
    h.orch.sync_now(Provider::Dropbox, PW).await.unwrap();

    h.settings.mark_local_modified(now_millis() + 1).unwrap();

    let report = h.orch.sync_now(Provider::Dropbox, PW).await.unwrap();
    assert!(report.uploaded);
    assert_eq!(h.remote.uploads(), 2);
}

// ── Partial merge failures ──

#[tokio::test]
async fn per_record_failure_is_reported_not_fatal() {
    let h = harness(RecordSet::default());
    let bundle = remote_bundle(
        &set_of(vec![entry("good", "ok", 100), entry("bad", "nope", 100)]),
        PW,
    );
    h.remote.set_slot(bundle);
    h.journal.fail_id("bad");

    let report = h.orch.sync_now(Provider::Dropbox, PW).await.unwrap();
    assert_eq!(report.merged, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].record_id, "bad");
    assert!(report.uploaded);
    assert!(h.settings.load().unwrap().last_sync_time.is_some());
}

// ── Network failures ──

#[tokio::test]
async fn transient_download_failures_are_retried() {
    let h = harness(set_of(vec![entry("a", "body", 100)]));
    *h.remote.fail_downloads.lock().unwrap() = 2;

    let report = h.orch.sync_now(Provider::Dropbox, PW).await.unwrap();
    assert!(report.uploaded);
    assert_eq!(h.remote.download_attempts(), 3);
}

#[tokio::test]
async fn persistent_network_failure_gives_up_cleanly() {
    let h = harness(set_of(vec![entry("a", "body", 100)]));
    *h.remote.fail_downloads.lock().unwrap() = 10;

    let err = h.orch.sync_now(Provider::Dropbox, PW).await.unwrap_err();
    assert!(matches!(err, SyncError::Network(_)));
    assert_eq!(h.remote.download_attempts(), 3);
    assert_eq!(h.remote.uploads(), 0);
    assert!(h.settings.load().unwrap().last_sync_time.is_none());
}

// ── Concurrency ──

#[tokio::test]
async fn concurrent_cycle_for_same_provider_is_rejected() {
    let h = harness(set_of(vec![entry("a", "body", 100)]));
    h.remote.set_delay(Duration::from_millis(300));

    let orch = h.orch.clone();
    let first = tokio::spawn(async move { orch.sync_now(Provider::Dropbox, PW).await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let err = h.orch.sync_now(Provider::Dropbox, PW).await.unwrap_err();
    assert!(matches!(err, SyncError::CycleInProgress(Provider::Dropbox)));

    first.await.unwrap().unwrap();

    // The slot is free again once the first cycle finished.
    h.remote.set_delay(Duration::ZERO);
    h.orch.sync_now(Provider::Dropbox, PW).await.unwrap();
}

#[tokio::test]
async fn unknown_provider_is_not_connected() {
    let h = harness(RecordSet::default());
    let err = h.orch.sync_now(Provider::GoogleDrive, PW).await.unwrap_err();
    assert!(matches!(err, SyncError::NotConnected(Provider::GoogleDrive)));
}

#[tokio::test]
async fn cycle_deadline_is_enforced() {
    let mut config = test_config();
    config.cycle_timeout = Duration::from_millis(100);
    let h = harness_opts(
        set_of(vec![entry("a", "body", 100)]),
        Arc::new(quill_sync::AlwaysUnmetered),
        config,
    );
    h.remote.set_delay(Duration::from_millis(500));

    let err = h.orch.sync_now(Provider::Dropbox, PW).await.unwrap_err();
    assert!(matches!(err, SyncError::Timeout));
    assert!(h.settings.load().unwrap().last_sync_time.is_none());
}

// ── Trigger policy ──

struct Metered;

impl NetworkMonitor for Metered {
    fn is_unmetered(&self) -> bool {
        false
    }
}

#[tokio::test]
async fn trigger_policy_decisions() {
    let h = harness(RecordSet::default());

    // Auto sync off by default.
    assert_eq!(
        h.orch.should_sync(Provider::Dropbox).unwrap(),
        TriggerDecision::AutoSyncDisabled
    );

    h.settings
        .update(|s| {
            s.auto_sync_enabled = true;
            s.wifi_only = false;
        })
        .unwrap();

    assert_eq!(
        h.orch.should_sync(Provider::Dropbox).unwrap(),
        TriggerDecision::Due
    );
    assert_eq!(
        h.orch.should_sync(Provider::GoogleDrive).unwrap(),
        TriggerDecision::NotConnected
    );

    // Recently synced → not yet due for a daily interval.
    h.settings.mark_synced(now_millis()).unwrap();
    assert_eq!(
        h.orch.should_sync(Provider::Dropbox).unwrap(),
        TriggerDecision::NotYetDue
    );

    // Interval elapsed → due again.
    h.settings
        .update(|s| s.last_sync_time = Some(now_millis() - 25 * 60 * 60 * 1000))
        .unwrap();
    assert_eq!(
        h.orch.should_sync(Provider::Dropbox).unwrap(),
        TriggerDecision::Due
    );
}

#[tokio::test]
async fn wifi_only_on_metered_network_skips() {
    let h = harness_opts(RecordSet::default(), Arc::new(Metered), test_config());
    h.settings
        .update(|s| {
            s.auto_sync_enabled = true;
            s.wifi_only = true;
        })
        .unwrap();

    assert_eq!(
        h.orch.should_sync(Provider::Dropbox).unwrap(),
        TriggerDecision::MeteredNetwork
    );

    // Off-wifi restriction lifted → due.
    h.settings.update(|s| s.wifi_only = false).unwrap();
    assert_eq!(
        h.orch.should_sync(Provider::Dropbox).unwrap(),
        TriggerDecision::Due
    );
}

// ── Scheduler ──

struct FixedPassword;

impl SyncPasswordSource for FixedPassword {
    fn sync_password(&self) -> Option<Zeroizing<String>> {
        Some(Zeroizing::new(PW.to_string()))
    }
}

#[tokio::test]
async fn scheduler_runs_due_cycles_and_stops_on_shutdown() {
    let mut config = test_config();
    config.scheduler_tick = Duration::from_millis(50);
    let h = harness_opts(
        set_of(vec![entry("a", "body", 100)]),
        Arc::new(quill_sync::AlwaysUnmetered),
        config,
    );
    h.settings
        .update(|s| {
            s.auto_sync_enabled = true;
            s.wifi_only = false;
        })
        .unwrap();

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let task = tokio::spawn(
        h.orch
            .clone()
            .run_scheduler(Arc::new(FixedPassword), shutdown_rx),
    );

    // Wait for at least one scheduled cycle to land.
    let mut waited = 0;
    while h.remote.uploads() == 0 && waited < 100 {
        tokio::time::sleep(Duration::from_millis(50)).await;
        waited += 1;
    }
    assert!(h.remote.uploads() >= 1);

    shutdown_tx.send(true).unwrap();
    task.await.unwrap();
}
