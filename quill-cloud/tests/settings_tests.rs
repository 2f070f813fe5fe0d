use quill_cloud::{
    AutoSyncInterval, CloudSyncSettings, FileKeyValueStore, KeyValueStore, MemoryKeyValueStore,
    SettingsStore,
};
use std::sync::Arc;
use std::time::Duration;

// ── Defaults ──

#[test]
fn defaults_when_nothing_stored() {
    let store = SettingsStore::new(Arc::new(MemoryKeyValueStore::new()));
    let settings = store.load().unwrap();
    assert_eq!(settings, CloudSyncSettings::default());
    assert!(!settings.auto_sync_enabled);
    assert!(settings.wifi_only);
    assert!(settings.last_sync_time.is_none());
}

#[test]
fn interval_durations() {
    assert_eq!(AutoSyncInterval::Hourly.as_duration(), Duration::from_secs(3600));
    assert_eq!(
        AutoSyncInterval::Every6Hours.as_duration(),
        Duration::from_secs(6 * 3600)
    );
    assert_eq!(AutoSyncInterval::Daily.as_duration(), Duration::from_secs(24 * 3600));
    assert_eq!(
        AutoSyncInterval::Weekly.as_duration(),
        Duration::from_secs(7 * 24 * 3600)
    );
}

// ── Updates ──

#[test]
fn update_persists() {
    let kv = Arc::new(MemoryKeyValueStore::new());
    let store = SettingsStore::new(kv.clone());

    store
        .update(|s| {
            s.auto_sync_enabled = true;
            s.auto_sync_interval = AutoSyncInterval::Hourly;
            s.wifi_only = false;
        })
        .unwrap();

    let reloaded = SettingsStore::new(kv).load().unwrap();
    assert!(reloaded.auto_sync_enabled);
    assert_eq!(reloaded.auto_sync_interval, AutoSyncInterval::Hourly);
    assert!(!reloaded.wifi_only);
}

#[test]
fn bookkeeping_marks() {
    let store = SettingsStore::new(Arc::new(MemoryKeyValueStore::new()));

    store.mark_local_modified(111).unwrap();
    store.mark_synced(222).unwrap();

    let settings = store.load().unwrap();
    assert_eq!(settings.last_local_modification_time, Some(111));
    assert_eq!(settings.last_sync_time, Some(222));
}

#[test]
fn update_returns_new_state() {
    let store = SettingsStore::new(Arc::new(MemoryKeyValueStore::new()));
    let updated = store.update(|s| s.auto_sync_enabled = true).unwrap();
    assert!(updated.auto_sync_enabled);
}

// ── File-backed store ──

#[test]
fn file_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");

    {
        let kv = Arc::new(FileKeyValueStore::open(&path).unwrap());
        let store = SettingsStore::new(kv);
        store.update(|s| s.auto_sync_enabled = true).unwrap();
        store.mark_synced(42).unwrap();
    }

    let kv = Arc::new(FileKeyValueStore::open(&path).unwrap());
    let settings = SettingsStore::new(kv).load().unwrap();
    assert!(settings.auto_sync_enabled);
    assert_eq!(settings.last_sync_time, Some(42));
}

#[test]
fn file_store_basic_ops() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kv.json");

    let kv = FileKeyValueStore::open(&path).unwrap();
    assert!(kv.get("missing").unwrap().is_none());

    kv.put("a", "1").unwrap();
    assert_eq!(kv.get("a").unwrap().as_deref(), Some("1"));

    kv.remove("a").unwrap();
    assert!(kv.get("a").unwrap().is_none());
}

#[test]
fn file_store_rejects_corrupt_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kv.json");
    std::fs::write(&path, b"{ not json").unwrap();

    assert!(FileKeyValueStore::open(&path).is_err());
}
