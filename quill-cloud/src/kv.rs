//! Persistent key-value store port.
//!
//! The token store and settings bookkeeping persist through this trait.
//! The platform injects its own durable implementation; `FileKeyValueStore`
//! is the desktop default and `MemoryKeyValueStore` backs tests.

use crate::error::{CloudError, CloudResult};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Durable string key-value storage. `put` must survive process restarts
/// once it returns. Implementations serialize their own writes.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> CloudResult<Option<String>>;
    fn put(&self, key: &str, value: &str) -> CloudResult<()>;
    fn remove(&self, key: &str) -> CloudResult<()>;
}

/// In-memory store for tests.
#[derive(Default)]
pub struct MemoryKeyValueStore {
    map: Mutex<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.map.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> CloudResult<Option<String>> {
        Ok(self.lock().get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> CloudResult<()> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> CloudResult<()> {
        self.lock().remove(key);
        Ok(())
    }
}

/// JSON-file-backed store with atomic rewrites.
///
/// The whole map is rewritten through a temp file + rename on every `put`,
/// so a crash mid-write leaves the previous state intact. Writes are
/// serialized by an internal lock.
pub struct FileKeyValueStore {
    path: PathBuf,
    map: Mutex<HashMap<String, String>>,
}

impl FileKeyValueStore {
    /// Opens (or creates) a store at `path`.
    pub fn open(path: impl Into<PathBuf>) -> CloudResult<Self> {
        let path = path.into();
        let map = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|e| CloudError::Store(format!("corrupt store file: {e}")))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(CloudError::Store(format!("failed to read store: {e}"))),
        };
        Ok(Self {
            path,
            map: Mutex::new(map),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.map.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn persist(&self, map: &HashMap<String, String>) -> CloudResult<()> {
        let json = serde_json::to_vec_pretty(map)?;
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(parent)
            .map_err(|e| CloudError::Store(format!("failed to create temp file: {e}")))?;
        tmp.write_all(&json)
            .and_then(|_| tmp.as_file_mut().sync_all())
            .map_err(|e| CloudError::Store(format!("failed to write store: {e}")))?;
        tmp.persist(&self.path)
            .map_err(|e| CloudError::Store(format!("failed to persist store: {e}")))?;
        Ok(())
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> CloudResult<Option<String>> {
        Ok(self.lock().get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> CloudResult<()> {
        let mut map = self.lock();
        map.insert(key.to_string(), value.to_string());
        self.persist(&map)
    }

    fn remove(&self, key: &str) -> CloudResult<()> {
        let mut map = self.lock();
        if map.remove(key).is_some() {
            self.persist(&map)?;
        }
        Ok(())
    }
}
