//! Key-value persistence backends.
//!
//! The engine only needs `get`/`put`/`delete` on whole records, so the host
//! store is modelled as a map from key to `serde_json::Value`. Two backends
//! ship with the crate:
//! - [`MemoryStore`]: process-local, used by tests and dry runs
//! - [`YamlFileStore`]: a single YAML document, written atomically

use crate::error::Result;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// A persistent key-value store holding whole records.
///
/// No transactional guarantee is assumed beyond last-write-wins; callers that
/// read-modify-write a record must hold their own lock for the duration.
///
/// That lock is process-local. The engine assumes a single-trigger host: only
/// one process (the `watch` loop, a cron `trigger` or a manual `check`)
/// scans against a given store at a time. Two processes scanning the same
/// state file concurrently can lose each other's notified-version writes.
pub trait KeyValueStore: Send + Sync {
    /// Fetch the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Store `value` under `key`, replacing any previous value.
    fn put(&self, key: &str, value: Value) -> Result<()>;

    /// Remove `key`. Removing a missing key is not an error.
    fn delete(&self, key: &str) -> Result<()>;
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the stored keys.
    pub fn keys(&self) -> Vec<String> {
        self.values.lock().keys().cloned().collect()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn put(&self, key: &str, value: Value) -> Result<()> {
        self.values.lock().insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.values.lock().remove(key);
        Ok(())
    }
}

/// Store backed by a single YAML file.
///
/// Every write re-serializes the whole document to a temp file and renames it
/// over the original to prevent corruption on crash. Every operation re-reads
/// the file, so writes from another handle or process are seen on the next
/// call. The internal mutex only serializes callers within this process (see
/// [`KeyValueStore`] for the single-trigger assumption).
#[derive(Debug)]
pub struct YamlFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl YamlFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, Value>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_yaml_ng::from_str(&contents)?)
    }

    fn write_all(&self, values: &BTreeMap<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let yaml = serde_yaml_ng::to_string(values)?;

        let temp_path = self.path.with_extension("yaml.tmp");
        fs::write(&temp_path, &yaml)?;

        // The file may hold the trigger security key.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Err(e) = fs::set_permissions(&temp_path, fs::Permissions::from_mode(0o600)) {
                log::warn!("Failed to restrict permissions on {:?}: {}", temp_path, e);
            }
        }

        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for YamlFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let _guard = self.lock.lock();
        Ok(self.read_all()?.remove(key))
    }

    fn put(&self, key: &str, value: Value) -> Result<()> {
        let _guard = self.lock.lock();
        let mut values = self.read_all()?;
        values.insert(key.to_string(), value);
        self.write_all(&values)
    }

    fn delete(&self, key: &str) -> Result<()> {
        let _guard = self.lock.lock();
        let mut values = self.read_all()?;
        if values.remove(key).is_some() {
            self.write_all(&values)?;
        }
        Ok(())
    }
}
