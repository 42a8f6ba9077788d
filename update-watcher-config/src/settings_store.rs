//! Versioned access to the settings record.
//!
//! The record lives under [`SETTINGS_KEY`] and its schema version under
//! [`SCHEMA_VERSION_KEY`]. Whenever the stored version differs from
//! [`SCHEMA_VERSION`] the record is rebuilt as "defaults overridden by the
//! stored keys that are still recognized" and written back with the new
//! version, so obsolete keys disappear, new keys get their defaults and
//! existing values survive.

use crate::error::{ConfigError, Result};
use crate::settings::Settings;
use crate::store::KeyValueStore;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Key holding the settings record.
pub const SETTINGS_KEY: &str = "update_watcher_settings";

/// Key holding the schema version of the settings record.
pub const SCHEMA_VERSION_KEY: &str = "update_watcher_settings_ver";

/// Schema version this build expects.
pub const SCHEMA_VERSION: &str = "5.0";

/// Typed, migrating facade over a [`KeyValueStore`].
pub struct SettingsStore {
    kv: Arc<dyn KeyValueStore>,
    defaults: Settings,
}

impl SettingsStore {
    /// `defaults` is the record a fresh install starts from (see
    /// [`Settings::with_admin_email`]).
    pub fn new(kv: Arc<dyn KeyValueStore>, defaults: Settings) -> Self {
        Self { kv, defaults }
    }

    pub fn defaults(&self) -> &Settings {
        &self.defaults
    }

    /// Bring the stored record up to [`SCHEMA_VERSION`].
    ///
    /// Returns `true` when a migration was written. Calling it again without
    /// a schema change performs no writes.
    pub fn ensure_current(&self) -> Result<bool> {
        let stored_version = self.kv.get(SCHEMA_VERSION_KEY)?;
        if stored_version.as_ref().and_then(Value::as_str) == Some(SCHEMA_VERSION) {
            return Ok(false);
        }

        log::info!(
            "Migrating settings from schema {:?} to {}",
            stored_version,
            SCHEMA_VERSION
        );

        let stored = self.kv.get(SETTINGS_KEY)?;
        let merged = merge_with_defaults(stored.as_ref(), &self.defaults)?;
        self.put(&merged)?;
        self.kv
            .put(SCHEMA_VERSION_KEY, Value::String(SCHEMA_VERSION.to_string()))?;
        Ok(true)
    }

    /// Load the settings record.
    ///
    /// A missing record yields the defaults. A record that no longer
    /// deserializes is repaired field by field instead of failing the caller.
    pub fn get(&self) -> Result<Settings> {
        let Some(value) = self.kv.get(SETTINGS_KEY)? else {
            return Ok(self.defaults.clone());
        };
        match serde_json::from_value::<Settings>(value.clone()) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                log::warn!("Stored settings failed to load ({e}); repairing from defaults");
                merge_with_defaults(Some(&value), &self.defaults)
            }
        }
    }

    /// Persist the full settings record.
    pub fn put(&self, settings: &Settings) -> Result<()> {
        self.kv.put(SETTINGS_KEY, serde_json::to_value(settings)?)
    }

    /// Remove the record and its schema version.
    pub fn uninstall(&self) -> Result<()> {
        self.kv.delete(SETTINGS_KEY)?;
        self.kv.delete(SCHEMA_VERSION_KEY)
    }
}

/// Compute `defaults ⊕ (stored ∩ keys(defaults))`.
///
/// Keys unknown to the current schema are dropped. A recognized key whose
/// stored value no longer fits its type keeps the default.
pub fn merge_with_defaults(stored: Option<&Value>, defaults: &Settings) -> Result<Settings> {
    let Value::Object(mut merged) = serde_json::to_value(defaults)? else {
        return Err(ConfigError::Validation(
            "default settings did not serialize to a mapping".to_string(),
        ));
    };

    let empty = Map::new();
    let stored = match stored {
        Some(Value::Object(map)) => map,
        Some(other) => {
            log::warn!("Stored settings record is not a mapping ({other}); using defaults");
            &empty
        }
        None => &empty,
    };

    for (key, value) in stored {
        if !merged.contains_key(key) {
            log::debug!("Dropping obsolete settings key '{key}'");
            continue;
        }
        let mut candidate = merged.clone();
        candidate.insert(key.clone(), value.clone());
        if serde_json::from_value::<Settings>(Value::Object(candidate)).is_ok() {
            merged.insert(key.clone(), value.clone());
        } else {
            log::warn!("Stored value for settings key '{key}' is invalid; using default");
        }
    }

    Ok(serde_json::from_value(Value::Object(merged))?)
}
