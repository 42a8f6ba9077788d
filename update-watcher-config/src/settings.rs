//! The persisted settings record and its notification-state component.

use crate::types::{CronMethod, DedupPolicy, Frequency, NotifyMode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Last version reported per component.
///
/// An entry means "this version has already been announced"; it is cleared
/// once the component is seen without a pending update so that a later
/// release is announced fresh.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifiedState {
    /// Core version last reported (empty = nothing pending)
    pub core: String,
    /// Plugin id → version last reported
    pub plugin: BTreeMap<String, String>,
    /// Theme id → version last reported
    pub theme: BTreeMap<String, String>,
}

impl NotifiedState {
    pub fn is_empty(&self) -> bool {
        self.core.is_empty() && self.plugin.is_empty() && self.theme.is_empty()
    }
}

/// The single versioned settings record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// How scans are triggered
    #[serde(default = "crate::defaults::cron_method")]
    pub cron_method: CronMethod,

    /// Scan interval identifier, or `manual`
    #[serde(default = "crate::defaults::frequency")]
    pub frequency: Frequency,

    /// Comma separated recipient addresses
    #[serde(default)]
    pub notify_to: String,

    /// Sender address
    #[serde(default)]
    pub notify_from: String,

    /// Recipient name used in the greeting
    #[serde(default)]
    pub notify_to_name: String,

    /// Which plugins to check
    #[serde(default = "crate::defaults::notify_mode")]
    pub notify_plugins: NotifyMode,

    /// Which themes to check
    #[serde(default = "crate::defaults::notify_mode")]
    pub notify_themes: NotifyMode,

    /// Redirect automatic core update emails to `notify_to`
    #[serde(default = "crate::defaults::bool_true")]
    pub notify_automatic: bool,

    /// Hide the core update notice from users who cannot update
    #[serde(default = "crate::defaults::bool_true")]
    pub hide_updates: bool,

    /// Token authenticating external triggers
    #[serde(default = "generate_security_key")]
    pub security_key: String,

    /// RFC 3339 timestamp of the last completed scheduled check (auto-managed)
    #[serde(default)]
    pub last_check_time: Option<String>,

    /// Versions already reported (auto-managed)
    #[serde(default)]
    pub notified: NotifiedState,

    /// Whether an unchanged pending plugin update is re-reported every scan
    #[serde(default = "crate::defaults::plugin_dedup")]
    pub plugin_dedup: DedupPolicy,

    /// Whether an unchanged pending theme update is re-reported every scan
    #[serde(default = "crate::defaults::theme_dedup")]
    pub theme_dedup: DedupPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cron_method: crate::defaults::cron_method(),
            frequency: crate::defaults::frequency(),
            notify_to: String::new(),
            notify_from: String::new(),
            notify_to_name: String::new(),
            notify_plugins: crate::defaults::notify_mode(),
            notify_themes: crate::defaults::notify_mode(),
            notify_automatic: true,
            hide_updates: true,
            security_key: generate_security_key(),
            last_check_time: None,
            notified: NotifiedState::default(),
            plugin_dedup: crate::defaults::plugin_dedup(),
            theme_dedup: crate::defaults::theme_dedup(),
        }
    }
}

impl Settings {
    /// Defaults for a fresh install: both contact addresses point at the
    /// site administrator.
    pub fn with_admin_email(admin_email: &str) -> Self {
        Self {
            notify_to: admin_email.to_string(),
            notify_from: admin_email.to_string(),
            ..Self::default()
        }
    }

    /// Recipient addresses, trimmed, empty entries dropped.
    pub fn recipients(&self) -> Vec<String> {
        self.notify_to
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Name used in the report greeting.
    pub fn greeting_name(&self) -> &str {
        let name = self.notify_to_name.trim();
        if name.is_empty() { "there" } else { name }
    }

    /// Record that a check completed now.
    pub fn mark_checked(&mut self) {
        self.last_check_time = Some(current_timestamp());
    }

    /// Human readable "last scanned" value.
    pub fn last_scanned_display(&self) -> String {
        match &self.last_check_time {
            Some(ts) => format_timestamp(ts),
            None => "Never".to_string(),
        }
    }
}

/// Generate a fresh opaque hex token for authenticating external triggers.
pub fn generate_security_key() -> String {
    let mut hasher = Sha256::new();
    hasher.update(
        Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or_default()
            .to_le_bytes(),
    );
    hasher.update(uuid::Uuid::new_v4().as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Get the current timestamp in ISO 8601 format
pub fn current_timestamp() -> String {
    Utc::now().to_rfc3339()
}

/// Format a timestamp for display
pub fn format_timestamp(timestamp: &str) -> String {
    match DateTime::parse_from_rfc3339(timestamp) {
        Ok(dt) => dt.format("%Y-%m-%d @ %H:%M").to_string(),
        Err(_) => timestamp.to_string(),
    }
}
