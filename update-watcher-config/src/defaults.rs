//! Default value functions for settings and host configuration.
//!
//! Used as `#[serde(default = "crate::defaults::...")]` attributes so a record
//! missing a field picks up the same value a fresh install would.

use crate::types::{CronMethod, DedupPolicy, Frequency, LogLevel, NotifyMode, SmtpSecurity};

// ── Primitive helpers ──────────────────────────────────────────────────────

pub fn bool_true() -> bool {
    true
}

// ── Settings ───────────────────────────────────────────────────────────────

pub fn cron_method() -> CronMethod {
    CronMethod::Internal
}

pub fn frequency() -> Frequency {
    Frequency::from("hourly")
}

pub fn notify_mode() -> NotifyMode {
    NotifyMode::All
}

pub fn plugin_dedup() -> DedupPolicy {
    DedupPolicy::EveryScan
}

pub fn theme_dedup() -> DedupPolicy {
    DedupPolicy::Once
}

// ── Host ───────────────────────────────────────────────────────────────────

pub fn platform_name() -> String {
    "WordPress".to_string()
}

pub fn sender_name() -> String {
    "Update Watcher".to_string()
}

pub fn smtp_port() -> u16 {
    587
}

pub fn smtp_security() -> SmtpSecurity {
    SmtpSecurity::StartTls
}

pub fn smtp_timeout_secs() -> u64 {
    30
}

pub fn log_level() -> LogLevel {
    LogLevel::Info
}
