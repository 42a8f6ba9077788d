//! Configuration system for update-watcher.
//!
//! This crate owns everything the watcher persists or reads as configuration:
//!
//! - The versioned [`Settings`] record with its [`NotifiedState`] dedup map
//! - Schema migration through [`SettingsStore`]
//! - Key-value backends ([`MemoryStore`], [`YamlFileStore`])
//! - Field-by-field validation of submitted settings
//! - The [`HostConfig`] file describing collaborators (metadata endpoint,
//!   site manifest, SMTP relay, branding)

pub mod defaults;
pub mod error;
pub mod host_config;
pub mod settings;
pub mod settings_store;
pub mod store;
mod types;
pub mod validation;

// Re-export main types for convenience
pub use error::ConfigError;
pub use host_config::{Branding, HostConfig, SmtpConfig};
pub use settings::{
    NotifiedState, Settings, current_timestamp, format_timestamp, generate_security_key,
};
pub use settings_store::{SCHEMA_VERSION, SCHEMA_VERSION_KEY, SETTINGS_KEY, SettingsStore};
pub use store::{KeyValueStore, MemoryStore, YamlFileStore};
pub use types::{CronMethod, DedupPolicy, Frequency, LogLevel, NotifyMode, SmtpSecurity};
pub use validation::{FieldError, SettingsField, SettingsInput, validate_settings};
