//! Enumerations and small value types shared by the settings record and
//! the host configuration.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Trigger Types
// ============================================================================

/// How periodic scans are triggered.
///
/// `Internal` relies on the trigger scheduler; `External` expects an outside
/// cron job to call the on-demand endpoint with the security key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CronMethod {
    /// Scheduled by the host's own trigger primitive (default)
    #[default]
    #[serde(alias = "wordpress")]
    Internal,
    /// Driven by an external request carrying the security key
    #[serde(alias = "other")]
    External,
}

impl CronMethod {
    /// Parse a raw form value, accepting legacy names.
    pub fn from_input(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "internal" | "wordpress" => Some(CronMethod::Internal),
            "external" | "other" => Some(CronMethod::External),
            _ => None,
        }
    }

    /// Display name for UI
    pub fn display_name(&self) -> &'static str {
        match self {
            CronMethod::Internal => "Internal Cron",
            CronMethod::External => "External Cron",
        }
    }
}

/// Identifier of a scan interval.
///
/// The set of valid identifiers is host-provided (plus [`Frequency::MANUAL`]),
/// so this is a string newtype rather than a closed enum.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Frequency(String);

impl Frequency {
    /// Synthetic interval meaning "never schedule automatically".
    pub const MANUAL: &'static str = "manual";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn manual() -> Self {
        Self(Self::MANUAL.to_string())
    }

    pub fn is_manual(&self) -> bool {
        self.0 == Self::MANUAL
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Frequency {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

// ============================================================================
// Notification Types
// ============================================================================

/// Which plugins or themes are considered during a scan.
///
/// Stored as a snake_case name; the numeric codes `0`, `1` and `2` used by
/// older records are accepted on load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", try_from = "NotifyModeRepr")]
pub enum NotifyMode {
    /// Do not check this component kind
    Off,
    /// Check every installed component (default)
    #[default]
    All,
    /// Check only active components
    ActiveOnly,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NotifyModeRepr {
    Code(u64),
    Name(String),
}

impl TryFrom<NotifyModeRepr> for NotifyMode {
    type Error = String;

    fn try_from(repr: NotifyModeRepr) -> Result<Self, Self::Error> {
        match repr {
            NotifyModeRepr::Code(code) => {
                Self::from_code(code).ok_or_else(|| format!("invalid notify mode code {code}"))
            }
            NotifyModeRepr::Name(name) => {
                Self::from_input(&name).ok_or_else(|| format!("invalid notify mode '{name}'"))
            }
        }
    }
}

impl NotifyMode {
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(NotifyMode::Off),
            1 => Some(NotifyMode::All),
            2 => Some(NotifyMode::ActiveOnly),
            _ => None,
        }
    }

    /// Parse a raw form value: a numeric code or a mode name.
    pub fn from_input(value: &str) -> Option<Self> {
        let value = value.trim();
        if let Ok(code) = value.parse::<u64>() {
            return Self::from_code(code);
        }
        match value.to_ascii_lowercase().as_str() {
            "off" | "no" => Some(NotifyMode::Off),
            "all" | "yes" => Some(NotifyMode::All),
            "active_only" | "active" => Some(NotifyMode::ActiveOnly),
            _ => None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        *self != NotifyMode::Off
    }

    /// Mode used when the caller asks to see everything regardless of the
    /// stored setting: `Off` is promoted to `All`, other modes are kept.
    pub fn forced(&self) -> Self {
        match self {
            NotifyMode::Off => NotifyMode::All,
            other => *other,
        }
    }

    /// Display name for UI
    pub fn display_name(&self) -> &'static str {
        match self {
            NotifyMode::Off => "No",
            NotifyMode::All => "Yes",
            NotifyMode::ActiveOnly => "Yes but only active",
        }
    }
}

/// Whether an unchanged pending update is reported again on the next scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupPolicy {
    /// Report every pending update on every scan
    EveryScan,
    /// Report a given version once, suppress it while it stays pending
    Once,
}

impl DedupPolicy {
    pub fn from_input(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "every_scan" | "every-scan" | "always" => Some(DedupPolicy::EveryScan),
            "once" => Some(DedupPolicy::Once),
            _ => None,
        }
    }
}

// ============================================================================
// Host Types
// ============================================================================

/// Transport security used when talking to the SMTP relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SmtpSecurity {
    /// Plain connection, no TLS
    None,
    /// Upgrade with STARTTLS, refusing relays that do not offer it (default)
    #[default]
    StartTls,
    /// Implicit TLS from the first byte
    Tls,
}

/// Log level for the diagnostic log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// No logging (log file not created)
    Off,
    /// Errors only
    Error,
    /// Warnings and errors
    Warn,
    /// Informational messages (default)
    #[default]
    Info,
    /// Debug messages
    Debug,
    /// Most verbose
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notify_mode_accepts_legacy_codes() {
        let mode: NotifyMode = serde_json::from_str("2").unwrap();
        assert_eq!(mode, NotifyMode::ActiveOnly);
        let mode: NotifyMode = serde_json::from_str("0").unwrap();
        assert_eq!(mode, NotifyMode::Off);
        assert!(serde_json::from_str::<NotifyMode>("7").is_err());
    }

    #[test]
    fn test_notify_mode_serializes_as_name() {
        let json = serde_json::to_string(&NotifyMode::ActiveOnly).unwrap();
        assert_eq!(json, "\"active_only\"");
        let back: NotifyMode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, NotifyMode::ActiveOnly);
    }

    #[test]
    fn test_notify_mode_forced() {
        assert_eq!(NotifyMode::Off.forced(), NotifyMode::All);
        assert_eq!(NotifyMode::ActiveOnly.forced(), NotifyMode::ActiveOnly);
    }

    #[test]
    fn test_cron_method_legacy_aliases() {
        let method: CronMethod = serde_json::from_str("\"other\"").unwrap();
        assert_eq!(method, CronMethod::External);
        assert_eq!(CronMethod::from_input("wordpress"), Some(CronMethod::Internal));
        assert_eq!(CronMethod::from_input("bogus"), None);
    }

    #[test]
    fn test_frequency_manual() {
        assert!(Frequency::manual().is_manual());
        assert!(!Frequency::from("hourly").is_manual());
    }
}
