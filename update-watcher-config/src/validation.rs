//! Field-by-field validation of settings submitted by a configuration UI.
//!
//! Every field is checked on its own. A rejected field keeps its current
//! value and produces a [`FieldError`]; accepted fields are applied, so a
//! partially invalid submission is partially saved.

use crate::settings::Settings;
use crate::types::{CronMethod, DedupPolicy, Frequency, NotifyMode};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Address pattern roughly equivalent to the host platform's own check:
/// a permissive local part and a dotted domain of alphanumeric labels.
static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();

/// Markup tags stripped from free-text fields.
static TAG_REGEX: OnceLock<Regex> = OnceLock::new();

fn email_regex() -> &'static Regex {
    EMAIL_REGEX.get_or_init(|| {
        Regex::new(
            r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~.-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)+$",
        )
        .expect("Failed to compile email regex")
    })
}

fn tag_regex() -> &'static Regex {
    TAG_REGEX.get_or_init(|| Regex::new(r"<[^>]*>").expect("Failed to compile tag regex"))
}

/// Raw submitted values. `None` means the field was absent from the form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsInput {
    pub cron_method: Option<String>,
    pub frequency: Option<String>,
    pub notify_to: Option<String>,
    pub notify_from: Option<String>,
    pub notify_to_name: Option<String>,
    pub notify_plugins: Option<String>,
    pub notify_themes: Option<String>,
    pub notify_automatic: Option<String>,
    pub hide_updates: Option<String>,
    pub plugin_dedup: Option<String>,
    pub theme_dedup: Option<String>,
}

impl SettingsInput {
    /// Input that resubmits `settings` unchanged.
    pub fn from_settings(settings: &Settings) -> Self {
        let mode_code = |mode: NotifyMode| match mode {
            NotifyMode::Off => "0",
            NotifyMode::All => "1",
            NotifyMode::ActiveOnly => "2",
        };
        let dedup = |policy: DedupPolicy| match policy {
            DedupPolicy::EveryScan => "every_scan",
            DedupPolicy::Once => "once",
        };
        Self {
            cron_method: Some(
                match settings.cron_method {
                    CronMethod::Internal => "internal",
                    CronMethod::External => "external",
                }
                .to_string(),
            ),
            frequency: Some(settings.frequency.to_string()),
            notify_to: Some(settings.notify_to.clone()),
            notify_from: Some(settings.notify_from.clone()),
            notify_to_name: Some(settings.notify_to_name.clone()),
            notify_plugins: Some(mode_code(settings.notify_plugins).to_string()),
            notify_themes: Some(mode_code(settings.notify_themes).to_string()),
            notify_automatic: Some(u8::from(settings.notify_automatic).to_string()),
            hide_updates: Some(u8::from(settings.hide_updates).to_string()),
            plugin_dedup: Some(dedup(settings.plugin_dedup).to_string()),
            theme_dedup: Some(dedup(settings.theme_dedup).to_string()),
        }
    }
}

/// Settings fields that can be rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingsField {
    CronMethod,
    Frequency,
    NotifyTo,
    NotifyFrom,
    NotifyToName,
    NotifyPlugins,
    NotifyThemes,
    NotifyAutomatic,
    HideUpdates,
    PluginDedup,
    ThemeDedup,
}

/// A rejected field and the message to show next to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: SettingsField,
    pub message: String,
}

impl FieldError {
    fn new(field: SettingsField, message: &str) -> Self {
        Self {
            field,
            message: message.to_string(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.field, self.message)
    }
}

/// Check whether `address` looks like a deliverable email address.
pub fn is_valid_email(address: &str) -> bool {
    address.len() >= 6 && email_regex().is_match(address)
}

/// Strip markup and control characters, collapse whitespace.
pub fn sanitize_text(value: &str) -> String {
    let without_tags = tag_regex().replace_all(value, "");
    without_tags
        .chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_flag(value: Option<&str>) -> Option<bool> {
    match value.map(str::trim) {
        None | Some("") | Some("0") | Some("false") => Some(false),
        Some("1") | Some("true") => Some(true),
        Some(_) => None,
    }
}

/// Validate `input` against `current`.
///
/// `intervals` is the list of supported interval names, including
/// [`Frequency::MANUAL`]. Returns the settings with every accepted field
/// applied and the list of rejected fields.
pub fn validate_settings(
    current: &Settings,
    input: &SettingsInput,
    intervals: &[String],
) -> (Settings, Vec<FieldError>) {
    let mut valid = current.clone();
    let mut errors = Vec::new();

    match input.cron_method.as_deref().and_then(CronMethod::from_input) {
        Some(method) => valid.cron_method = method,
        None => errors.push(FieldError::new(
            SettingsField::CronMethod,
            "Invalid cron method selected",
        )),
    }

    // External triggering never uses the internal schedule.
    let frequency = if valid.cron_method == CronMethod::External {
        Some(Frequency::MANUAL.to_string())
    } else {
        input.frequency.as_ref().map(|f| f.trim().to_string())
    };
    match frequency {
        Some(freq) if intervals.iter().any(|i| *i == freq) => {
            valid.frequency = Frequency::new(freq);
        }
        _ => errors.push(FieldError::new(
            SettingsField::Frequency,
            "Invalid frequency entered",
        )),
    }

    let notify_to = input.notify_to.as_deref().unwrap_or("").trim();
    if notify_to.is_empty() {
        errors.push(FieldError::new(
            SettingsField::NotifyTo,
            "No email to address entered",
        ));
    } else {
        let addresses: Vec<&str> = notify_to.split(',').map(str::trim).collect();
        if addresses.iter().all(|a| is_valid_email(a)) {
            valid.notify_to = addresses.join(",");
        } else {
            errors.push(FieldError::new(
                SettingsField::NotifyTo,
                "One or more email to addresses are invalid",
            ));
        }
    }

    let notify_from = input.notify_from.as_deref().unwrap_or("").trim();
    if is_valid_email(notify_from) {
        valid.notify_from = notify_from.to_string();
    } else {
        errors.push(FieldError::new(
            SettingsField::NotifyFrom,
            "Invalid email from entered",
        ));
    }

    let name = sanitize_text(input.notify_to_name.as_deref().unwrap_or(""));
    if name.is_empty() {
        errors.push(FieldError::new(
            SettingsField::NotifyToName,
            "Invalid recipient name",
        ));
    } else {
        valid.notify_to_name = name;
    }

    // An unchecked radio group submits nothing, which means "off".
    let mode = |value: &Option<String>| match value.as_deref() {
        None => Some(NotifyMode::Off),
        Some(v) => NotifyMode::from_input(v),
    };
    match mode(&input.notify_plugins) {
        Some(m) => valid.notify_plugins = m,
        None => errors.push(FieldError::new(
            SettingsField::NotifyPlugins,
            "Invalid plugin updates value entered",
        )),
    }
    match mode(&input.notify_themes) {
        Some(m) => valid.notify_themes = m,
        None => errors.push(FieldError::new(
            SettingsField::NotifyThemes,
            "Invalid theme updates value entered",
        )),
    }

    match parse_flag(input.notify_automatic.as_deref()) {
        Some(flag) => valid.notify_automatic = flag,
        None => errors.push(FieldError::new(
            SettingsField::NotifyAutomatic,
            "Invalid automatic updates value entered",
        )),
    }
    match parse_flag(input.hide_updates.as_deref()) {
        Some(flag) => valid.hide_updates = flag,
        None => errors.push(FieldError::new(
            SettingsField::HideUpdates,
            "Invalid hide updates value entered",
        )),
    }

    if let Some(raw) = &input.plugin_dedup {
        match DedupPolicy::from_input(raw) {
            Some(policy) => valid.plugin_dedup = policy,
            None => errors.push(FieldError::new(
                SettingsField::PluginDedup,
                "Invalid plugin dedup policy entered",
            )),
        }
    }
    if let Some(raw) = &input.theme_dedup {
        match DedupPolicy::from_input(raw) {
            Some(policy) => valid.theme_dedup = policy,
            None => errors.push(FieldError::new(
                SettingsField::ThemeDedup,
                "Invalid theme dedup policy entered",
            )),
        }
    }

    (valid, errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intervals() -> Vec<String> {
        ["hourly", "daily", "weekly", "manual"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn good_input() -> SettingsInput {
        SettingsInput {
            cron_method: Some("internal".into()),
            frequency: Some("daily".into()),
            notify_to: Some("ops@example.com, dev@example.org".into()),
            notify_from: Some("watcher@example.com".into()),
            notify_to_name: Some("Ops Team".into()),
            notify_plugins: Some("2".into()),
            notify_themes: Some("1".into()),
            notify_automatic: Some("1".into()),
            hide_updates: Some("0".into()),
            plugin_dedup: None,
            theme_dedup: None,
        }
    }

    #[test]
    fn test_valid_input_applied() {
        let current = Settings::default();
        let (valid, errors) = validate_settings(&current, &good_input(), &intervals());
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(valid.frequency.as_str(), "daily");
        assert_eq!(valid.notify_to, "ops@example.com,dev@example.org");
        assert_eq!(valid.notify_plugins, NotifyMode::ActiveOnly);
        assert!(!valid.hide_updates);
        assert_eq!(valid.notify_to_name, "Ops Team");
    }

    #[test]
    fn test_invalid_fields_rejected_independently() {
        let current = Settings::with_admin_email("admin@example.com");
        let mut input = good_input();
        input.frequency = Some("fortnightly".into());
        input.notify_to = Some("ops@example.com, not-an-address".into());

        let (valid, errors) = validate_settings(&current, &input, &intervals());
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec![SettingsField::Frequency, SettingsField::NotifyTo]);
        // Rejected fields keep their current values.
        assert_eq!(valid.frequency, current.frequency);
        assert_eq!(valid.notify_to, "admin@example.com");
        // Valid fields are still saved.
        assert_eq!(valid.notify_from, "watcher@example.com");
        assert_eq!(valid.notify_plugins, NotifyMode::ActiveOnly);
    }

    #[test]
    fn test_external_cron_forces_manual() {
        let mut input = good_input();
        input.cron_method = Some("other".into());
        let (valid, errors) = validate_settings(&Settings::default(), &input, &intervals());
        assert!(errors.is_empty());
        assert_eq!(valid.cron_method, CronMethod::External);
        assert!(valid.frequency.is_manual());
    }

    #[test]
    fn test_mode_out_of_range() {
        let mut input = good_input();
        input.notify_themes = Some("3".into());
        input.notify_plugins = None;
        let (valid, errors) = validate_settings(&Settings::default(), &input, &intervals());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, SettingsField::NotifyThemes);
        assert_eq!(valid.notify_plugins, NotifyMode::Off);
    }

    #[test]
    fn test_email_checks() {
        assert!(is_valid_email("someone@example.com"));
        assert!(is_valid_email("first.last+tag@sub.example.co"));
        assert!(!is_valid_email("someone@localhost"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("someone example.com"));
    }

    #[test]
    fn test_sanitize_text() {
        assert_eq!(sanitize_text("  <b>Sam</b>\n Smith "), "Sam Smith");
        assert_eq!(sanitize_text("<script></script>"), "");
    }

    #[test]
    fn test_round_trip_input_has_no_errors() {
        let mut settings = Settings::with_admin_email("admin@example.com");
        settings.notify_to_name = "Admin".into();
        let input = SettingsInput::from_settings(&settings);
        let (valid, errors) = validate_settings(&settings, &input, &intervals());
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(valid, settings);
    }
}
