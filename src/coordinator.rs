//! Scan orchestration.
//!
//! [`NotificationCoordinator`] owns the collaborators and runs every
//! settings read-modify-write under one lock: load the record once, let the
//! detector mutate its notified state, commit once.

use crate::mail::{MailTransport, OutgoingMail};
use crate::report::{DocumentReport, ReportRenderer};
use crate::schedule::{ScheduleController, ScheduleState};
use crate::trigger;
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use parking_lot::Mutex;
use std::sync::Arc;
use update_watcher_config::{
    CronMethod, FieldError, Settings, SettingsField, SettingsInput, SettingsStore, validate_settings,
};
use update_watcher_scan::{
    CandidateFilter, ComponentRegistry, ScanResult, UpdateDetector, UpdateMetadataProvider,
};

/// Response body of a successful on-demand check.
pub const ON_DEMAND_SUCCESS: &str = "Successfully checked for updates.";

/// Shown when a report was requested but nothing needs updating.
pub const NO_UPDATES: &str = "No updates available.";

/// Delivery status of the report email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailStatus {
    /// Nothing new to report
    NotNeeded,
    Sent,
    /// Delivery failed; notified state was still committed
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub result: ScanResult,
    pub message: String,
    pub mail: MailStatus,
}

#[derive(Debug, Clone)]
pub enum OnDemandOutcome {
    Checked(CheckOutcome),
    /// Wrong token, or external triggering is not enabled
    Rejected,
}

impl OnDemandOutcome {
    pub fn is_rejected(&self) -> bool {
        matches!(self, OnDemandOutcome::Rejected)
    }
}

/// The host's automatic core update email before it is sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutoUpdateEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub headers: Vec<String>,
}

pub struct NotificationCoordinator {
    store: SettingsStore,
    schedule: ScheduleController,
    provider: Arc<dyn UpdateMetadataProvider>,
    registry: Arc<dyn ComponentRegistry>,
    mailer: Arc<dyn MailTransport>,
    renderer: ReportRenderer,
    platform_name: String,
    sender_name: String,
    filters: Vec<Box<dyn CandidateFilter>>,
    scan_lock: Mutex<()>,
}

impl NotificationCoordinator {
    pub fn new(
        store: SettingsStore,
        schedule: ScheduleController,
        provider: Arc<dyn UpdateMetadataProvider>,
        registry: Arc<dyn ComponentRegistry>,
        mailer: Arc<dyn MailTransport>,
        renderer: ReportRenderer,
    ) -> Self {
        Self {
            store,
            schedule,
            provider,
            registry,
            mailer,
            sender_name: renderer.sender_name().to_string(),
            renderer,
            platform_name: update_watcher_config::defaults::platform_name(),
            filters: Vec::new(),
            scan_lock: Mutex::new(()),
        }
    }

    pub fn with_platform_name(mut self, name: impl Into<String>) -> Self {
        self.platform_name = name.into();
        self
    }

    /// Register a candidate filter applied to plugin and theme candidates.
    pub fn with_filter(mut self, filter: Box<dyn CandidateFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn schedule(&self) -> &ScheduleController {
        &self.schedule
    }

    /// Migrate the stored record if its schema is stale, then load it.
    /// Caller holds the scan lock.
    fn load(&self) -> Result<Settings> {
        if self
            .store
            .ensure_current()
            .context("Failed to migrate settings")?
        {
            log::info!("Settings migrated to the current schema");
        }
        self.store.get().context("Failed to load settings")
    }

    fn commit(&self, settings: &Settings) -> Result<()> {
        self.store.put(settings).context("Failed to save settings")
    }

    /// One pass over core, plugins and themes. Caller holds the scan lock.
    fn scan(&self, settings: &mut Settings, ignore_mode_settings: bool) -> ScanResult {
        let detector = UpdateDetector::new(
            self.provider.as_ref(),
            self.registry.as_ref(),
            &self.platform_name,
        )
        .with_filters(&self.filters);

        let (plugin_mode, theme_mode) = if ignore_mode_settings {
            (settings.notify_plugins.forced(), settings.notify_themes.forced())
        } else {
            (settings.notify_plugins, settings.notify_themes)
        };

        let mut notices = Vec::new();
        let notified = &mut settings.notified;
        let core_updated = detector.check_core(notified, &mut notices);
        let plugins_updated =
            detector.check_plugins(plugin_mode, settings.plugin_dedup, notified, &mut notices);
        let themes_updated =
            detector.check_themes(theme_mode, settings.theme_dedup, notified, &mut notices);

        ScanResult {
            core_updated,
            plugins_updated,
            themes_updated,
            notices,
        }
    }

    /// Scan and commit the resulting notified state.
    ///
    /// With `ignore_mode_settings`, plugin and theme kinds switched off are
    /// checked as if set to all.
    pub fn run_scan(&self, ignore_mode_settings: bool) -> Result<(ScanResult, String)> {
        let _guard = self.scan_lock.lock();
        let mut settings = self.load()?;
        let result = self.scan(&mut settings, ignore_mode_settings);
        self.commit(&settings)?;
        let message = result.message();
        Ok((result, message))
    }

    /// Scheduled check: scan, email when something new was found, stamp the
    /// check time and commit once.
    pub fn perform_scheduled_check(&self) -> Result<CheckOutcome> {
        let _guard = self.scan_lock.lock();
        self.scheduled_check_locked()
    }

    fn scheduled_check_locked(&self) -> Result<CheckOutcome> {
        let mut settings = self.load()?;
        let result = self.scan(&mut settings, false);
        let message = result.message();

        let mail = if result.any_updated() {
            let email = self.renderer.email(&settings, &result);
            self.dispatch(&email)
        } else {
            log::info!("No new updates to report");
            MailStatus::NotNeeded
        };

        settings.mark_checked();
        self.commit(&settings)?;
        Ok(CheckOutcome {
            result,
            message,
            mail,
        })
    }

    fn dispatch(&self, email: &OutgoingMail) -> MailStatus {
        if email.to.is_empty() {
            log::error!("Update report not sent: no recipients configured");
            return MailStatus::Failed("no recipients configured".to_string());
        }
        match self.mailer.send(email) {
            Ok(()) => MailStatus::Sent,
            Err(e) => {
                log::error!("Failed to send update report: {}", e);
                MailStatus::Failed(e.to_string())
            }
        }
    }

    /// Externally triggered check authenticated by the security key.
    pub fn perform_on_demand_check(&self, token: Option<&str>) -> Result<OnDemandOutcome> {
        let _guard = self.scan_lock.lock();
        let settings = self.load()?;

        let authorized = settings.cron_method == CronMethod::External
            && token.is_some_and(|t| trigger::tokens_match(&settings.security_key, t));
        if !authorized {
            log::warn!("Rejected on-demand update check");
            return Ok(OnDemandOutcome::Rejected);
        }

        let outcome = self.scheduled_check_locked()?;
        log::info!("{}", ON_DEMAND_SUCCESS);
        Ok(OnDemandOutcome::Checked(outcome))
    }

    /// Every pending update regardless of plugin/theme mode, as plain text.
    pub fn preview_all_updates(&self) -> Result<String> {
        let (_, message) = self.run_scan(true)?;
        Ok(message)
    }

    /// HTML report of every pending update, or `None` when nothing needs
    /// updating.
    pub fn download_report(&self, now: NaiveDateTime) -> Result<Option<DocumentReport>> {
        let _guard = self.scan_lock.lock();
        let mut settings = self.load()?;
        let result = self.scan(&mut settings, true);
        self.commit(&settings)?;

        if !result.any_updated() {
            log::info!("{}", NO_UPDATES);
            return Ok(None);
        }
        Ok(Some(self.renderer.document(&settings, &result, now)))
    }

    pub fn settings(&self) -> Result<Settings> {
        let _guard = self.scan_lock.lock();
        self.load()
    }

    /// Validate and apply submitted settings, keeping the schedule in line
    /// with the accepted frequency. Returns the rejected fields.
    pub fn save_settings(&self, input: &SettingsInput) -> Result<Vec<FieldError>> {
        let _guard = self.scan_lock.lock();
        let current = self.load()?;
        let intervals = self.schedule.interval_names();
        let (settings, errors) = validate_settings(&current, input, &intervals);

        for error in &errors {
            log::warn!("Settings field rejected: {}", error);
        }

        if !errors.iter().any(|e| e.field == SettingsField::Frequency) {
            self.schedule
                .enable(&settings, Some(settings.frequency.as_str()))
                .context("Failed to update the check schedule")?;
        }

        self.commit(&settings)?;
        Ok(errors)
    }

    /// First-run setup: migrate the stored record and install the trigger.
    pub fn activate(&self) -> Result<ScheduleState> {
        let _guard = self.scan_lock.lock();
        let settings = self.load()?;
        // Persist first-run defaults (including the generated security key).
        self.commit(&settings)?;
        self.schedule
            .activate(&settings)
            .context("Failed to schedule update checks")
    }

    pub fn deactivate(&self) -> Result<()> {
        self.schedule
            .deactivate()
            .context("Failed to unschedule update checks")
    }

    /// Remove the trigger and every stored key.
    pub fn uninstall(&self) -> Result<()> {
        let _guard = self.scan_lock.lock();
        self.deactivate()?;
        self.store.uninstall().context("Failed to remove settings")
    }

    /// Redirect the host's automatic core update email to the configured
    /// recipients and sender.
    pub fn filter_auto_core_update_email(
        &self,
        mut email: AutoUpdateEmail,
    ) -> Result<AutoUpdateEmail> {
        let settings = self.settings()?;
        if !settings.notify_automatic {
            return Ok(email);
        }
        if !settings.notify_to.trim().is_empty() {
            email.to = settings.notify_to.clone();
        }
        if !settings.notify_from.trim().is_empty() {
            email.headers.push(format!(
                "From: {} <{}>",
                self.sender_name, settings.notify_from
            ));
        }
        Ok(email)
    }

    /// Whether the core update notice should be hidden from this user.
    pub fn should_hide_update_notice(&self, user_can_update: bool) -> Result<bool> {
        Ok(self.settings()?.hide_updates && !user_can_update)
    }

    /// Command an external scheduler should run against `base_url`.
    pub fn external_trigger_command(&self, base_url: &str) -> Result<String> {
        let settings = self.settings()?;
        Ok(trigger::external_trigger_command(
            base_url,
            &settings.security_key,
        ))
    }
}
