//! Shared integration test helpers for update-watcher.
//!
//! Fakes for every collaborator the coordinator talks to, plus a
//! [`Harness`] that wires them to an in-memory settings store.
//!
//! # Usage
//!
//! ```ignore
//! mod common;
//! use common::{Harness, plugin_update};
//! ```
//!
//! The `#[allow(dead_code)]` attribute suppresses warnings when only a
//! subset of helpers are used per file.

#![allow(dead_code)]

use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use update_watcher::{
    Interval, MailError, MailTransport, NotificationCoordinator, OutgoingMail, ReportRenderer,
    ScheduleController, ScheduleError, TriggerScheduler,
};
use update_watcher_config::{Branding, CronMethod, MemoryStore, Settings, SettingsStore};
use update_watcher_scan::{
    Candidates, ComponentRegistry, ComponentUpdate, CoreUpdate, InstalledComponent,
    MetadataError, UpdateMetadataProvider,
};

pub const ADMIN: &str = "admin@example.com";

/// Candidate entry for a plugin or theme.
pub fn plugin_update(version: &str) -> ComponentUpdate {
    ComponentUpdate {
        new_version: version.to_string(),
        url: "https://plugins.example.org/foo/".to_string(),
        ..ComponentUpdate::default()
    }
}

pub fn candidates(entries: &[(&str, &str)]) -> Candidates {
    entries
        .iter()
        .map(|(id, v)| (id.to_string(), plugin_update(v)))
        .collect()
}

/// Update metadata provider whose answers are set by the test.
#[derive(Default)]
pub struct FakeProvider {
    core: Mutex<CoreUpdate>,
    plugins: Mutex<Candidates>,
    themes: Mutex<Candidates>,
    failing: AtomicBool,
    pub core_queries: AtomicUsize,
    pub plugin_queries: AtomicUsize,
    pub theme_queries: AtomicUsize,
}

impl FakeProvider {
    pub fn set_core(&self, current: &str, new: &str) {
        *self.core.lock() = CoreUpdate {
            available: true,
            current_version: current.to_string(),
            new_version: new.to_string(),
        };
    }

    pub fn clear_core(&self) {
        *self.core.lock() = CoreUpdate::default();
    }

    pub fn set_plugins(&self, entries: &[(&str, &str)]) {
        *self.plugins.lock() = candidates(entries);
    }

    pub fn set_themes(&self, entries: &[(&str, &str)]) {
        *self.themes.lock() = candidates(entries);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn total_queries(&self) -> usize {
        self.core_queries.load(Ordering::SeqCst)
            + self.plugin_queries.load(Ordering::SeqCst)
            + self.theme_queries.load(Ordering::SeqCst)
    }

    fn answer<T: Clone>(&self, counter: &AtomicUsize, value: &Mutex<T>) -> Result<T, MetadataError> {
        counter.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(MetadataError::Http("connection refused".to_string()));
        }
        Ok(value.lock().clone())
    }
}

impl UpdateMetadataProvider for FakeProvider {
    fn core_update(&self) -> Result<CoreUpdate, MetadataError> {
        self.answer(&self.core_queries, &self.core)
    }

    fn plugin_updates(&self) -> Result<Candidates, MetadataError> {
        self.answer(&self.plugin_queries, &self.plugins)
    }

    fn theme_updates(&self) -> Result<Candidates, MetadataError> {
        self.answer(&self.theme_queries, &self.themes)
    }
}

/// Installed site: core 5.0, plugins `foo` (active) and `bar`, themes
/// `classic` (active) and `modern`.
pub struct FakeRegistry {
    pub core_version: String,
}

impl Default for FakeRegistry {
    fn default() -> Self {
        Self {
            core_version: "5.0".to_string(),
        }
    }
}

impl ComponentRegistry for FakeRegistry {
    fn core_version(&self) -> String {
        self.core_version.clone()
    }

    fn active_plugins(&self) -> BTreeSet<String> {
        ["foo".to_string()].into_iter().collect()
    }

    fn active_theme(&self) -> Option<String> {
        Some("classic".to_string())
    }

    fn plugin_info(&self, id: &str) -> Option<InstalledComponent> {
        let name = match id {
            "foo" => "Foo",
            "bar" => "Bar",
            _ => return None,
        };
        Some(InstalledComponent {
            name: name.to_string(),
            version: "1.0".to_string(),
        })
    }

    fn theme_info(&self, id: &str) -> Option<InstalledComponent> {
        let name = match id {
            "classic" => "Classic",
            "modern" => "Modern",
            _ => return None,
        };
        Some(InstalledComponent {
            name: name.to_string(),
            version: "1.0".to_string(),
        })
    }
}

/// Trigger scheduler that records every call.
#[derive(Default)]
pub struct RecordingScheduler {
    current: Mutex<Option<String>>,
    pub schedule_calls: AtomicUsize,
    pub unschedule_calls: AtomicUsize,
}

impl RecordingScheduler {
    pub fn schedules(&self) -> usize {
        self.schedule_calls.load(Ordering::SeqCst)
    }

    pub fn current(&self) -> Option<String> {
        self.current.lock().clone()
    }
}

impl TriggerScheduler for RecordingScheduler {
    fn schedule(
        &self,
        _hook: &str,
        interval: &Interval,
        _first_run: DateTime<Utc>,
    ) -> Result<(), ScheduleError> {
        self.schedule_calls.fetch_add(1, Ordering::SeqCst);
        *self.current.lock() = Some(interval.name.clone());
        Ok(())
    }

    fn unschedule(&self, _hook: &str) -> Result<(), ScheduleError> {
        self.unschedule_calls.fetch_add(1, Ordering::SeqCst);
        *self.current.lock() = None;
        Ok(())
    }

    fn current_schedule(&self, _hook: &str) -> Result<Option<String>, ScheduleError> {
        Ok(self.current.lock().clone())
    }

    fn intervals(&self) -> Vec<Interval> {
        vec![
            Interval::new("weekly", 7 * 86_400, "Once Weekly"),
            Interval::new("hourly", 3_600, "Once Hourly"),
            Interval::new("daily", 86_400, "Once Daily"),
        ]
    }
}

/// Mail transport that keeps sent mail, or fails every send.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<OutgoingMail>>,
    failing: AtomicBool,
}

impl RecordingMailer {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn last(&self) -> Option<OutgoingMail> {
        self.sent.lock().last().cloned()
    }
}

impl MailTransport for RecordingMailer {
    fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(MailError::InvalidAddress("relay refused".to_string()));
        }
        self.sent.lock().push(mail.clone());
        Ok(())
    }
}

/// Coordinator wired to fakes and an in-memory store.
pub struct Harness {
    pub coordinator: NotificationCoordinator,
    pub provider: Arc<FakeProvider>,
    pub scheduler: Arc<RecordingScheduler>,
    pub mailer: Arc<RecordingMailer>,
    pub kv: Arc<MemoryStore>,
    pub store: SettingsStore,
}

impl Harness {
    pub fn new() -> Self {
        let provider = Arc::new(FakeProvider::default());
        let scheduler = Arc::new(RecordingScheduler::default());
        let mailer = Arc::new(RecordingMailer::default());
        let kv = Arc::new(MemoryStore::new());
        let defaults = Settings::with_admin_email(ADMIN);

        let coordinator = NotificationCoordinator::new(
            SettingsStore::new(kv.clone(), defaults.clone()),
            ScheduleController::new(scheduler.clone()),
            provider.clone(),
            Arc::new(FakeRegistry::default()),
            mailer.clone(),
            ReportRenderer::new(Branding::default()),
        );

        Self {
            coordinator,
            provider,
            scheduler,
            mailer,
            store: SettingsStore::new(kv.clone(), defaults),
            kv,
        }
    }

    /// Harness whose stored settings accept external triggers.
    pub fn external() -> Self {
        let harness = Self::new();
        harness.update_settings(|s| s.cron_method = CronMethod::External);
        harness
    }

    pub fn settings(&self) -> Settings {
        self.store.get().expect("settings load")
    }

    pub fn update_settings(&self, change: impl FnOnce(&mut Settings)) {
        let mut settings = self.settings();
        change(&mut settings);
        self.store.put(&settings).expect("settings save");
    }
}
