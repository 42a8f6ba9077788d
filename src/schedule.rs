//! Periodic trigger management.
//!
//! [`ScheduleController`] keeps the host's periodic trigger consistent with
//! the configured frequency. The trigger primitive itself sits behind
//! [`TriggerScheduler`]; [`LocalScheduler`] implements it on a
//! [`KeyValueStore`] for the standalone `watch` loop.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use update_watcher_config::{ConfigError, Frequency, KeyValueStore, Settings};

/// Name of the periodic hook that runs a scheduled check.
pub const CHECK_HOOK: &str = "update_watcher_check";

/// Store key holding [`LocalScheduler`] state.
pub const CRON_KEY: &str = "update_watcher_cron";

const HOUR: u64 = 60 * 60;
const DAY: u64 = 24 * HOUR;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("Invalid frequency '{0}'")]
    InvalidInterval(String),

    #[error("Scheduler state unavailable: {0}")]
    Store(#[from] ConfigError),
}

/// A named recurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub name: String,
    pub seconds: u64,
    pub display: String,
}

impl Interval {
    pub fn new(name: &str, seconds: u64, display: &str) -> Self {
        Self {
            name: name.to_string(),
            seconds,
            display: display.to_string(),
        }
    }

    /// Thirty days, registered when the host has no monthly interval.
    pub fn monthly() -> Self {
        Self::new("monthly", 30 * DAY, "Once Monthly")
    }

    /// Pseudo-interval meaning "no periodic trigger".
    pub fn manual() -> Self {
        Self::new(Frequency::MANUAL, 0, "Manual")
    }
}

/// Host trigger primitive.
pub trait TriggerScheduler: Send + Sync {
    /// Install `hook` to fire every `interval`, first at `first_run`.
    fn schedule(
        &self,
        hook: &str,
        interval: &Interval,
        first_run: DateTime<Utc>,
    ) -> Result<(), ScheduleError>;

    /// Remove `hook`. Removing an absent hook is not an error.
    fn unschedule(&self, hook: &str) -> Result<(), ScheduleError>;

    /// Interval name `hook` is scheduled at, if any.
    fn current_schedule(&self, hook: &str) -> Result<Option<String>, ScheduleError>;

    /// Intervals the host provides.
    fn intervals(&self) -> Vec<Interval>;
}

/// Observable trigger state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleState {
    Disabled,
    ScheduledAt(String),
}

pub struct ScheduleController {
    scheduler: Arc<dyn TriggerScheduler>,
}

impl ScheduleController {
    pub fn new(scheduler: Arc<dyn TriggerScheduler>) -> Self {
        Self { scheduler }
    }

    /// Host intervals plus `monthly`, ordered by duration, then `manual`.
    pub fn supported_intervals(&self) -> Vec<Interval> {
        let mut intervals = self.scheduler.intervals();
        if !intervals.iter().any(|i| i.name == "monthly") {
            intervals.push(Interval::monthly());
        }
        intervals.sort_by_key(|i| i.seconds);
        intervals.push(Interval::manual());
        intervals
    }

    /// Names accepted by settings validation.
    pub fn interval_names(&self) -> Vec<String> {
        self.supported_intervals()
            .into_iter()
            .map(|i| i.name)
            .collect()
    }

    pub fn state(&self) -> Result<ScheduleState, ScheduleError> {
        Ok(match self.scheduler.current_schedule(CHECK_HOOK)? {
            Some(name) => ScheduleState::ScheduledAt(name),
            None => ScheduleState::Disabled,
        })
    }

    /// Bring the trigger in line with `requested` (or the stored frequency).
    pub fn enable(
        &self,
        settings: &Settings,
        requested: Option<&str>,
    ) -> Result<ScheduleState, ScheduleError> {
        let effective = requested.unwrap_or(settings.frequency.as_str());

        if effective == Frequency::MANUAL {
            self.disable()?;
            return Ok(ScheduleState::Disabled);
        }

        if self.scheduler.current_schedule(CHECK_HOOK)?.as_deref() == Some(effective) {
            log::debug!("Update check already scheduled {}", effective);
            return Ok(ScheduleState::ScheduledAt(effective.to_string()));
        }

        let interval = self
            .supported_intervals()
            .into_iter()
            .find(|i| i.name == effective && i.name != Frequency::MANUAL)
            .ok_or_else(|| ScheduleError::InvalidInterval(effective.to_string()))?;

        self.scheduler.unschedule(CHECK_HOOK)?;
        self.scheduler.schedule(CHECK_HOOK, &interval, Utc::now())?;
        log::info!("Scheduled update check: {}", interval.display);
        Ok(ScheduleState::ScheduledAt(interval.name))
    }

    pub fn disable(&self) -> Result<(), ScheduleError> {
        self.scheduler.unschedule(CHECK_HOOK)?;
        log::debug!("Update check unscheduled");
        Ok(())
    }

    pub fn activate(&self, settings: &Settings) -> Result<ScheduleState, ScheduleError> {
        self.enable(settings, None)
    }

    pub fn deactivate(&self) -> Result<(), ScheduleError> {
        self.disable()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ScheduledHook {
    interval: String,
    seconds: u64,
    next_run: DateTime<Utc>,
}

/// Trigger scheduler persisted in a [`KeyValueStore`].
pub struct LocalScheduler {
    kv: Arc<dyn KeyValueStore>,
    intervals: Vec<Interval>,
}

impl LocalScheduler {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            intervals: vec![
                Interval::new("hourly", HOUR, "Once Hourly"),
                Interval::new("twicedaily", 12 * HOUR, "Twice Daily"),
                Interval::new("daily", DAY, "Once Daily"),
                Interval::new("weekly", 7 * DAY, "Once Weekly"),
            ],
        }
    }

    fn load(&self) -> Result<BTreeMap<String, ScheduledHook>, ScheduleError> {
        match self.kv.get(CRON_KEY)? {
            Some(value) => match serde_json::from_value(value) {
                Ok(hooks) => Ok(hooks),
                Err(e) => {
                    log::warn!("Discarding unreadable scheduler state: {}", e);
                    Ok(BTreeMap::new())
                }
            },
            None => Ok(BTreeMap::new()),
        }
    }

    fn store(&self, hooks: &BTreeMap<String, ScheduledHook>) -> Result<(), ScheduleError> {
        if hooks.is_empty() {
            self.kv.delete(CRON_KEY)?;
        } else {
            let value = serde_json::to_value(hooks).map_err(ConfigError::from)?;
            self.kv.put(CRON_KEY, value)?;
        }
        Ok(())
    }

    /// Hooks whose next run is at or before `now`.
    pub fn due_hooks(&self, now: DateTime<Utc>) -> Result<Vec<String>, ScheduleError> {
        Ok(self
            .load()?
            .into_iter()
            .filter(|(_, h)| h.next_run <= now)
            .map(|(name, _)| name)
            .collect())
    }

    /// Advance `hook` to its next run after `now`.
    pub fn mark_ran(&self, hook: &str, now: DateTime<Utc>) -> Result<(), ScheduleError> {
        let mut hooks = self.load()?;
        if let Some(entry) = hooks.get_mut(hook) {
            entry.next_run = now + Duration::seconds(entry.seconds as i64);
            self.store(&hooks)?;
        }
        Ok(())
    }

    /// Earliest pending run across all hooks.
    pub fn next_run(&self) -> Result<Option<DateTime<Utc>>, ScheduleError> {
        Ok(self.load()?.values().map(|h| h.next_run).min())
    }
}

impl TriggerScheduler for LocalScheduler {
    fn schedule(
        &self,
        hook: &str,
        interval: &Interval,
        first_run: DateTime<Utc>,
    ) -> Result<(), ScheduleError> {
        let mut hooks = self.load()?;
        hooks.insert(
            hook.to_string(),
            ScheduledHook {
                interval: interval.name.clone(),
                seconds: interval.seconds,
                next_run: first_run,
            },
        );
        self.store(&hooks)
    }

    fn unschedule(&self, hook: &str) -> Result<(), ScheduleError> {
        let mut hooks = self.load()?;
        if hooks.remove(hook).is_some() {
            self.store(&hooks)?;
        }
        Ok(())
    }

    fn current_schedule(&self, hook: &str) -> Result<Option<String>, ScheduleError> {
        Ok(self.load()?.remove(hook).map(|h| h.interval))
    }

    fn intervals(&self) -> Vec<Interval> {
        self.intervals.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use update_watcher_config::MemoryStore;

    fn controller() -> (ScheduleController, Arc<LocalScheduler>) {
        let scheduler = Arc::new(LocalScheduler::new(Arc::new(MemoryStore::new())));
        (ScheduleController::new(scheduler.clone()), scheduler)
    }

    #[test]
    fn test_supported_intervals_order() {
        let (controller, _) = controller();
        assert_eq!(
            controller.interval_names(),
            vec!["hourly", "twicedaily", "daily", "weekly", "monthly", "manual"]
        );
    }

    #[test]
    fn test_enable_and_manual() {
        let (controller, _) = controller();
        let settings = Settings::default();
        assert_eq!(
            controller.enable(&settings, None).unwrap(),
            ScheduleState::ScheduledAt("hourly".into())
        );
        assert_eq!(
            controller.enable(&settings, Some("weekly")).unwrap(),
            ScheduleState::ScheduledAt("weekly".into())
        );
        controller.enable(&settings, Some("manual")).unwrap();
        assert_eq!(controller.state().unwrap(), ScheduleState::Disabled);
    }

    #[test]
    fn test_invalid_interval_leaves_trigger() {
        let (controller, _) = controller();
        let settings = Settings::default();
        controller.enable(&settings, Some("daily")).unwrap();
        let err = controller.enable(&settings, Some("fortnightly")).unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidInterval(ref name) if name == "fortnightly"));
        assert_eq!(
            controller.state().unwrap(),
            ScheduleState::ScheduledAt("daily".into())
        );
    }

    #[test]
    fn test_due_and_mark_ran() {
        let (controller, scheduler) = controller();
        controller.enable(&Settings::default(), Some("daily")).unwrap();

        let now = Utc::now() + Duration::seconds(1);
        assert_eq!(scheduler.due_hooks(now).unwrap(), vec![CHECK_HOOK.to_string()]);
        scheduler.mark_ran(CHECK_HOOK, now).unwrap();
        assert!(scheduler.due_hooks(now).unwrap().is_empty());
        assert_eq!(
            scheduler.next_run().unwrap(),
            Some(now + Duration::seconds(DAY as i64))
        );
    }

    #[test]
    fn test_disable_is_idempotent() {
        let (controller, _) = controller();
        controller.disable().unwrap();
        controller.disable().unwrap();
        assert_eq!(controller.state().unwrap(), ScheduleState::Disabled);
    }
}
