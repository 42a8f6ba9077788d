//! Update detection and notification dedup.
//!
//! Each check compares what the provider offers with what
//! [`NotifiedState`] says was already reported, appends notices for anything
//! new and records the reported versions. The caller owns the settings
//! aggregate and commits it once the whole scan is done.
//!
//! Kind-specific rules:
//! - Core is deduplicated against `notified.core` and cleared whenever no
//!   update is pending.
//! - Plugins and themes share one loop. Their dedup depends on the kind's
//!   [`DedupPolicy`]: `Once` suppresses an already reported version,
//!   `EveryScan` reports it again. The whole map is reset when the provider
//!   reports no candidates at all.
//! - A metadata fetch failure means "no information": the check reports
//!   nothing and leaves the stored state untouched.

use crate::filter::{CandidateFilter, ExtensionKind, SkipNotified};
use crate::notice::{
    Compatibility, CompatibilityEstimate, ComponentKind, PluginLinks, UpdateNotice,
};
use crate::provider::{ComponentRegistry, ComponentUpdate, UpdateMetadataProvider};
use crate::version;
use std::collections::BTreeSet;
use update_watcher_config::{DedupPolicy, NotifiedState, NotifyMode};

/// Detector for one scan.
pub struct UpdateDetector<'a> {
    provider: &'a dyn UpdateMetadataProvider,
    registry: &'a dyn ComponentRegistry,
    platform_name: &'a str,
    filters: &'a [Box<dyn CandidateFilter>],
}

impl<'a> UpdateDetector<'a> {
    pub fn new(
        provider: &'a dyn UpdateMetadataProvider,
        registry: &'a dyn ComponentRegistry,
        platform_name: &'a str,
    ) -> Self {
        Self {
            provider,
            registry,
            platform_name,
            filters: &[],
        }
    }

    /// Register extra candidate filters, applied before notified-version dedup.
    pub fn with_filters(mut self, filters: &'a [Box<dyn CandidateFilter>]) -> Self {
        self.filters = filters;
        self
    }

    /// Check the core platform. Returns `true` when a new notice was added.
    pub fn check_core(&self, notified: &mut NotifiedState, notices: &mut Vec<UpdateNotice>) -> bool {
        let update = match self.provider.core_update() {
            Ok(update) => update,
            Err(e) => {
                log::warn!("Core update check skipped: {e}");
                return false;
            }
        };

        if !update.available {
            if !notified.core.is_empty() {
                log::debug!("Core is up to date; clearing notified version {}", notified.core);
            }
            notified.core.clear();
            return false;
        }

        if update.new_version == notified.core {
            log::debug!("Core update {} already reported", update.new_version);
            return false;
        }

        let old_version = if update.current_version.is_empty() {
            self.registry.core_version()
        } else {
            update.current_version.clone()
        };
        log::info!("Core update available: {} -> {}", old_version, update.new_version);

        notices.push(UpdateNotice {
            kind: ComponentKind::Core,
            id: self.platform_name.to_string(),
            name: self.platform_name.to_string(),
            old_version,
            new_version: update.new_version.clone(),
            links: None,
            compatibility: None,
        });
        notified.core = update.new_version;
        true
    }

    /// Check plugins under `mode`. Returns `true` when new notices were added.
    pub fn check_plugins(
        &self,
        mode: NotifyMode,
        policy: DedupPolicy,
        notified: &mut NotifiedState,
        notices: &mut Vec<UpdateNotice>,
    ) -> bool {
        self.check_extensions(ExtensionKind::Plugin, mode, policy, notified, notices)
    }

    /// Check themes under `mode`. Returns `true` when new notices were added.
    pub fn check_themes(
        &self,
        mode: NotifyMode,
        policy: DedupPolicy,
        notified: &mut NotifiedState,
        notices: &mut Vec<UpdateNotice>,
    ) -> bool {
        self.check_extensions(ExtensionKind::Theme, mode, policy, notified, notices)
    }

    fn check_extensions(
        &self,
        kind: ExtensionKind,
        mode: NotifyMode,
        policy: DedupPolicy,
        notified: &mut NotifiedState,
        notices: &mut Vec<UpdateNotice>,
    ) -> bool {
        if !mode.is_enabled() {
            return false;
        }

        let fetched = match kind {
            ExtensionKind::Plugin => self.provider.plugin_updates(),
            ExtensionKind::Theme => self.provider.theme_updates(),
        };
        let mut candidates = match fetched {
            Ok(candidates) => candidates,
            Err(e) => {
                log::warn!("{:?} update check skipped: {e}", kind);
                return false;
            }
        };

        let recorded = match kind {
            ExtensionKind::Plugin => &mut notified.plugin,
            ExtensionKind::Theme => &mut notified.theme,
        };

        if candidates.is_empty() {
            if !recorded.is_empty() {
                log::debug!("No {:?} updates pending; clearing notified versions", kind);
                recorded.clear();
            }
            return false;
        }

        if mode == NotifyMode::ActiveOnly {
            let active = self.active_ids(kind);
            candidates.retain(|id, _| active.contains(id));
        }

        for filter in self.filters {
            candidates = filter.filter(kind, candidates, recorded);
        }
        if policy == DedupPolicy::Once {
            candidates = SkipNotified.filter(kind, candidates, recorded);
        }

        if candidates.is_empty() {
            return false;
        }

        for (id, update) in candidates {
            let notice = self.build_notice(kind, &id, &update);
            log::info!(
                "{:?} update available: {} {} -> {}",
                kind,
                notice.name,
                notice.old_version,
                notice.new_version
            );
            notices.push(notice);
            recorded.insert(id, update.new_version);
        }
        true
    }

    fn active_ids(&self, kind: ExtensionKind) -> BTreeSet<String> {
        match kind {
            ExtensionKind::Plugin => self.registry.active_plugins(),
            ExtensionKind::Theme => self.registry.active_theme().into_iter().collect(),
        }
    }

    fn build_notice(&self, kind: ExtensionKind, id: &str, update: &ComponentUpdate) -> UpdateNotice {
        let installed = match kind {
            ExtensionKind::Plugin => self.registry.plugin_info(id),
            ExtensionKind::Theme => self.registry.theme_info(id),
        };
        let (name, old_version) = match installed {
            Some(info) => (info.name, info.version),
            None => (id.to_string(), "unknown".to_string()),
        };

        match kind {
            ExtensionKind::Plugin => UpdateNotice {
                kind: ComponentKind::Plugin,
                id: id.to_string(),
                name,
                old_version,
                new_version: update.new_version.clone(),
                links: Some(PluginLinks {
                    details: update.url.clone(),
                    changelog: format!("{}changelog/", update.url),
                }),
                compatibility: Some(self.plugin_compatibility(update)),
            },
            ExtensionKind::Theme => UpdateNotice {
                kind: ComponentKind::Theme,
                id: id.to_string(),
                name,
                old_version,
                new_version: update.new_version.clone(),
                links: None,
                compatibility: None,
            },
        }
    }

    /// Estimate compatibility of a plugin release with the running core.
    pub fn plugin_compatibility(&self, update: &ComponentUpdate) -> Compatibility {
        let core_version = self.registry.core_version();

        if let Some(tested) = &update.tested {
            if version::at_least(tested, &core_version) {
                return Compatibility {
                    platform: self.platform_name.to_string(),
                    core_version: version::strip_suffix(&core_version).to_string(),
                    estimate: CompatibilityEstimate::AuthorAsserted,
                };
            }
        }

        let votes = update
            .compatibility
            .get(&core_version)
            .and_then(|by_release| by_release.get(&update.new_version));
        let estimate = match votes {
            Some(votes) => CompatibilityEstimate::Votes {
                percent: votes.percent,
                works: votes.works,
                total: votes.total,
            },
            None => CompatibilityEstimate::Unknown,
        };
        Compatibility {
            platform: self.platform_name.to_string(),
            core_version,
            estimate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MetadataError;
    use crate::provider::{Candidates, CompatibilityVotes, CoreUpdate, InstalledComponent};
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeProvider {
        core: CoreUpdate,
        plugins: Candidates,
        themes: Candidates,
        fail: bool,
        plugin_queries: AtomicUsize,
    }

    impl UpdateMetadataProvider for FakeProvider {
        fn core_update(&self) -> Result<CoreUpdate, MetadataError> {
            if self.fail {
                return Err(MetadataError::Http("offline".into()));
            }
            Ok(self.core.clone())
        }

        fn plugin_updates(&self) -> Result<Candidates, MetadataError> {
            self.plugin_queries.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(MetadataError::Http("offline".into()));
            }
            Ok(self.plugins.clone())
        }

        fn theme_updates(&self) -> Result<Candidates, MetadataError> {
            if self.fail {
                return Err(MetadataError::Http("offline".into()));
            }
            Ok(self.themes.clone())
        }
    }

    struct FakeRegistry;

    impl ComponentRegistry for FakeRegistry {
        fn core_version(&self) -> String {
            "6.4".into()
        }

        fn active_plugins(&self) -> BTreeSet<String> {
            ["foo".to_string()].into_iter().collect()
        }

        fn active_theme(&self) -> Option<String> {
            Some("twentytwenty".into())
        }

        fn plugin_info(&self, id: &str) -> Option<InstalledComponent> {
            (id == "foo").then(|| InstalledComponent {
                name: "Foo".into(),
                version: "1.0".into(),
            })
        }

        fn theme_info(&self, _id: &str) -> Option<InstalledComponent> {
            None
        }
    }

    fn update(version: &str) -> ComponentUpdate {
        ComponentUpdate {
            new_version: version.into(),
            url: "https://plugins.example.org/foo/".into(),
            ..ComponentUpdate::default()
        }
    }

    #[test]
    fn test_core_fetch_failure_keeps_state() {
        let provider = FakeProvider {
            fail: true,
            ..FakeProvider::default()
        };
        let detector = UpdateDetector::new(&provider, &FakeRegistry, "WordPress");
        let mut notified = NotifiedState {
            core: "6.5".into(),
            ..NotifiedState::default()
        };
        let mut notices = Vec::new();
        assert!(!detector.check_core(&mut notified, &mut notices));
        assert_eq!(notified.core, "6.5");
        assert!(notices.is_empty());
    }

    #[test]
    fn test_plugin_off_never_queries() {
        let provider = FakeProvider::default();
        let detector = UpdateDetector::new(&provider, &FakeRegistry, "WordPress");
        let mut notified = NotifiedState::default();
        let mut notices = Vec::new();
        assert!(!detector.check_plugins(
            NotifyMode::Off,
            DedupPolicy::EveryScan,
            &mut notified,
            &mut notices
        ));
        assert_eq!(provider.plugin_queries.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_plugin_every_scan_reports_again() {
        let provider = FakeProvider {
            plugins: [("foo".to_string(), update("1.1"))].into_iter().collect(),
            ..FakeProvider::default()
        };
        let detector = UpdateDetector::new(&provider, &FakeRegistry, "WordPress");
        let mut notified = NotifiedState::default();
        let mut notices = Vec::new();
        for _ in 0..2 {
            assert!(detector.check_plugins(
                NotifyMode::All,
                DedupPolicy::EveryScan,
                &mut notified,
                &mut notices
            ));
        }
        assert_eq!(notices.len(), 2);
        assert_eq!(notified.plugin.get("foo").map(String::as_str), Some("1.1"));
    }

    #[test]
    fn test_plugin_once_policy_suppresses_repeat() {
        let provider = FakeProvider {
            plugins: [("foo".to_string(), update("1.1"))].into_iter().collect(),
            ..FakeProvider::default()
        };
        let detector = UpdateDetector::new(&provider, &FakeRegistry, "WordPress");
        let mut notified = NotifiedState::default();
        let mut notices = Vec::new();
        assert!(detector.check_plugins(NotifyMode::All, DedupPolicy::Once, &mut notified, &mut notices));
        assert!(!detector.check_plugins(NotifyMode::All, DedupPolicy::Once, &mut notified, &mut notices));
        assert_eq!(notices.len(), 1);
    }

    #[test]
    fn test_compatibility_author_asserted() {
        let provider = FakeProvider::default();
        let detector = UpdateDetector::new(&provider, &FakeRegistry, "WordPress");
        let mut up = update("1.1");
        up.tested = Some("6.4.1".into());
        let compat = detector.plugin_compatibility(&up);
        assert_eq!(compat.estimate, CompatibilityEstimate::AuthorAsserted);
        assert_eq!(
            compat.to_string(),
            "Compatibility with WordPress 6.4: 100% (according to its author)"
        );
    }

    #[test]
    fn test_compatibility_votes_and_unknown() {
        let provider = FakeProvider::default();
        let detector = UpdateDetector::new(&provider, &FakeRegistry, "WordPress");
        let mut up = update("1.1");
        up.tested = Some("6.3".into());
        assert_eq!(
            detector.plugin_compatibility(&up).estimate,
            CompatibilityEstimate::Unknown
        );

        let mut by_release = BTreeMap::new();
        by_release.insert(
            "1.1".to_string(),
            CompatibilityVotes {
                percent: 75,
                total: 4,
                works: 3,
            },
        );
        up.compatibility.insert("6.4".to_string(), by_release);
        assert_eq!(
            detector.plugin_compatibility(&up).estimate,
            CompatibilityEstimate::Votes {
                percent: 75,
                works: 3,
                total: 4
            }
        );
    }

    #[test]
    fn test_unknown_plugin_uses_id() {
        let provider = FakeProvider {
            plugins: [("bar".to_string(), update("2.0"))].into_iter().collect(),
            ..FakeProvider::default()
        };
        let detector = UpdateDetector::new(&provider, &FakeRegistry, "WordPress");
        let mut notified = NotifiedState::default();
        let mut notices = Vec::new();
        detector.check_plugins(NotifyMode::All, DedupPolicy::EveryScan, &mut notified, &mut notices);
        assert_eq!(notices[0].name, "bar");
        assert_eq!(notices[0].old_version, "unknown");
        assert_eq!(
            notices[0].links.as_ref().unwrap().changelog,
            "https://plugins.example.org/foo/changelog/"
        );
    }
}
