//! Candidate filters: the extensibility hook applied to plugin and theme
//! candidates before notices are built.
//!
//! Filters run in registration order. The notified-version dedup step is a
//! filter like any other ([`SkipNotified`]); the detector appends it when the
//! kind's [`update_watcher_config::DedupPolicy`] is `Once`.

use crate::provider::Candidates;
use std::collections::{BTreeMap, BTreeSet};

/// Plugin or theme: the kinds that go through candidate filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtensionKind {
    Plugin,
    Theme,
}

/// Narrows the set of update candidates for one kind.
pub trait CandidateFilter: Send + Sync {
    /// `notified` is the kind's id → last reported version map.
    fn filter(
        &self,
        kind: ExtensionKind,
        candidates: Candidates,
        notified: &BTreeMap<String, String>,
    ) -> Candidates;
}

/// Drops candidates whose new version was already reported.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipNotified;

impl CandidateFilter for SkipNotified {
    fn filter(
        &self,
        _kind: ExtensionKind,
        mut candidates: Candidates,
        notified: &BTreeMap<String, String>,
    ) -> Candidates {
        candidates.retain(|id, update| notified.get(id) != Some(&update.new_version));
        candidates
    }
}

/// Drops components the operator chose to ignore.
#[derive(Debug, Clone, Default)]
pub struct IgnoreList {
    plugins: BTreeSet<String>,
    themes: BTreeSet<String>,
}

impl IgnoreList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ignore_plugin(mut self, id: impl Into<String>) -> Self {
        self.plugins.insert(id.into());
        self
    }

    pub fn ignore_theme(mut self, id: impl Into<String>) -> Self {
        self.themes.insert(id.into());
        self
    }
}

impl CandidateFilter for IgnoreList {
    fn filter(
        &self,
        kind: ExtensionKind,
        mut candidates: Candidates,
        _notified: &BTreeMap<String, String>,
    ) -> Candidates {
        let ignored = match kind {
            ExtensionKind::Plugin => &self.plugins,
            ExtensionKind::Theme => &self.themes,
        };
        candidates.retain(|id, _| !ignored.contains(id));
        candidates
    }
}
