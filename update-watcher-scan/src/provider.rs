//! Collaborator interfaces consumed by the detector.
//!
//! The host platform decides how update availability is discovered; the
//! engine only sees the results through [`UpdateMetadataProvider`] and the
//! local install through [`ComponentRegistry`].

use crate::error::MetadataError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Core platform update status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreUpdate {
    /// Whether a newer core release is offered
    #[serde(default)]
    pub available: bool,
    /// Version currently running
    #[serde(default)]
    pub current_version: String,
    /// Version on offer (meaningless when `available` is false)
    #[serde(default)]
    pub new_version: String,
}

/// Community compatibility votes for one (core version, plugin version) pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityVotes {
    /// Share of "works" votes, 0-100
    pub percent: u32,
    /// Total votes cast
    pub total: u32,
    /// Votes saying the pair works
    pub works: u32,
}

/// Pending update for one plugin or theme.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentUpdate {
    pub new_version: String,

    /// Details page for the component
    #[serde(default)]
    pub url: String,

    /// Highest core version the author says the new release was tested with
    #[serde(default)]
    pub tested: Option<String>,

    /// core version → new component version → votes
    #[serde(default)]
    pub compatibility: BTreeMap<String, BTreeMap<String, CompatibilityVotes>>,
}

/// Candidates keyed by component identifier, in stable order.
pub type Candidates = BTreeMap<String, ComponentUpdate>;

/// Locally installed component metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledComponent {
    pub name: String,
    pub version: String,
}

/// Source of update availability.
///
/// Implementations may hit the network; any failure is reported as an error
/// and the detector treats it as "no update information".
pub trait UpdateMetadataProvider: Send + Sync {
    fn core_update(&self) -> Result<CoreUpdate, MetadataError>;

    /// Plugins with an update available.
    fn plugin_updates(&self) -> Result<Candidates, MetadataError>;

    /// Themes with an update available.
    fn theme_updates(&self) -> Result<Candidates, MetadataError>;
}

/// Local view of what is installed and active.
pub trait ComponentRegistry: Send + Sync {
    /// Version of the running core platform.
    fn core_version(&self) -> String;

    fn active_plugins(&self) -> BTreeSet<String>;

    fn active_theme(&self) -> Option<String>;

    fn plugin_info(&self, id: &str) -> Option<InstalledComponent>;

    fn theme_info(&self, id: &str) -> Option<InstalledComponent>;
}
