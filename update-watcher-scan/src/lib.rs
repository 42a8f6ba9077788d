//! Update detection engine for update-watcher.
//!
//! Provides:
//! - `provider`: collaborator traits for update metadata and the local install
//! - `detector`: core/plugin/theme checks with notified-version dedup
//! - `filter`: candidate filters applied before notices are built
//! - `notice`: scan output and its plain-text rendering
//! - `remote`: HTTP metadata endpoint client
//! - `manifest`: site manifest file as registry (and offline update source)
//! - `version`: lenient version comparison

pub mod detector;
pub mod error;
pub mod filter;
pub mod http;
pub mod manifest;
pub mod notice;
pub mod provider;
pub mod remote;
pub mod version;

pub use detector::UpdateDetector;
pub use error::MetadataError;
pub use filter::{CandidateFilter, ExtensionKind, IgnoreList, SkipNotified};
pub use manifest::SiteManifest;
pub use notice::{
    Compatibility, CompatibilityEstimate, ComponentKind, PluginLinks, ScanResult, UpdateNotice,
};
pub use provider::{
    Candidates, CompatibilityVotes, ComponentRegistry, ComponentUpdate, CoreUpdate,
    InstalledComponent, UpdateMetadataProvider,
};
pub use remote::HttpMetadataProvider;
