//! Site manifest: the local view of installed components.
//!
//! A manifest is a YAML (or JSON) document describing the watched site:
//!
//! ```yaml
//! core_version: "6.4.2"
//! active_theme: twentytwentyfour
//! plugins:
//!   akismet/akismet.php: { name: Akismet, version: "5.2", active: true }
//! themes:
//!   twentytwentyfour: { name: Twenty Twenty-Four, version: "1.0" }
//! pending:
//!   core: "6.5"
//!   plugins:
//!     akismet/akismet.php: { new_version: "5.3", url: "https://plugins.example.org/akismet/" }
//! ```
//!
//! The optional `pending` section lets a manifest double as an offline
//! update source when no metadata endpoint is configured.

use crate::error::MetadataError;
use crate::provider::{
    Candidates, ComponentRegistry, CoreUpdate, InstalledComponent, UpdateMetadataProvider,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

/// An installed plugin or theme.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestComponent {
    pub name: String,
    pub version: String,
    /// Only meaningful for plugins; the active theme is named separately
    #[serde(default)]
    pub active: bool,
}

/// Updates known ahead of time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingUpdates {
    /// New core version on offer, if any
    #[serde(default)]
    pub core: Option<String>,
    #[serde(default)]
    pub plugins: Candidates,
    #[serde(default)]
    pub themes: Candidates,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteManifest {
    pub core_version: String,
    #[serde(default)]
    pub active_theme: Option<String>,
    #[serde(default)]
    pub plugins: BTreeMap<String, ManifestComponent>,
    #[serde(default)]
    pub themes: BTreeMap<String, ManifestComponent>,
    #[serde(default)]
    pub pending: PendingUpdates,
}

impl SiteManifest {
    /// Load a manifest from `path`.
    pub fn load(path: &Path) -> Result<Self, MetadataError> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, MetadataError> {
        Ok(serde_yaml_ng::from_str(contents)?)
    }
}

fn installed(component: &ManifestComponent) -> InstalledComponent {
    InstalledComponent {
        name: component.name.clone(),
        version: component.version.clone(),
    }
}

impl ComponentRegistry for SiteManifest {
    fn core_version(&self) -> String {
        self.core_version.clone()
    }

    fn active_plugins(&self) -> BTreeSet<String> {
        self.plugins
            .iter()
            .filter(|(_, p)| p.active)
            .map(|(id, _)| id.clone())
            .collect()
    }

    fn active_theme(&self) -> Option<String> {
        self.active_theme.clone()
    }

    fn plugin_info(&self, id: &str) -> Option<InstalledComponent> {
        self.plugins.get(id).map(installed)
    }

    fn theme_info(&self, id: &str) -> Option<InstalledComponent> {
        self.themes.get(id).map(installed)
    }
}

impl UpdateMetadataProvider for SiteManifest {
    fn core_update(&self) -> Result<CoreUpdate, MetadataError> {
        let new_version = self.pending.core.clone().unwrap_or_default();
        Ok(CoreUpdate {
            available: !new_version.is_empty() && new_version != self.core_version,
            current_version: self.core_version.clone(),
            new_version,
        })
    }

    fn plugin_updates(&self) -> Result<Candidates, MetadataError> {
        Ok(self.pending.plugins.clone())
    }

    fn theme_updates(&self) -> Result<Candidates, MetadataError> {
        Ok(self.pending.themes.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
core_version: "6.4.2"
active_theme: twentytwentyfour
plugins:
  akismet/akismet.php: { name: Akismet, version: "5.2", active: true }
  hello.php: { name: Hello Dolly, version: "1.7" }
themes:
  twentytwentyfour: { name: Twenty Twenty-Four, version: "1.0" }
pending:
  core: "6.5"
  plugins:
    hello.php: { new_version: "1.7.2", url: "https://plugins.example.org/hello-dolly/" }
"#;

    #[test]
    fn test_registry_view() {
        let manifest = SiteManifest::parse(SAMPLE).unwrap();
        assert_eq!(manifest.core_version(), "6.4.2");
        assert_eq!(
            manifest.active_plugins().into_iter().collect::<Vec<_>>(),
            vec!["akismet/akismet.php".to_string()]
        );
        assert_eq!(manifest.plugin_info("hello.php").unwrap().name, "Hello Dolly");
        assert!(manifest.theme_info("missing").is_none());
    }

    #[test]
    fn test_pending_updates() {
        let manifest = SiteManifest::parse(SAMPLE).unwrap();
        let core = manifest.core_update().unwrap();
        assert!(core.available);
        assert_eq!(core.new_version, "6.5");
        assert_eq!(manifest.plugin_updates().unwrap().len(), 1);
        assert!(manifest.theme_updates().unwrap().is_empty());
    }

    #[test]
    fn test_no_pending_core() {
        let manifest = SiteManifest::parse("core_version: \"6.4\"\n").unwrap();
        assert!(!manifest.core_update().unwrap().available);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = SiteManifest::load(&dir.path().join("site.yaml")).unwrap_err();
        assert!(matches!(err, MetadataError::Io(_)));
    }
}
