//! Scan output: one [`UpdateNotice`] per detected update, aggregated into a
//! [`ScanResult`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// A unit whose update status is tracked independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Core,
    Plugin,
    Theme,
}

impl ComponentKind {
    pub fn label(&self) -> &'static str {
        match self {
            ComponentKind::Core => "Core",
            ComponentKind::Plugin => "Plugin",
            ComponentKind::Theme => "Theme",
        }
    }
}

/// How confident we are that a plugin release works with the running core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "source")]
pub enum CompatibilityEstimate {
    /// The author declared the release tested with this core version
    AuthorAsserted,
    /// Community votes recorded for this exact pair
    Votes { percent: u32, works: u32, total: u32 },
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compatibility {
    pub platform: String,
    pub core_version: String,
    pub estimate: CompatibilityEstimate,
}

impl fmt::Display for Compatibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Compatibility with {} {}: ",
            self.platform, self.core_version
        )?;
        match self.estimate {
            CompatibilityEstimate::AuthorAsserted => write!(f, "100% (according to its author)"),
            CompatibilityEstimate::Votes {
                percent,
                works,
                total,
            } => write!(f, "{percent}% ({works} \"works\" votes out of {total} total)"),
            CompatibilityEstimate::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Reference links attached to plugin notices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginLinks {
    pub details: String,
    pub changelog: String,
}

/// One detected update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateNotice {
    pub kind: ComponentKind,
    /// Component identifier (the platform name for core)
    pub id: String,
    pub name: String,
    pub old_version: String,
    pub new_version: String,
    #[serde(default)]
    pub links: Option<PluginLinks>,
    #[serde(default)]
    pub compatibility: Option<Compatibility>,
}

impl fmt::Display for UpdateNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} is out of date. Please update from version {} to {}",
            self.kind.label(),
            self.name,
            self.old_version,
            self.new_version
        )?;
        if let Some(links) = &self.links {
            write!(f, "\n\tDetails: {}", links.details)?;
            write!(f, "\n\tChangelog: {}", links.changelog)?;
        }
        if let Some(compat) = &self.compatibility {
            write!(f, "\n\tCompatibility: {compat}")?;
        }
        Ok(())
    }
}

/// Aggregated outcome of one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    pub core_updated: bool,
    pub plugins_updated: bool,
    pub themes_updated: bool,
    /// Ordered core, then plugins, then themes
    pub notices: Vec<UpdateNotice>,
}

impl ScanResult {
    /// Whether anything new needs attention.
    pub fn any_updated(&self) -> bool {
        self.core_updated || self.plugins_updated || self.themes_updated
    }

    /// Plain message body: each notice on its own paragraph.
    pub fn message(&self) -> String {
        self.notices
            .iter()
            .map(|n| format!("\n{n}\n"))
            .collect::<String>()
            .trim()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn theme_notice() -> UpdateNotice {
        UpdateNotice {
            kind: ComponentKind::Theme,
            id: "twentytwenty".into(),
            name: "Twenty Twenty".into(),
            old_version: "1.0".into(),
            new_version: "1.2".into(),
            links: None,
            compatibility: None,
        }
    }

    #[test]
    fn test_theme_line() {
        assert_eq!(
            theme_notice().to_string(),
            "Theme: Twenty Twenty is out of date. Please update from version 1.0 to 1.2"
        );
    }

    #[test]
    fn test_plugin_lines() {
        let notice = UpdateNotice {
            kind: ComponentKind::Plugin,
            id: "foo/foo.php".into(),
            name: "Foo".into(),
            old_version: "1.0".into(),
            new_version: "1.1".into(),
            links: Some(PluginLinks {
                details: "https://plugins.example.org/foo/".into(),
                changelog: "https://plugins.example.org/foo/changelog/".into(),
            }),
            compatibility: Some(Compatibility {
                platform: "WordPress".into(),
                core_version: "6.4".into(),
                estimate: CompatibilityEstimate::Votes {
                    percent: 90,
                    works: 9,
                    total: 10,
                },
            }),
        };
        let text = notice.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], "\tDetails: https://plugins.example.org/foo/");
        assert_eq!(
            lines[3],
            "\tCompatibility: Compatibility with WordPress 6.4: 90% (9 \"works\" votes out of 10 total)"
        );
    }

    #[test]
    fn test_message_joins_and_trims() {
        let mut second = theme_notice();
        second.name = "Other".into();
        let result = ScanResult {
            themes_updated: true,
            notices: vec![theme_notice(), second],
            ..ScanResult::default()
        };
        let message = result.message();
        assert!(message.starts_with("Theme: Twenty Twenty"));
        assert!(message.contains("1.2\n\nTheme: Other"));
        assert!(!message.ends_with('\n'));
        assert!(result.any_updated());
        assert!(ScanResult::default().message().is_empty());
    }
}
