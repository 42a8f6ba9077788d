//! Host configuration: where the watcher finds its collaborators.
//!
//! Unlike [`crate::Settings`], which is the engine's own versioned record,
//! this file describes the environment: the metadata endpoint, the site
//! manifest, the SMTP relay and branding used in reports.
//!
//! Covers:
//! - `load` / `save` (YAML file I/O with atomic write)
//! - XDG-compliant path helpers (`config_path`, `config_dir`, `state_file_path`)

use crate::types::{LogLevel, SmtpSecurity};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Sender identity and footer links used in reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branding {
    /// Display name on the `From:` header and in the report footer
    #[serde(default = "crate::defaults::sender_name")]
    pub sender_name: String,

    /// Optional `Reply-To:` mailbox, e.g. `Support <help@example.com>`
    #[serde(default)]
    pub reply_to: Option<String>,

    /// Optional website linked from the report footer
    #[serde(default)]
    pub website: Option<String>,
}

impl Default for Branding {
    fn default() -> Self {
        Self {
            sender_name: crate::defaults::sender_name(),
            reply_to: None,
            website: None,
        }
    }
}

/// SMTP relay settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmtpConfig {
    /// Relay hostname; an empty host disables sending
    #[serde(default)]
    pub host: String,

    #[serde(default = "crate::defaults::smtp_port")]
    pub port: u16,

    #[serde(default = "crate::defaults::smtp_security")]
    pub security: SmtpSecurity,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default = "crate::defaults::smtp_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: crate::defaults::smtp_port(),
            security: crate::defaults::smtp_security(),
            username: None,
            password: None,
            timeout_secs: crate::defaults::smtp_timeout_secs(),
        }
    }
}

impl SmtpConfig {
    pub fn is_configured(&self) -> bool {
        !self.host.trim().is_empty()
    }
}

/// Environment description for one watched site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Site administrator address; default for `notify_to` / `notify_from`
    #[serde(default)]
    pub admin_email: String,

    /// Public base URL of the site, used to render the external cron command
    #[serde(default)]
    pub site_url: Option<String>,

    /// Endpoint returning update metadata as JSON
    #[serde(default)]
    pub metadata_url: String,

    /// Path of the site manifest listing installed components
    #[serde(default)]
    pub site_manifest: String,

    /// Settings/state file; defaults to `state.yaml` next to the config
    #[serde(default)]
    pub state_file: Option<String>,

    /// Name of the core platform used in report lines
    #[serde(default = "crate::defaults::platform_name")]
    pub platform_name: String,

    #[serde(default)]
    pub branding: Branding,

    #[serde(default)]
    pub smtp: SmtpConfig,

    #[serde(default = "crate::defaults::log_level")]
    pub log_level: LogLevel,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            admin_email: String::new(),
            site_url: None,
            metadata_url: String::new(),
            site_manifest: String::new(),
            state_file: None,
            platform_name: crate::defaults::platform_name(),
            branding: Branding::default(),
            smtp: SmtpConfig::default(),
            log_level: crate::defaults::log_level(),
        }
    }
}

impl HostConfig {
    /// Load configuration from the default path, creating it if missing.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, creating a default file if missing.
    pub fn load_from(path: &Path) -> Result<Self> {
        log::info!("Config path: {:?}", path);

        if path.exists() {
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Ok(metadata) = fs::metadata(path) {
                    let mode = metadata.permissions().mode();
                    // Group-readable (0o040) or world-readable (0o004).
                    if mode & 0o044 != 0 {
                        log::warn!(
                            "Config file {:?} has insecure permissions (mode {:04o}). \
                             It may contain SMTP credentials. Run: chmod 600 {:?}",
                            path,
                            mode & 0o777,
                            path,
                        );
                    }
                }
            }

            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {:?}", path))?;
            let config: HostConfig = serde_yaml_ng::from_str(&contents)
                .with_context(|| format!("Failed to parse config {:?}", path))?;
            Ok(config)
        } else {
            log::info!("Config file not found, creating default at {:?}", path);
            let config = Self::default();
            if let Err(e) = config.save_to(path) {
                log::error!("Failed to save default config: {}", e);
                return Err(e);
            }
            Ok(config)
        }
    }

    /// Save configuration to the default path.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to `path`.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let yaml = serde_yaml_ng::to_string(self)?;

        // Atomic save: write to temp file then rename to prevent corruption on crash
        let temp_path = path.with_extension("yaml.tmp");
        fs::write(&temp_path, &yaml)?;
        fs::rename(&temp_path, path)?;

        Ok(())
    }

    /// Get the configuration file path (using XDG convention)
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.yaml")
    }

    /// Get the configuration directory path (using XDG convention)
    pub fn config_dir() -> PathBuf {
        #[cfg(target_os = "windows")]
        {
            if let Some(config_dir) = dirs::config_dir() {
                config_dir.join("update-watcher")
            } else {
                PathBuf::from(".")
            }
        }
        #[cfg(not(target_os = "windows"))]
        {
            if let Some(home_dir) = dirs::home_dir() {
                home_dir.join(".config").join("update-watcher")
            } else {
                PathBuf::from(".")
            }
        }
    }

    /// Resolve the settings/state file, relative to `config_dir` when the
    /// configured value is relative.
    pub fn state_file_path(&self, config_dir: &Path) -> PathBuf {
        match &self.state_file {
            Some(path) => {
                let path = PathBuf::from(path);
                if path.is_absolute() {
                    path
                } else {
                    config_dir.join(path)
                }
            }
            None => config_dir.join("state.yaml"),
        }
    }
}
