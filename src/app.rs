//! Wiring: builds a [`NotificationCoordinator`] from the host config.

use crate::coordinator::NotificationCoordinator;
use crate::mail::{LogMailer, MailTransport, SmtpMailer};
use crate::report::ReportRenderer;
use crate::schedule::{LocalScheduler, ScheduleController};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use update_watcher_config::{HostConfig, KeyValueStore, Settings, SettingsStore, YamlFileStore};
use update_watcher_scan::{
    ComponentRegistry, HttpMetadataProvider, SiteManifest, UpdateMetadataProvider,
};

pub struct App {
    pub config: HostConfig,
    pub state_path: PathBuf,
    pub coordinator: NotificationCoordinator,
    pub scheduler: Arc<LocalScheduler>,
}

impl App {
    /// Assemble collaborators. `config_dir` anchors relative paths.
    pub fn build(config: HostConfig, config_dir: &Path, dry_run: bool) -> Result<Self> {
        let state_path = config.state_file_path(config_dir);
        log::info!("State file: {:?}", state_path);
        let kv: Arc<dyn KeyValueStore> = Arc::new(YamlFileStore::new(state_path.clone()));

        let manifest = load_manifest(&config, config_dir)?;
        let registry: Arc<dyn ComponentRegistry> = manifest.clone();
        let provider: Arc<dyn UpdateMetadataProvider> = if config.metadata_url.trim().is_empty() {
            log::info!("No metadata_url configured; using pending updates from the site manifest");
            manifest
        } else {
            Arc::new(
                HttpMetadataProvider::new(config.metadata_url.trim())
                    .context("Invalid metadata_url in config")?,
            )
        };

        let mailer: Arc<dyn MailTransport> = if dry_run {
            Arc::new(LogMailer)
        } else if !config.smtp.is_configured() {
            log::warn!("SMTP relay not configured; reports will only be logged");
            Arc::new(LogMailer)
        } else {
            Arc::new(SmtpMailer::new(&config.smtp).context("Invalid SMTP settings")?)
        };

        let scheduler = Arc::new(LocalScheduler::new(kv.clone()));
        let store = SettingsStore::new(kv, Settings::with_admin_email(&config.admin_email));

        let coordinator = NotificationCoordinator::new(
            store,
            ScheduleController::new(scheduler.clone()),
            provider,
            registry,
            mailer,
            ReportRenderer::new(config.branding.clone()),
        )
        .with_platform_name(config.platform_name.clone());

        Ok(Self {
            config,
            state_path,
            coordinator,
            scheduler,
        })
    }
}

fn load_manifest(config: &HostConfig, config_dir: &Path) -> Result<Arc<SiteManifest>> {
    let configured = config.site_manifest.trim();
    if configured.is_empty() {
        anyhow::bail!(
            "site_manifest is not set; add the path of the site manifest to {:?}",
            HostConfig::config_path()
        );
    }
    let path = PathBuf::from(configured);
    let path = if path.is_absolute() {
        path
    } else {
        config_dir.join(path)
    };
    let manifest = SiteManifest::load(&path)
        .with_context(|| format!("Failed to load site manifest {:?}", path))?;
    Ok(Arc::new(manifest))
}
