//! Command-line interface for update-watcher.
//!
//! Every subcommand builds one [`App`] from the host config and drives the
//! coordinator; `watch` runs the local scheduler loop.

use crate::app::App;
use crate::coordinator::{MailStatus, NO_UPDATES, ON_DEMAND_SUCCESS, OnDemandOutcome};
use crate::schedule::{CHECK_HOOK, ScheduleState};
use crate::trigger;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use update_watcher_config::{HostConfig, SettingsInput};

/// update-watcher - emails a report when a site's core, plugins or themes
/// have new updates
#[derive(Parser)]
#[command(name = "update-watcher")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Host config file (default: ~/.config/update-watcher/config.yaml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", value_parser = parse_level_filter)]
    pub log_level: Option<log::LevelFilter>,

    /// Log report emails instead of sending them
    #[arg(long, global = true)]
    pub dry_run: bool,
}

fn parse_level_filter(value: &str) -> Result<log::LevelFilter, String> {
    value
        .parse::<log::LevelFilter>()
        .map_err(|_| format!("invalid log level '{value}' (off, error, warn, info, debug, trace)"))
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a scheduled check now and email anything new
    Check,

    /// Run an externally triggered check authenticated by the security key
    Trigger {
        /// Security key
        #[arg(long, conflicts_with = "url")]
        key: Option<String>,

        /// Full trigger URL carrying the key in its query string
        #[arg(long)]
        url: Option<String>,
    },

    /// Print every pending update, ignoring plugin/theme notification modes
    Preview,

    /// Write an HTML report of every pending update
    Report {
        /// Output file or directory (default: current directory)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Migrate stored settings and install the periodic check
    Activate,

    /// Remove the periodic check
    Deactivate,

    /// Show schedule status, supported intervals and the last scan time
    Schedule,

    /// Show or change settings
    Settings {
        #[command(subcommand)]
        action: SettingsCommand,
    },

    /// Run due checks from the local scheduler until interrupted
    Watch {
        /// Seconds between scheduler polls
        #[arg(long, default_value_t = 60)]
        poll_secs: u64,

        /// Run due checks once and exit
        #[arg(long)]
        once: bool,
    },

    /// Remove the periodic check and all stored state
    Uninstall,
}

#[derive(Subcommand)]
pub enum SettingsCommand {
    /// Print the stored settings as YAML
    Show,

    /// Change one or more settings; unspecified fields keep their value
    Set(SettingsArgs),
}

#[derive(Args, Default)]
pub struct SettingsArgs {
    /// internal or external
    #[arg(long)]
    pub cron_method: Option<String>,
    /// Interval name, or manual
    #[arg(long)]
    pub frequency: Option<String>,
    /// Comma separated recipient addresses
    #[arg(long)]
    pub notify_to: Option<String>,
    #[arg(long)]
    pub notify_from: Option<String>,
    #[arg(long)]
    pub notify_to_name: Option<String>,
    /// off, all or active_only (or 0/1/2)
    #[arg(long)]
    pub notify_plugins: Option<String>,
    /// off, all or active_only (or 0/1/2)
    #[arg(long)]
    pub notify_themes: Option<String>,
    #[arg(long)]
    pub notify_automatic: Option<String>,
    #[arg(long)]
    pub hide_updates: Option<String>,
    /// every_scan or once
    #[arg(long)]
    pub plugin_dedup: Option<String>,
    /// every_scan or once
    #[arg(long)]
    pub theme_dedup: Option<String>,
}

impl SettingsArgs {
    /// Overlay the given flags on `base`.
    pub fn apply(self, mut base: SettingsInput) -> SettingsInput {
        macro_rules! overlay {
            ($($field:ident),*) => {
                $(if self.$field.is_some() { base.$field = self.$field; })*
            };
        }
        overlay!(
            cron_method,
            frequency,
            notify_to,
            notify_from,
            notify_to_name,
            notify_plugins,
            notify_themes,
            notify_automatic,
            hide_updates,
            plugin_dedup,
            theme_dedup
        );
        base
    }
}

fn load_app(cli: &Cli) -> Result<App> {
    let config_path = cli.config.clone().unwrap_or_else(HostConfig::config_path);
    let config = HostConfig::load_from(&config_path)?;
    crate::debug::set_level(config.log_level.to_level_filter());

    let config_dir = config_path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(HostConfig::config_dir);
    App::build(config, &config_dir, cli.dry_run)
}

/// Execute the parsed command line. Returns the process exit code.
pub fn run(cli: Cli) -> Result<i32> {
    let app = load_app(&cli)?;
    let coordinator = &app.coordinator;

    match cli.command {
        Commands::Check => {
            let outcome = coordinator.perform_scheduled_check()?;
            print_check(&outcome.message, &outcome.mail);
            Ok(match outcome.mail {
                MailStatus::Failed(_) => 1,
                _ => 0,
            })
        }
        Commands::Trigger { key, url } => {
            let token = key.or_else(|| url.as_deref().and_then(trigger::token_from_url));
            match coordinator.perform_on_demand_check(token.as_deref())? {
                OnDemandOutcome::Checked(_) => {
                    println!("{}", ON_DEMAND_SUCCESS);
                    Ok(0)
                }
                OnDemandOutcome::Rejected => {
                    eprintln!("Check not performed.");
                    Ok(1)
                }
            }
        }
        Commands::Preview => {
            let message = coordinator.preview_all_updates()?;
            if message.is_empty() {
                println!("{}", NO_UPDATES);
            } else {
                println!("{}", message);
            }
            Ok(0)
        }
        Commands::Report { output } => {
            let Some(report) = coordinator.download_report(chrono::Local::now().naive_local())?
            else {
                println!("{}", NO_UPDATES);
                return Ok(0);
            };
            let path = match output {
                Some(path) if path.is_dir() => path.join(&report.filename),
                Some(path) => path,
                None => PathBuf::from(&report.filename),
            };
            std::fs::write(&path, &report.html)
                .with_context(|| format!("Failed to write report {:?}", path))?;
            println!("Report written to {}", path.display());
            Ok(0)
        }
        Commands::Activate => {
            let state = coordinator.activate()?;
            print_schedule_state(&state);
            if let Some(site_url) = &app.config.site_url {
                let settings = coordinator.settings()?;
                if settings.cron_method == update_watcher_config::CronMethod::External {
                    println!(
                        "External trigger: {}",
                        coordinator.external_trigger_command(site_url)?
                    );
                }
            }
            Ok(0)
        }
        Commands::Deactivate => {
            coordinator.deactivate()?;
            println!("Periodic check removed.");
            Ok(0)
        }
        Commands::Schedule => {
            let settings = coordinator.settings()?;
            print_schedule_state(&coordinator.schedule().state()?);
            println!("Trigger method: {}", settings.cron_method.display_name());
            println!("Last scanned: {}", settings.last_scanned_display());
            if let Some(next) = app.scheduler.next_run()? {
                println!("Next run: {}", next.with_timezone(&chrono::Local).format("%Y-%m-%d @ %H:%M"));
            }
            println!("Supported intervals:");
            for interval in coordinator.schedule().supported_intervals() {
                println!("  {:<12} {}", interval.name, interval.display);
            }
            if let Some(site_url) = &app.config.site_url {
                println!(
                    "External trigger: {}",
                    coordinator.external_trigger_command(site_url)?
                );
            }
            Ok(0)
        }
        Commands::Settings { action } => match action {
            SettingsCommand::Show => {
                let settings = coordinator.settings()?;
                print!("{}", serde_yaml_ng::to_string(&settings)?);
                Ok(0)
            }
            SettingsCommand::Set(args) => {
                let input = args.apply(SettingsInput::from_settings(&coordinator.settings()?));
                let errors = coordinator.save_settings(&input)?;
                if errors.is_empty() {
                    println!("Settings saved.");
                    Ok(0)
                } else {
                    for error in &errors {
                        eprintln!("{}", error.message);
                    }
                    Ok(2)
                }
            }
        },
        Commands::Watch { poll_secs, once } => {
            watch(&app, Duration::from_secs(poll_secs.max(1)), once)?;
            Ok(0)
        }
        Commands::Uninstall => {
            coordinator.uninstall()?;
            println!("Removed all update-watcher state from {}", app.state_path.display());
            Ok(0)
        }
    }
}

fn print_check(message: &str, mail: &MailStatus) {
    if message.is_empty() {
        println!("No new updates found.");
    } else {
        println!("{}", message);
    }
    match mail {
        MailStatus::NotNeeded => {}
        MailStatus::Sent => println!("Report emailed."),
        MailStatus::Failed(e) => eprintln!("Report email failed: {}", e),
    }
}

fn print_schedule_state(state: &ScheduleState) {
    match state {
        ScheduleState::Disabled => println!("Periodic check: disabled"),
        ScheduleState::ScheduledAt(name) => println!("Periodic check: {}", name),
    }
}

/// Poll the local scheduler and run the check whenever it is due.
fn watch(app: &App, poll: Duration, once: bool) -> Result<()> {
    log::info!("Watching for due checks every {:?}", poll);
    loop {
        let now = chrono::Utc::now();
        for hook in app.scheduler.due_hooks(now)? {
            if hook == CHECK_HOOK {
                match app.coordinator.perform_scheduled_check() {
                    Ok(outcome) => print_check(&outcome.message, &outcome.mail),
                    Err(e) => log::error!("Scheduled check failed: {:#}", e),
                }
            } else {
                log::warn!("Ignoring unknown scheduled hook {}", hook);
            }
            app.scheduler.mark_ran(&hook, now)?;
        }
        if once {
            return Ok(());
        }
        std::thread::sleep(poll);
    }
}
