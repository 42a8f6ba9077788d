//! Logging backend for update-watcher.
//!
//! Routes every `log::info!()` etc. to an appended session log file:
//! `/tmp/update_watcher.log` on Unix/macOS, `%TEMP%\update_watcher.log` on
//! Windows. When `RUST_LOG` is set, lines are mirrored to stderr as well so a
//! cron job's mail or a terminal shows them.
//!
//! Level precedence: `--log-level`, then `RUST_LOG`, then the host config's
//! `log_level` (applied later through [`set_level`]).

use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

struct LogBridge {
    file: Mutex<Option<File>>,
    mirror_stderr: bool,
}

static BRIDGE: OnceLock<LogBridge> = OnceLock::new();

/// Set once the level came from the command line or `RUST_LOG`, so the
/// config file cannot override it.
static LEVEL_PINNED: AtomicBool = AtomicBool::new(false);

/// Path of the session log file.
pub fn log_path() -> PathBuf {
    #[cfg(unix)]
    {
        PathBuf::from("/tmp/update_watcher.log")
    }
    #[cfg(not(unix))]
    {
        std::env::temp_dir().join("update_watcher.log")
    }
}

/// Open the session log for appending, so runs from cron keep earlier
/// sessions.
fn open_log_file(path: &Path) -> Option<File> {
    OpenOptions::new().append(true).create(true).open(path).ok()
}

fn level_from_env() -> Option<log::LevelFilter> {
    let value = std::env::var("RUST_LOG").ok()?;
    // Accept plain levels and `crate=level` directives; the last level wins.
    value
        .split(',')
        .filter_map(|d| d.rsplit('=').next())
        .filter_map(|l| l.trim().parse::<log::LevelFilter>().ok())
        .next_back()
}

/// Install the logger. Safe to call more than once; later calls only adjust
/// the level.
pub fn init_log_bridge(cli_level: Option<log::LevelFilter>) {
    let env_level = level_from_env();
    let level = cli_level.or(env_level);
    LEVEL_PINNED.store(level.is_some(), Ordering::SeqCst);

    let bridge = BRIDGE.get_or_init(|| {
        let file = open_log_file(&log_path());
        let bridge = LogBridge {
            file: Mutex::new(file),
            mirror_stderr: std::env::var_os("RUST_LOG").is_some(),
        };
        bridge.write_raw(&format!(
            "{}\nupdate-watcher session started at {}\n{}\n",
            "=".repeat(80),
            chrono::Local::now().to_rfc3339(),
            "=".repeat(80)
        ));
        bridge
    });

    // Already installed on repeat calls; ignore.
    let _ = log::set_logger(bridge);
    log::set_max_level(level.unwrap_or(log::LevelFilter::Info));
}

/// Apply the config file's level unless the command line or `RUST_LOG`
/// already chose one.
pub fn set_level(level: log::LevelFilter) {
    if !LEVEL_PINNED.load(Ordering::SeqCst) {
        log::set_max_level(level);
    }
}

impl LogBridge {
    fn write_raw(&self, line: &str) {
        if let Some(file) = self.file.lock().as_mut() {
            let _ = file.write_all(line.as_bytes());
            let _ = file.flush();
        }
    }
}

impl log::Log for LogBridge {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!(
            "[{}] [{:<5}] [{}] {}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            record.level(),
            record.target(),
            record.args()
        );
        self.write_raw(&line);
        if self.mirror_stderr {
            eprint!("{line}");
        }
    }

    fn flush(&self) {
        if let Some(file) = self.file.lock().as_mut() {
            let _ = file.flush();
        }
    }
}
