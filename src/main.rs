use anyhow::Result;
use clap::Parser;
use update_watcher::cli;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // CLI --log-level takes precedence, then RUST_LOG, then the config file
    // (applied once it is loaded).
    update_watcher::debug::init_log_bridge(cli.log_level);

    log::info!("Starting update-watcher {}", update_watcher::VERSION);

    match cli::run(cli) {
        Ok(0) => Ok(()),
        Ok(code) => {
            log::logger().flush();
            std::process::exit(code);
        }
        Err(e) => {
            log::error!("{:#}", e);
            eprintln!("update-watcher: error: {e:#}");
            std::process::exit(1);
        }
    }
}
