//! Async Locator CLI
//!
//! Entry point that dispatches to subcommands.

use async_locator::cli::{Cli, Commands};
use async_locator::config::ConfigManager;
use async_locator::error::LocatorResult;
use clap::Parser;
use console::style;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> LocatorResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load().await?;

    // 0 = warn, 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("async_locator=warn"),
        1 => EnvFilter::new("async_locator=info"),
        _ => EnvFilter::new("async_locator=debug"),
    };

    // Logs go to stderr so --json output stays parseable
    if config.general.log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_names(true)
            .without_time()
            .with_writer(std::io::stderr)
            .init();
    }
    debug!("Using config at {}", config_manager.path().display());

    match cli.command {
        Commands::Locate(args) => async_locator::cli::commands::locate(args, &config).await,
        Commands::Config(args) => {
            async_locator::cli::commands::config(args, &config, &config_manager).await
        }
    }
}
