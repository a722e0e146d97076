//! Config command - show or edit configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager};
use crate::error::{LocatorError, LocatorResult};
use crate::task::OverlapPolicy;
use crate::ui::{self, UiContext};

const VALID_KEYS: [&str; 8] = [
    "general.log_format",
    "locate.timeout_secs",
    "locate.search_radius",
    "locate.skip_existing_chunks",
    "locate.overlap_policy",
    "executor.worker_threads",
    "cache.ttl_secs",
    "cache.max_entries",
];

/// Execute the config command
pub async fn execute(args: ConfigArgs, config: &Config, manager: &ConfigManager) -> LocatorResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => show_path(manager),
        Some(ConfigAction::Init { force }) => init_config(manager, force).await?,
        Some(ConfigAction::Set { key, value }) => set_value(manager, config, &key, &value).await?,
    }

    Ok(())
}

fn show_config(config: &Config) -> LocatorResult<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

fn show_path(manager: &ConfigManager) {
    println!("{}", manager.path().display());
}

async fn init_config(manager: &ConfigManager, force: bool) -> LocatorResult<()> {
    let ctx = UiContext::detect();
    let path = manager.path();

    if path.exists() && !force {
        ui::step_warn_hint(
            &ctx,
            &format!("Config already exists at {}", path.display()),
            "Use --force to overwrite",
        );
        return Ok(());
    }

    manager.save(&Config::default()).await?;
    ui::step_ok_detail(&ctx, "Configuration initialized", &path.display().to_string());

    Ok(())
}

async fn set_value(
    manager: &ConfigManager,
    config: &Config,
    key: &str,
    value: &str,
) -> LocatorResult<()> {
    let ctx = UiContext::detect();
    let mut config = config.clone();

    if let Err(e) = apply(&mut config, key, value) {
        if matches!(e, LocatorError::User(ref msg) if msg.starts_with("Unknown config key")) {
            ui::step_error_detail(&ctx, "Unknown config key", key);
            ui::remark(&ctx, "Valid keys:");
            for key in VALID_KEYS {
                ui::remark(&ctx, &format!("  {}", key));
            }
            return Ok(());
        }
        return Err(e);
    }

    manager.save(&config).await?;
    ui::step_ok(&ctx, &format!("Set {} = {}", key, value));

    Ok(())
}

/// Apply a dot-separated `key = value` to `config`
fn apply(config: &mut Config, key: &str, value: &str) -> LocatorResult<()> {
    let parts: Vec<&str> = key.split('.').collect();

    match parts.as_slice() {
        ["general", "log_format"] => {
            config.general.log_format = match value {
                "text" | "json" => value.to_string(),
                _ => {
                    return Err(LocatorError::User(format!(
                        "Invalid log format: {}. Use text or json",
                        value
                    )))
                }
            }
        }
        ["locate", "timeout_secs"] => config.locate.timeout_secs = parse_number(value)?,
        ["locate", "search_radius"] => config.locate.search_radius = parse_number(value)?,
        ["locate", "skip_existing_chunks"] => {
            config.locate.skip_existing_chunks = parse_bool(value)?
        }
        ["locate", "overlap_policy"] => config.locate.overlap_policy = parse_policy(value)?,
        ["executor", "worker_threads"] => {
            config.executor.worker_threads = match parse_number::<usize>(value)? {
                0 => None,
                n => Some(n),
            }
        }
        ["cache", "ttl_secs"] => config.cache.ttl_secs = parse_number(value)?,
        ["cache", "max_entries"] => config.cache.max_entries = parse_number(value)?,
        _ => return Err(LocatorError::User(format!("Unknown config key: {}", key))),
    }

    Ok(())
}

fn parse_bool(value: &str) -> LocatorResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(LocatorError::User(format!(
            "Invalid boolean value: {}. Use true/false",
            value
        ))),
    }
}

fn parse_number<N: std::str::FromStr>(value: &str) -> LocatorResult<N> {
    value
        .parse()
        .map_err(|_| LocatorError::User(format!("Invalid number: {}", value)))
}

fn parse_policy(value: &str) -> LocatorResult<OverlapPolicy> {
    match value.to_lowercase().as_str() {
        "reject" => Ok(OverlapPolicy::Reject),
        "supersede" => Ok(OverlapPolicy::Supersede),
        _ => Err(LocatorError::User(format!(
            "Invalid overlap policy: {}. Use reject or supersede",
            value
        ))),
    }
}
