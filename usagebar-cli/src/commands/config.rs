//! Config command - manage configuration.

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use tracing::info;
use usagebar_core::Evaluator;
use usagebar_store::{CREDENTIALS_FILE, SettingsStore, USAGE_CACHE_FILE};

use crate::output::JsonFormatter;
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration.
    Show,

    /// Show configuration and state file paths.
    Path,

    /// Write a settings file with the current values.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

/// Runs the config command.
pub async fn run(args: &ConfigArgs, settings: &SettingsStore, cli: &Cli) -> Result<ExitCode> {
    match &args.action {
        ConfigAction::Show => show_config(settings, cli).await?,
        ConfigAction::Path => show_paths(settings, cli)?,
        ConfigAction::Init { force } => init_config(settings, *force).await?,
    }
    Ok(ExitCode::Success)
}

async fn show_config(store: &SettingsStore, cli: &Cli) -> Result<()> {
    let settings = store.get().await;

    match cli.format {
        OutputFormat::Text => {
            println!("usagebar Configuration");
            println!("{}", "─".repeat(40));
            println!();
            println!("Refresh interval: {}s", settings.refresh_interval_secs);
            println!("Grace window:     {}s", settings.grace_window_secs);
            println!("Fetch timeout:    {}s", settings.fetch_timeout_secs);
            println!("Login timeout:    {}s", settings.login_timeout_secs);
            println!(
                "Thresholds:       warning {}%, critical {}%",
                settings.warning_threshold, settings.critical_threshold
            );
            println!("Base URL:         {}", settings.base_url);
            println!(
                "Organization:     {}",
                settings.organization_id.as_deref().unwrap_or("from session")
            );
            println!(
                "Login helper:     {}",
                settings
                    .login_command
                    .as_ref()
                    .map_or_else(|| "none".to_string(), |argv| argv.join(" "))
            );
            println!("Log level:        {}", settings.log_level);
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty, Evaluator::default());
            println!("{}", formatter.format(&settings)?);
        }
    }

    Ok(())
}

fn show_paths(store: &SettingsStore, cli: &Cli) -> Result<()> {
    let config_dir = store.dir();
    let settings_path = store.path();
    let credentials_path = config_dir.join(CREDENTIALS_FILE);
    let cache_path = config_dir.join(USAGE_CACHE_FILE);

    match cli.format {
        OutputFormat::Text => {
            println!("Configuration Paths");
            println!("{}", "─".repeat(40));
            println!();
            println!("Config dir:       {}", config_dir.display());
            println!("Settings file:    {}", settings_path.display());
            println!("Credential file:  {}", credentials_path.display());
            println!("Usage cache:      {}", cache_path.display());
        }
        OutputFormat::Json => {
            let paths = serde_json::json!({
                "config_dir": config_dir.display().to_string(),
                "settings_file": settings_path.display().to_string(),
                "credentials_file": credentials_path.display().to_string(),
                "usage_cache_file": cache_path.display().to_string(),
            });
            let formatter = JsonFormatter::new(cli.pretty, Evaluator::default());
            println!("{}", formatter.format(&paths)?);
        }
    }

    Ok(())
}

async fn init_config(store: &SettingsStore, force: bool) -> Result<()> {
    let path = store.path();
    if !force && tokio::fs::try_exists(path).await? {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }

    store.save().await?;
    info!(path = %path.display(), "Settings written");
    println!("Wrote {}", path.display());

    Ok(())
}
