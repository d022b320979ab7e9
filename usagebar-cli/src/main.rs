// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! usagebar CLI - Claude.ai quota usage from the command line.
//!
//! # Examples
//!
//! ```bash
//! # Show the last known usage (no network)
//! usagebar
//!
//! # Refresh now
//! usagebar fetch
//!
//! # JSON output
//! usagebar fetch --format json --pretty
//!
//! # Record a reading by hand
//! usagebar set 45 --weekly 60
//!
//! # Sign in again from a saved cookie header
//! usagebar login --cookie-file cookies.txt
//!
//! # Watch mode
//! usagebar watch --interval 120
//! ```

mod commands;
mod engine;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use usagebar_core::RefreshOutcome;
use usagebar_store::{LogLevel, SettingsStore, default_settings_path};

use commands::{clear, config, fetch, login, set, show, watch};

// ============================================================================
// CLI Definition
// ============================================================================

/// usagebar CLI - Claude.ai quota monitoring.
#[derive(Parser)]
#[command(name = "usagebar")]
#[command(about = "Claude.ai quota usage monitor")]
#[command(long_about = r#"
usagebar tracks how much of your Claude.ai quota you have used.

Two windows are reported:
  • Session (5h)  the rolling short window
  • Weekly        the seven-day window

Examples:
  usagebar                       # Last known usage, no network
  usagebar fetch                 # Refresh now
  usagebar set 45 --weekly 60    # Manual reading
  usagebar login --stdin         # Paste a Cookie header
  usagebar watch                 # Keep refreshing until Ctrl+C
"#)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run. If none, runs 'show' by default.
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Settings file to use instead of the default one.
    /// State files are kept next to it.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (minimal output).
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Refresh usage from claude.ai now.
    #[command(visible_alias = "f")]
    Fetch,

    /// Show the last known usage without touching the network (default).
    #[command(visible_alias = "s")]
    Show,

    /// Record a usage reading by hand.
    Set(set::SetArgs),

    /// Keep refreshing and redraw on every change.
    #[command(visible_alias = "w")]
    Watch(watch::WatchArgs),

    /// Sign in again and store the new session.
    Login(login::LoginArgs),

    /// Discard the cached usage.
    Clear,

    /// Manage configuration.
    Config(config::ConfigArgs),
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success.
    Success = 0,
    /// General error.
    Error = 1,
    /// No session credential stored.
    NoCredential = 2,
    /// The session was rejected.
    SessionExpired = 3,
    /// Network failure, timeout, or unexpected response.
    Transport = 4,
}

impl ExitCode {
    /// Exit code for the outcome of a refresh.
    pub fn for_outcome(outcome: &RefreshOutcome) -> Self {
        match outcome {
            RefreshOutcome::Success(_) => Self::Success,
            RefreshOutcome::NoCredential => Self::NoCredential,
            RefreshOutcome::AuthExpired => Self::SessionExpired,
            RefreshOutcome::TransportError(_) => Self::Transport,
        }
    }
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool, level: LogLevel) {
    if quiet {
        return; // No logging in quiet mode
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("usagebar=debug,info")
        } else {
            EnvFilter::new(format!("usagebar={level}"))
        }
    });

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings_path = cli.config.clone().unwrap_or_else(default_settings_path);
    let settings = SettingsStore::load(settings_path).await;
    setup_logging(cli.verbose, cli.quiet, settings.get().await.log_level);

    let result = match &cli.command {
        Some(Commands::Fetch) => fetch::run(&settings, &cli).await,
        Some(Commands::Show) | None => show::run(&settings, &cli).await,
        Some(Commands::Set(args)) => set::run(args, &settings, &cli).await,
        Some(Commands::Watch(args)) => watch::run(args, &settings, &cli).await,
        Some(Commands::Login(args)) => login::run(args, &settings, &cli).await,
        Some(Commands::Clear) => clear::run(&settings, &cli).await,
        Some(Commands::Config(args)) => config::run(args, &settings, &cli).await,
    };

    match result {
        Ok(ExitCode::Success) => Ok(()),
        Ok(code) => std::process::exit(code as i32),
        Err(e) => {
            if !cli.quiet {
                eprintln!("Error: {e:#}");
            }
            std::process::exit(ExitCode::Error as i32);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use usagebar_core::UsageSnapshot;

    #[test]
    fn test_exit_codes() {
        let success = RefreshOutcome::Success(UsageSnapshot::new(1, None, Utc::now()));
        assert_eq!(ExitCode::for_outcome(&success) as i32, 0);
        assert_eq!(ExitCode::for_outcome(&RefreshOutcome::NoCredential) as i32, 2);
        assert_eq!(ExitCode::for_outcome(&RefreshOutcome::AuthExpired) as i32, 3);
        assert_eq!(
            ExitCode::for_outcome(&RefreshOutcome::TransportError("dns".into())) as i32,
            4
        );
    }

    #[test]
    fn test_cli_parses_default_command() {
        let cli = Cli::try_parse_from(["usagebar"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.format, OutputFormat::Text);
    }

    #[test]
    fn test_cli_parses_set_with_weekly() {
        let cli = Cli::try_parse_from(["usagebar", "set", "44.5", "--weekly", "60"]).unwrap();
        match cli.command {
            Some(Commands::Set(args)) => {
                assert!((args.percent - 44.5).abs() < f64::EPSILON);
                assert_eq!(args.weekly, Some(60.0));
            }
            _ => panic!("expected set"),
        }
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["usagebar", "fetch", "--format", "json", "--pretty"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Fetch)));
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(cli.pretty);
    }

    #[test]
    fn test_cli_login_sources_conflict() {
        assert!(
            Cli::try_parse_from(["usagebar", "login", "--stdin", "--cookie-file", "c.txt"]).is_err()
        );
    }
}
