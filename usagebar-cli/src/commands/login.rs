//! Login command - renew the session credential.

use anyhow::{Context, Result, bail};
use clap::Args;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::debug;
use usagebar_core::{CredentialAcquirer, RenewalOutcome};
use usagebar_fetch::{CommandAcquirer, CookieHeaderAcquirer};
use usagebar_store::{SessionRenewal, Settings, SettingsStore};

use crate::engine::Engine;
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the login command.
#[derive(Args, Default)]
pub struct LoginArgs {
    /// Import a `Cookie` header saved to a text file.
    #[arg(long, value_name = "PATH", conflicts_with = "stdin")]
    pub cookie_file: Option<PathBuf>,

    /// Read a `Cookie` header from standard input.
    #[arg(long)]
    pub stdin: bool,
}

/// Runs the login command.
pub async fn run(args: &LoginArgs, settings: &SettingsStore, cli: &Cli) -> Result<ExitCode> {
    let engine = Engine::open(settings).await?;
    let acquirer = select_acquirer(args, &engine.settings, settings).await?;

    let renewal = SessionRenewal::new(
        acquirer,
        engine.credentials.clone(),
        engine.coordinator.clone(),
    );
    let (outcome, refresh) = renewal.renew_and_refresh().await;
    let report = engine.coordinator.report().await;
    let evaluator = engine.coordinator.config().evaluator;

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color, evaluator);
            println!("{}", login_message(&outcome));
            if outcome == RenewalOutcome::Renewed {
                println!();
                println!("{}", formatter.format_report(&report));
            }
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty, evaluator);
            let output = serde_json::json!({
                "renewal": outcome,
                "report": formatter.report_to_output(&report),
            });
            println!("{}", formatter.format(&output)?);
        }
    }

    Ok(match outcome {
        RenewalOutcome::Renewed => refresh
            .as_ref()
            .map_or(ExitCode::Success, ExitCode::for_outcome),
        RenewalOutcome::Cancelled | RenewalOutcome::Failed(_) => ExitCode::Error,
    })
}

/// Picks the login capability: explicit flags first, then the configured helper.
async fn select_acquirer(
    args: &LoginArgs,
    settings: &Settings,
    store: &SettingsStore,
) -> Result<Arc<dyn CredentialAcquirer>> {
    if let Some(path) = &args.cookie_file {
        debug!(path = %path.display(), "Importing cookie file");
        return Ok(Arc::new(CookieHeaderAcquirer::from_file(path)));
    }

    if args.stdin {
        if std::io::stdin().is_terminal() {
            eprintln!("Paste the Cookie header from a signed-in claude.ai tab, then press Ctrl+D:");
        }
        let mut text = String::new();
        tokio::io::stdin()
            .read_to_string(&mut text)
            .await
            .context("cannot read standard input")?;
        return Ok(Arc::new(CookieHeaderAcquirer::from_text(text)));
    }

    let argv = settings.login_command.as_deref().unwrap_or_default();
    match CommandAcquirer::from_argv(argv, settings.login_timeout()) {
        Some(acquirer) => {
            debug!(program = acquirer.program(), "Using login helper");
            Ok(Arc::new(acquirer))
        }
        None => bail!(
            "no login method: pass --cookie-file or --stdin, or set login_command in {}",
            store.path().display()
        ),
    }
}

fn login_message(outcome: &RenewalOutcome) -> String {
    match outcome {
        RenewalOutcome::Renewed => "Signed in".to_string(),
        RenewalOutcome::Cancelled => "Login cancelled, stored session unchanged".to_string(),
        RenewalOutcome::Failed(reason) => format!("Login failed: {reason}"),
    }
}
