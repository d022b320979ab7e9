//! Watch command - keep refreshing and redraw on every change.

use anyhow::Result;
use clap::Args;
use std::io::{Write, stdout};
use tracing::info;
use usagebar_core::UsageReport;
use usagebar_store::{MAX_DURATION_SECS, MIN_REFRESH_INTERVAL_SECS, Settings, SettingsStore};

use crate::engine::Engine;
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for watch command.
#[derive(Args)]
pub struct WatchArgs {
    /// Refresh interval in seconds. Overrides the settings file.
    #[arg(long, short)]
    pub interval: Option<u64>,
}

/// Runs the watch command.
pub async fn run(args: &WatchArgs, settings: &SettingsStore, cli: &Cli) -> Result<ExitCode> {
    let mut config = settings.get().await;
    if let Some(secs) = args.interval {
        override_interval(&mut config, secs);
    }
    let engine = Engine::open_with(config, settings).await?;
    let coordinator = engine.coordinator.clone();
    let evaluator = coordinator.config().evaluator;
    let interval_secs = engine.settings.refresh_interval_secs;

    info!(interval = interval_secs, "Starting watch mode");

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let runner = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move {
            coordinator
                .run(async {
                    let _ = stop_rx.await;
                })
                .await;
        })
    };

    let mut changes = coordinator.subscribe();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        let report = coordinator.report().await;
        match cli.format {
            OutputFormat::Text => {
                draw(&TextFormatter::new(!cli.no_color, evaluator), &report, interval_secs)?;
            }
            OutputFormat::Json => {
                // One compact document per line
                println!("{}", JsonFormatter::new(false, evaluator).format_report(&report)?);
            }
        }

        tokio::select! {
            _ = &mut ctrl_c => break,
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    let _ = stop_tx.send(());
    runner.await?;
    info!("Watch mode stopped");
    Ok(ExitCode::Success)
}

/// Applies `--interval`, keeping the result within the accepted range.
fn override_interval(settings: &mut Settings, secs: u64) {
    let secs = secs.clamp(MIN_REFRESH_INTERVAL_SECS, MAX_DURATION_SECS);
    settings.refresh_interval_secs = secs;
    settings.grace_window_secs = settings.grace_window_secs.max(secs);
}

fn draw(formatter: &TextFormatter, report: &UsageReport, interval_secs: u64) -> Result<()> {
    // Clear screen
    print!("\x1b[2J\x1b[H");
    stdout().flush()?;

    let now = chrono::Local::now();
    println!(
        "{} - {} - {} (refresh: {}s)",
        formatter.bold("usagebar watch"),
        formatter.format_status_line(report),
        now.format("%H:%M:%S"),
        interval_secs
    );
    println!("{}", "─".repeat(50));
    println!();
    println!("{}", formatter.format_report(report));
    println!();
    println!("Press Ctrl+C to exit");
    Ok(())
}
