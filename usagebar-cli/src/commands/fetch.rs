//! Fetch command - refresh usage now.

use anyhow::Result;
use tracing::info;
use usagebar_store::SettingsStore;

use crate::engine::Engine;
use crate::output::render_report;
use crate::{Cli, ExitCode};

/// Runs the fetch command.
pub async fn run(settings: &SettingsStore, cli: &Cli) -> Result<ExitCode> {
    let engine = Engine::open(settings).await?;

    info!("Fetching usage");
    let outcome = engine.coordinator.refresh_now().await;

    let report = engine.coordinator.report().await;
    println!("{}", render_report(&report, engine.coordinator.config().evaluator, cli)?);

    // A fresh coordinator is always idle, so the refresh always runs
    Ok(outcome.as_ref().map_or(ExitCode::Success, ExitCode::for_outcome))
}
