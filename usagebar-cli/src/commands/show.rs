//! Show command - last known usage, no network.

use anyhow::Result;
use usagebar_store::SettingsStore;

use crate::engine::Engine;
use crate::output::render_report;
use crate::{Cli, ExitCode};

/// Runs the show command.
pub async fn run(settings: &SettingsStore, cli: &Cli) -> Result<ExitCode> {
    let engine = Engine::open(settings).await?;
    let report = engine.coordinator.report().await;
    println!("{}", render_report(&report, engine.coordinator.config().evaluator, cli)?);
    Ok(ExitCode::Success)
}
