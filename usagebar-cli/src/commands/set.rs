//! Set command - record a usage reading by hand.

use anyhow::Result;
use clap::Args;
use usagebar_store::SettingsStore;

use crate::engine::Engine;
use crate::output::render_report;
use crate::{Cli, ExitCode};

/// Arguments for the set command.
#[derive(Args)]
pub struct SetArgs {
    /// Short-window percentage used (0-100, decimals are rounded).
    #[arg(allow_negative_numbers = true)]
    pub percent: f64,

    /// Weekly percentage used (0-100). Omitted means unknown.
    #[arg(long, short, allow_negative_numbers = true)]
    pub weekly: Option<f64>,
}

/// Runs the set command.
pub async fn run(args: &SetArgs, settings: &SettingsStore, cli: &Cli) -> Result<ExitCode> {
    let engine = Engine::open(settings).await?;
    engine.coordinator.set_manual(args.percent, args.weekly).await?;

    let report = engine.coordinator.report().await;
    println!("{}", render_report(&report, engine.coordinator.config().evaluator, cli)?);
    Ok(ExitCode::Success)
}
