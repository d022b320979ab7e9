//! Clear command - discard the cached usage.

use anyhow::Result;
use tracing::info;
use usagebar_store::SettingsStore;

use crate::engine::Engine;
use crate::output::JsonFormatter;
use crate::{Cli, ExitCode, OutputFormat};

/// Runs the clear command.
pub async fn run(settings: &SettingsStore, cli: &Cli) -> Result<ExitCode> {
    let cache = Engine::cache_for(settings);
    let removed = cache.clear().await?;
    info!(path = %cache.path().display(), removed, "Usage cache cleared");

    match cli.format {
        OutputFormat::Text => {
            if removed {
                println!("Cached usage discarded");
            } else {
                println!("No cached usage to discard");
            }
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty, usagebar_core::Evaluator::default());
            println!("{}", formatter.format(&serde_json::json!({ "cleared": removed }))?);
        }
    }

    Ok(ExitCode::Success)
}
