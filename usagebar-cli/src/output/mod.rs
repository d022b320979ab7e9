//! Output formatting for CLI.

mod json;
mod text;

pub use json::JsonFormatter;
pub use text::TextFormatter;

use anyhow::Result;
use usagebar_core::{Evaluator, UsageReport};

use crate::{Cli, OutputFormat};

/// Renders a report in the format the user asked for.
pub fn render_report(report: &UsageReport, evaluator: Evaluator, cli: &Cli) -> Result<String> {
    match cli.format {
        OutputFormat::Text => Ok(TextFormatter::new(!cli.no_color, evaluator).format_report(report)),
        OutputFormat::Json => JsonFormatter::new(cli.pretty, evaluator).format_report(report),
    }
}
