//! Text output formatting with progress bars and colors.

use chrono::{DateTime, Duration, Utc};
use usagebar_core::{Evaluator, QuotaWindow, Severity, Staleness, UsageReport, UsageSnapshot};

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";

// Progress bar characters
const BAR_FULL: char = '█';
const BAR_EMPTY: char = '░';

const LOGIN_HINT: &str = "Session expired. Run `usagebar login` to sign in again.";

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
    evaluator: Evaluator,
    bar_width: usize,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool, evaluator: Evaluator) -> Self {
        Self {
            use_colors,
            evaluator,
            bar_width: 10,
        }
    }

    /// Formats a full report. Countdowns are relative to `generated_at`.
    pub fn format_report(&self, report: &UsageReport) -> String {
        let mut lines = Vec::new();

        let header = match report.severity {
            Some(severity) => format!(
                "{}  {}",
                self.bold("Claude usage"),
                self.color_for_severity(severity, &severity.to_string())
            ),
            None => self.bold("Claude usage"),
        };
        lines.push(header);

        match &report.snapshot {
            Some(snapshot) => {
                for window in [QuotaWindow::ShortWindow, QuotaWindow::Weekly] {
                    if let Some(line) = self.format_window(snapshot, window, report.generated_at) {
                        lines.push(line);
                    }
                }
                lines.push(self.format_freshness(snapshot, report.staleness, report.generated_at));
            }
            None => {
                lines.push(self.dim("No usage data yet. Run `usagebar fetch` or `usagebar set <PERCENT>`."));
            }
        }

        if report.refreshing {
            lines.push(self.dim("Refreshing…"));
        }
        if let Some(error) = &report.last_error {
            lines.push(format!("{} {}", self.red("Last refresh failed:"), error));
        }
        if report.needs_renewal {
            lines.push(self.yellow(LOGIN_HINT));
        }

        lines.join("\n")
    }

    /// Formats one quota window, or `None` if the snapshot has no value for it.
    fn format_window(
        &self,
        snapshot: &UsageSnapshot,
        window: QuotaWindow,
        now: DateTime<Utc>,
    ) -> Option<String> {
        let percent = snapshot.percent_for(window)?;
        let severity = self.evaluator.severity_for(percent);
        let bar = self.color_for_severity(severity, &self.progress_bar(percent));
        let pct = self.color_for_severity(severity, &format!("{percent:>3}% used"));

        let mut line = format!("{:<14} {} {} {}", format!("{}:", window.label()), bar, pct, severity.emoji());
        if let Some(remaining) = snapshot.time_until_reset(window, now) {
            line.push_str("  ");
            line.push_str(&self.dim(&format_reset(remaining)));
        }
        Some(line)
    }

    fn format_freshness(&self, snapshot: &UsageSnapshot, staleness: Staleness, now: DateTime<Utc>) -> String {
        let updated = format!(
            "Updated {} ({})",
            format_age(snapshot.age(now)),
            snapshot.source()
        );
        match staleness {
            Staleness::Fresh => self.dim(&updated),
            Staleness::Stale => format!("{} {}", self.dim(&updated), self.yellow("(Stale)")),
            Staleness::Unknown => format!("{} {}", self.dim(&updated), self.red("(Offline)")),
        }
    }

    /// Formats a progress bar for a used percentage.
    pub fn progress_bar(&self, percent_used: u8) -> String {
        let filled = (usize::from(percent_used.min(100)) * self.bar_width + 50) / 100;
        let empty = self.bar_width.saturating_sub(filled);

        format!(
            "{}{}",
            BAR_FULL.to_string().repeat(filled),
            BAR_EMPTY.to_string().repeat(empty)
        )
    }

    /// Formats a one-line summary for watch headers and notifications.
    pub fn format_status_line(&self, report: &UsageReport) -> String {
        match (report.peak_percent(), report.severity) {
            (Some(peak), Some(severity)) => {
                let mut line = format!("{} {peak}%", severity.emoji());
                if report.staleness.is_offline() {
                    line.push_str(" (Offline)");
                }
                line
            }
            _ => "No data".to_string(),
        }
    }

    // ========================================================================
    // Color/style helpers
    // ========================================================================

    fn color_for_severity(&self, severity: Severity, text: &str) -> String {
        match severity {
            Severity::Normal => self.green(text),
            Severity::Warning => self.yellow(text),
            Severity::Critical => self.red(text),
        }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.use_colors {
            format!("{code}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    pub fn bold(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }

    fn green(&self, text: &str) -> String {
        self.paint(GREEN, text)
    }

    fn yellow(&self, text: &str) -> String {
        self.paint(YELLOW, text)
    }

    fn red(&self, text: &str) -> String {
        self.paint(RED, text)
    }
}

/// Formats a reset countdown: "Resets in 2h 13m", or "Reset due" once passed.
pub fn format_reset(remaining: Duration) -> String {
    if remaining <= Duration::zero() {
        return "Reset due".to_string();
    }
    format!("Resets in {}", format_span(remaining))
}

/// Formats how long ago something happened.
pub fn format_age(age: Duration) -> String {
    if age < Duration::minutes(1) {
        "just now".to_string()
    } else {
        format!("{} ago", format_span(age))
    }
}

fn format_span(span: Duration) -> String {
    let days = span.num_days();
    let hours = span.num_hours() % 24;
    let mins = span.num_minutes() % 60;

    if days > 0 {
        format!("{days}d {hours}h")
    } else if hours > 0 {
        format!("{hours}h {mins}m")
    } else {
        format!("{}m", mins.max(1))
    }
}

// ============================================================================
// Tests
// ============================================================================
