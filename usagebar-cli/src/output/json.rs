//! JSON output formatting.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use usagebar_core::{Evaluator, QuotaWindow, Severity, Staleness, UsageReport, UsageSnapshot};

// ============================================================================
// Output Types
// ============================================================================

/// JSON output for a report.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageOutput>,
    pub staleness: Staleness,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    pub needs_renewal: bool,
    pub refreshing: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(serialize_with = "serialize_datetime")]
    pub generated_at: DateTime<Utc>,
}

/// Both quota windows of a snapshot.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageOutput {
    pub short_window: WindowOutput,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekly: Option<WindowOutput>,
    pub constraining_window: QuotaWindow,
    pub peak_percent: u8,
    pub source: String,
    #[serde(serialize_with = "serialize_datetime")]
    pub fetched_at: DateTime<Utc>,
    pub age_seconds: i64,
}

/// A single quota window.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowOutput {
    pub used_percent: u8,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_datetime_opt")]
    pub resets_at: Option<DateTime<Utc>>,
}

// ============================================================================
// Serialization helpers
// ============================================================================

fn serialize_datetime<S>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    s.serialize_str(&dt.to_rfc3339())
}

#[allow(clippy::ref_option)]
fn serialize_datetime_opt<S>(dt: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match dt {
        Some(dt) => s.serialize_str(&dt.to_rfc3339()),
        None => s.serialize_none(),
    }
}

// ============================================================================
// JSON Formatter
// ============================================================================

/// JSON formatter.
pub struct JsonFormatter {
    pretty: bool,
    evaluator: Evaluator,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool, evaluator: Evaluator) -> Self {
        Self { pretty, evaluator }
    }

    /// Formats any serializable value.
    pub fn format<T: Serialize>(&self, data: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        Ok(json)
    }

    /// Formats a report.
    pub fn format_report(&self, report: &UsageReport) -> Result<String> {
        self.format(&self.report_to_output(report))
    }

    /// Converts a report to output.
    pub fn report_to_output(&self, report: &UsageReport) -> ReportOutput {
        ReportOutput {
            usage: report
                .snapshot
                .as_ref()
                .map(|snapshot| self.snapshot_to_output(snapshot, report.generated_at)),
            staleness: report.staleness,
            severity: report.severity,
            needs_renewal: report.needs_renewal,
            refreshing: report.refreshing,
            error: report.last_error.clone(),
            generated_at: report.generated_at,
        }
    }

    fn snapshot_to_output(&self, snapshot: &UsageSnapshot, now: DateTime<Utc>) -> UsageOutput {
        UsageOutput {
            short_window: self.window_to_output(
                snapshot.short_window_percent(),
                snapshot.short_window_reset_at(),
            ),
            weekly: snapshot
                .weekly_percent()
                .map(|percent| self.window_to_output(percent, snapshot.weekly_reset_at())),
            constraining_window: snapshot.constraining_window(),
            peak_percent: snapshot.peak_percent(),
            source: snapshot.source().label().to_string(),
            fetched_at: snapshot.fetched_at(),
            age_seconds: snapshot.age(now).num_seconds(),
        }
    }

    fn window_to_output(&self, percent: u8, resets_at: Option<DateTime<Utc>>) -> WindowOutput {
        WindowOutput {
            used_percent: percent,
            severity: self.evaluator.severity_for(percent),
            resets_at,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
