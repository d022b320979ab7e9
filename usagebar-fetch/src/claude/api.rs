//! claude.ai usage API wire types.
//!
//! ```json
//! {
//!   "five_hour":  { "utilization": 45.0, "resets_at": "2025-06-01T14:00:00.000000+00:00" },
//!   "seven_day":  { "utilization": 60.0, "resets_at": "2025-06-05T09:00:00Z" },
//!   "seven_day_opus": null
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::Deserialize;
use usagebar_core::UsageSnapshot;

use crate::error::FetchError;

// ============================================================================
// Usage Response
// ============================================================================

/// Response from `GET /api/organizations/{org}/usage`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UsageResponse {
    /// Rolling five-hour window.
    #[serde(default)]
    pub five_hour: Option<UsageWindow>,
    /// Weekly window.
    #[serde(default)]
    pub seven_day: Option<UsageWindow>,
}

/// One quota window as reported by the API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UsageWindow {
    /// Percentage consumed, as a float.
    #[serde(default)]
    pub utilization: Option<f64>,
    /// Reset time (ISO 8601).
    #[serde(default)]
    pub resets_at: Option<String>,
}

impl UsageWindow {
    fn utilization(&self) -> f64 {
        self.utilization.unwrap_or(0.0)
    }

    fn reset_at(&self) -> Option<DateTime<Utc>> {
        self.resets_at.as_deref().and_then(parse_timestamp)
    }
}

impl UsageResponse {
    /// Converts the response to a live snapshot fetched at `now`.
    ///
    /// A missing five-hour window counts as 0% when the weekly window is
    /// present. A body with neither window is not a usage response.
    pub fn to_snapshot(&self, now: DateTime<Utc>) -> Result<UsageSnapshot, FetchError> {
        if self.five_hour.is_none() && self.seven_day.is_none() {
            return Err(FetchError::InvalidResponse("unexpected response".to_string()));
        }

        let short = self.five_hour.as_ref().map_or(0.0, UsageWindow::utilization);
        let weekly = self.seven_day.as_ref().map(UsageWindow::utilization);

        Ok(UsageSnapshot::from_utilization(short, weekly, now)
            .with_short_window_reset(self.five_hour.as_ref().and_then(UsageWindow::reset_at))
            .with_weekly_reset(self.seven_day.as_ref().and_then(UsageWindow::reset_at)))
    }
}

/// Parses an RFC 3339 timestamp. Unparseable values are dropped.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

// ============================================================================
// Organizations
// ============================================================================

/// One entry of `GET /api/organizations`.
#[derive(Debug, Clone, Deserialize)]
pub struct Organization {
    /// Organization identifier used in API paths.
    pub uuid: String,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
}

// ============================================================================
// Error Envelope
// ============================================================================

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(rename = "type")]
    kind: String,
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    message: Option<String>,
}

/// Checks a body for an expired-session error envelope.
///
/// Returns the error message when the body has the shape
/// `{"type":"error","error":{"type":"authentication_error"|"permission_error"}}`.
pub fn auth_error(body: &str) -> Option<String> {
    let envelope: ErrorEnvelope = serde_json::from_str(body).ok()?;
    if envelope.kind != "error" {
        return None;
    }
    match envelope.error.kind.as_str() {
        "authentication_error" | "permission_error" => Some(
            envelope
                .error
                .message
                .unwrap_or_else(|| envelope.error.kind.clone()),
        ),
        _ => None,
    }
}
