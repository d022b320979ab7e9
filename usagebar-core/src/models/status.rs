//! Staleness, severity, and the report handed to presentation layers.
//!
//! - [`Staleness`] - How old a snapshot is relative to the refresh cadence
//! - [`Severity`] - User-facing urgency derived from the worse window
//! - [`UsageReport`] - Snapshot plus both computed values in one value

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::usage::UsageSnapshot;

// ============================================================================
// Staleness
// ============================================================================

/// Age class of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Staleness {
    /// Within one refresh interval.
    Fresh,
    /// Older than one interval but within the grace window.
    Stale,
    /// No snapshot, or older than the grace window. Treated as offline.
    Unknown,
}

impl Staleness {
    /// Returns a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Fresh => "Fresh",
            Self::Stale => "Stale",
            Self::Unknown => "Offline",
        }
    }

    /// Returns true if the data should be presented as offline.
    pub fn is_offline(&self) -> bool {
        *self == Self::Unknown
    }
}

impl std::fmt::Display for Staleness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ============================================================================
// Severity
// ============================================================================

/// Urgency level derived from the higher of the two percentages.
///
/// Ordered: `Normal < Warning < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Below the warning threshold.
    Normal,
    /// At or above the warning threshold, below critical.
    Warning,
    /// At or above the critical threshold.
    Critical,
}

impl Severity {
    /// Returns a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Warning => "Warning",
            Self::Critical => "Critical",
        }
    }

    /// Returns an emoji for the level.
    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Normal => "🟢",
            Self::Warning => "🟡",
            Self::Critical => "🔴",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.emoji(), self.label())
    }
}

// ============================================================================
// Usage Report
// ============================================================================

/// Everything a presentation layer needs, computed in one place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageReport {
    /// Latest known snapshot, live or cached.
    pub snapshot: Option<UsageSnapshot>,
    /// Staleness of `snapshot` at `generated_at`.
    pub staleness: Staleness,
    /// Severity of `snapshot`; `None` only when there is no snapshot.
    pub severity: Option<Severity>,
    /// The session was rejected and must be renewed.
    pub needs_renewal: bool,
    /// A fetch is in flight.
    pub refreshing: bool,
    /// Failure description of the most recent refresh attempt, if it failed.
    pub last_error: Option<String>,
    /// When this report was computed.
    pub generated_at: DateTime<Utc>,
}

impl UsageReport {
    /// Returns the peak percentage, if a snapshot is available.
    pub fn peak_percent(&self) -> Option<u8> {
        self.snapshot.as_ref().map(UsageSnapshot::peak_percent)
    }
}
