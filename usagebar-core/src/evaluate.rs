//! Staleness and severity evaluation.
//!
//! The [`Evaluator`] is pure: it never performs I/O and never fails. All of
//! its inputs are tunable through [`Thresholds`] and [`StalenessPolicy`].

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::models::{Severity, Staleness, UsageSnapshot};

// ============================================================================
// Thresholds
// ============================================================================

/// Percent thresholds separating the severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    warning: u8,
    critical: u8,
}

impl Thresholds {
    /// Creates thresholds, requiring `0 < warning < critical <= 100`.
    pub fn new(warning: u8, critical: u8) -> Result<Self, CoreError> {
        if warning == 0 || warning >= critical || critical > 100 {
            return Err(CoreError::InvalidConfig(format!(
                "thresholds must satisfy 0 < warning < critical <= 100 (got {warning}/{critical})"
            )));
        }
        Ok(Self { warning, critical })
    }

    /// Lowest percentage reported as [`Severity::Warning`].
    pub fn warning(&self) -> u8 {
        self.warning
    }

    /// Lowest percentage reported as [`Severity::Critical`].
    pub fn critical(&self) -> u8 {
        self.critical
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            warning: 70,
            critical: 90,
        }
    }
}

// ============================================================================
// Staleness Policy
// ============================================================================

/// Age limits separating the staleness classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StalenessPolicy {
    refresh_interval: Duration,
    grace_window: Duration,
}

impl StalenessPolicy {
    /// Creates a policy. The grace window is measured from `fetched_at` and
    /// must not be shorter than the refresh interval.
    pub fn new(refresh_interval: Duration, grace_window: Duration) -> Result<Self, CoreError> {
        if refresh_interval <= Duration::zero() {
            return Err(CoreError::InvalidConfig(
                "refresh interval must be positive".to_string(),
            ));
        }
        if grace_window < refresh_interval {
            return Err(CoreError::InvalidConfig(format!(
                "grace window ({}s) must not be shorter than the refresh interval ({}s)",
                grace_window.num_seconds(),
                refresh_interval.num_seconds()
            )));
        }
        Ok(Self {
            refresh_interval,
            grace_window,
        })
    }

    /// Expected time between refreshes.
    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    /// Maximum age before data is reported as offline.
    pub fn grace_window(&self) -> Duration {
        self.grace_window
    }
}

impl Default for StalenessPolicy {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::minutes(5),
            grace_window: Duration::minutes(15),
        }
    }
}

// ============================================================================
// Evaluator
// ============================================================================

/// Staleness and severity of an optional snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessment {
    /// Age class; [`Staleness::Unknown`] when there is no snapshot.
    pub staleness: Staleness,
    /// Urgency; `None` when there is no snapshot.
    pub severity: Option<Severity>,
}

/// Computes staleness and severity for snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Evaluator {
    thresholds: Thresholds,
    policy: StalenessPolicy,
}

impl Evaluator {
    /// Creates an evaluator.
    pub fn new(thresholds: Thresholds, policy: StalenessPolicy) -> Self {
        Self { thresholds, policy }
    }

    /// The configured thresholds.
    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    /// The configured staleness policy.
    pub fn policy(&self) -> StalenessPolicy {
        self.policy
    }

    /// Evaluates a snapshot at `now`.
    pub fn evaluate(&self, snapshot: &UsageSnapshot, now: DateTime<Utc>) -> (Staleness, Severity) {
        (
            self.staleness_of(snapshot, now),
            self.severity_for(snapshot.peak_percent()),
        )
    }

    /// Evaluates an optional snapshot. No snapshot is unknown with no severity.
    pub fn assess(&self, snapshot: Option<&UsageSnapshot>, now: DateTime<Utc>) -> Assessment {
        match snapshot {
            Some(snapshot) => {
                let (staleness, severity) = self.evaluate(snapshot, now);
                Assessment {
                    staleness,
                    severity: Some(severity),
                }
            }
            None => Assessment {
                staleness: Staleness::Unknown,
                severity: None,
            },
        }
    }

    /// Staleness class of a snapshot at `now`.
    pub fn staleness_of(&self, snapshot: &UsageSnapshot, now: DateTime<Utc>) -> Staleness {
        let age = snapshot.age(now);
        if age <= self.policy.refresh_interval {
            Staleness::Fresh
        } else if age <= self.policy.grace_window {
            Staleness::Stale
        } else {
            Staleness::Unknown
        }
    }

    /// Severity of a single percentage.
    pub fn severity_for(&self, percent: u8) -> Severity {
        if percent >= self.thresholds.critical {
            Severity::Critical
        } else if percent >= self.thresholds.warning {
            Severity::Warning
        } else {
            Severity::Normal
        }
    }
}
