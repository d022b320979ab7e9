//! Usage-related types.
//!
//! This module contains types related to quota tracking:
//! - [`UsageSnapshot`] - One immutable reading of both quota windows
//! - [`QuotaWindow`] - Which of the two overlapping windows
//! - [`SnapshotSource`] - Live fetch vs. read back from the cache

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// Quota Window
// ============================================================================

/// One of the two overlapping quota windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaWindow {
    /// Rolling window (hours-scale, five hours on claude.ai).
    ShortWindow,
    /// Weekly window.
    Weekly,
}

impl QuotaWindow {
    /// Returns a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ShortWindow => "Session (5h)",
            Self::Weekly => "Weekly",
        }
    }
}

impl std::fmt::Display for QuotaWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ============================================================================
// Snapshot Source
// ============================================================================

/// Where a snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotSource {
    /// Produced by a successful fetch during this cycle.
    Live,
    /// Read back from durable storage (or written manually).
    #[default]
    Cache,
}

impl SnapshotSource {
    /// Returns a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Cache => "cache",
        }
    }
}

impl std::fmt::Display for SnapshotSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ============================================================================
// Percent helpers
// ============================================================================

/// Converts a raw utilization figure to an integer percentage in `[0, 100]`.
///
/// NaN and negative values become 0, anything above 100 becomes 100.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn clamp_percent(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }
    raw.round().clamp(0.0, 100.0) as u8
}

fn de_percent<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let raw = f64::deserialize(deserializer)?;
    Ok(clamp_percent(raw))
}

fn de_percent_opt<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u8>, D::Error> {
    let raw = Option::<f64>::deserialize(deserializer)?;
    Ok(raw.map(clamp_percent))
}

// ============================================================================
// Usage Snapshot
// ============================================================================

/// One captured reading of both quota percentages plus fetch time.
///
/// Snapshots are never mutated after construction: the builder-style
/// `with_*` methods consume and return a new value. Percentages are clamped
/// to `[0, 100]` on every construction path, including deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    #[serde(deserialize_with = "de_percent")]
    short_window_percent: u8,
    #[serde(default, deserialize_with = "de_percent_opt")]
    weekly_percent: Option<u8>,
    #[serde(default)]
    short_window_reset_at: Option<DateTime<Utc>>,
    #[serde(default)]
    weekly_reset_at: Option<DateTime<Utc>>,
    fetched_at: DateTime<Utc>,
    #[serde(default)]
    source: SnapshotSource,
}

impl UsageSnapshot {
    /// Creates a live snapshot from integer percentages.
    pub fn new(short_window_percent: u8, weekly_percent: Option<u8>, fetched_at: DateTime<Utc>) -> Self {
        Self {
            short_window_percent: short_window_percent.min(100),
            weekly_percent: weekly_percent.map(|p| p.min(100)),
            short_window_reset_at: None,
            weekly_reset_at: None,
            fetched_at,
            source: SnapshotSource::Live,
        }
    }

    /// Creates a live snapshot from raw utilization figures as reported by the API.
    pub fn from_utilization(short_window: f64, weekly: Option<f64>, fetched_at: DateTime<Utc>) -> Self {
        Self::new(clamp_percent(short_window), weekly.map(clamp_percent), fetched_at)
    }

    /// Creates a manually entered snapshot.
    ///
    /// Manual readings never came from the network, so they are tagged
    /// [`SnapshotSource::Cache`] from the start.
    pub fn manual(short_window_percent: u8, weekly_percent: Option<u8>, now: DateTime<Utc>) -> Self {
        Self::new(short_window_percent, weekly_percent, now).with_source(SnapshotSource::Cache)
    }

    /// Returns a copy with the short-window reset time set.
    #[must_use]
    pub fn with_short_window_reset(mut self, reset_at: Option<DateTime<Utc>>) -> Self {
        self.short_window_reset_at = reset_at;
        self
    }

    /// Returns a copy with the weekly reset time set.
    #[must_use]
    pub fn with_weekly_reset(mut self, reset_at: Option<DateTime<Utc>>) -> Self {
        self.weekly_reset_at = reset_at;
        self
    }

    /// Returns a copy tagged with the given source.
    #[must_use]
    pub fn with_source(mut self, source: SnapshotSource) -> Self {
        self.source = source;
        self
    }

    /// Percentage of the rolling-window quota consumed.
    pub fn short_window_percent(&self) -> u8 {
        self.short_window_percent
    }

    /// Percentage of the weekly quota consumed, if the account has one.
    pub fn weekly_percent(&self) -> Option<u8> {
        self.weekly_percent
    }

    /// When the rolling window next resets.
    pub fn short_window_reset_at(&self) -> Option<DateTime<Utc>> {
        self.short_window_reset_at
    }

    /// When the weekly window next resets.
    pub fn weekly_reset_at(&self) -> Option<DateTime<Utc>> {
        self.weekly_reset_at
    }

    /// When this snapshot was obtained.
    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    /// Where this snapshot came from.
    pub fn source(&self) -> SnapshotSource {
        self.source
    }

    /// Returns the percentage for a window.
    pub fn percent_for(&self, window: QuotaWindow) -> Option<u8> {
        match window {
            QuotaWindow::ShortWindow => Some(self.short_window_percent),
            QuotaWindow::Weekly => self.weekly_percent,
        }
    }

    /// Returns the reset time for a window.
    pub fn reset_for(&self, window: QuotaWindow) -> Option<DateTime<Utc>> {
        match window {
            QuotaWindow::ShortWindow => self.short_window_reset_at,
            QuotaWindow::Weekly => self.weekly_reset_at,
        }
    }

    /// Returns the window holding the highest percentage.
    ///
    /// Ties go to the short window. An absent weekly figure never wins.
    pub fn constraining_window(&self) -> QuotaWindow {
        match self.weekly_percent {
            Some(weekly) if weekly > self.short_window_percent => QuotaWindow::Weekly,
            _ => QuotaWindow::ShortWindow,
        }
    }

    /// Returns `max(short_window_percent, weekly_percent)`.
    pub fn peak_percent(&self) -> u8 {
        self.weekly_percent
            .map_or(self.short_window_percent, |w| w.max(self.short_window_percent))
    }

    /// Age of the snapshot at `now`, never negative.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.fetched_at).max(Duration::zero())
    }

    /// Time until a window resets, if its reset time is known.
    ///
    /// Returns a zero duration once the reset time has passed.
    pub fn time_until_reset(&self, window: QuotaWindow, now: DateTime<Utc>) -> Option<Duration> {
        self.reset_for(window)
            .map(|reset| (reset - now).max(Duration::zero()))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_clamp_percent() {
        assert_eq!(clamp_percent(45.4), 45);
        assert_eq!(clamp_percent(45.5), 46);
        assert_eq!(clamp_percent(-3.0), 0);
        assert_eq!(clamp_percent(250.0), 100);
        assert_eq!(clamp_percent(f64::NAN), 0);
        assert_eq!(clamp_percent(f64::INFINITY), 100);
        assert_eq!(clamp_percent(f64::NEG_INFINITY), 0);
    }

    #[test]
    fn test_new_clamps_integer_percentages() {
        let snapshot = UsageSnapshot::new(130, Some(200), t0());
        assert_eq!(snapshot.short_window_percent(), 100);
        assert_eq!(snapshot.weekly_percent(), Some(100));
        assert_eq!(snapshot.source(), SnapshotSource::Live);
    }

    #[test]
    fn test_peak_percent() {
        assert_eq!(UsageSnapshot::new(45, Some(60), t0()).peak_percent(), 60);
        assert_eq!(UsageSnapshot::new(80, Some(60), t0()).peak_percent(), 80);
        assert_eq!(UsageSnapshot::new(30, None, t0()).peak_percent(), 30);
    }

    #[test]
    fn test_constraining_window() {
        assert_eq!(
            UsageSnapshot::new(45, Some(60), t0()).constraining_window(),
            QuotaWindow::Weekly
        );
        assert_eq!(
            UsageSnapshot::new(60, Some(60), t0()).constraining_window(),
            QuotaWindow::ShortWindow
        );
        assert_eq!(
            UsageSnapshot::new(10, None, t0()).constraining_window(),
            QuotaWindow::ShortWindow
        );
    }

    #[test]
    fn test_manual_is_tagged_cache() {
        let snapshot = UsageSnapshot::manual(45, None, t0());
        assert_eq!(snapshot.source(), SnapshotSource::Cache);
        assert_eq!(snapshot.fetched_at(), t0());
    }

    #[test]
    fn test_age_never_negative() {
        let snapshot = UsageSnapshot::new(10, None, t0());
        assert_eq!(snapshot.age(t0() - Duration::minutes(5)), Duration::zero());
        assert_eq!(snapshot.age(t0() + Duration::minutes(5)), Duration::minutes(5));
    }

    #[test]
    fn test_time_until_reset() {
        let reset = t0() + Duration::hours(2);
        let snapshot = UsageSnapshot::new(10, Some(20), t0()).with_short_window_reset(Some(reset));

        assert_eq!(
            snapshot.time_until_reset(QuotaWindow::ShortWindow, t0()),
            Some(Duration::hours(2))
        );
        assert_eq!(
            snapshot.time_until_reset(QuotaWindow::ShortWindow, t0() + Duration::hours(3)),
            Some(Duration::zero())
        );
        assert_eq!(snapshot.time_until_reset(QuotaWindow::Weekly, t0()), None);
    }

    #[test]
    fn test_deserialize_clamps_out_of_range() {
        let json = r#"{
            "short_window_percent": 140.2,
            "weekly_percent": -5,
            "fetched_at": "2025-01-01T12:00:00Z"
        }"#;
        let snapshot: UsageSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.short_window_percent(), 100);
        assert_eq!(snapshot.weekly_percent(), Some(0));
        assert_eq!(snapshot.source(), SnapshotSource::Cache);
    }
}
