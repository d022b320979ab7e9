//! Durable record of the last good usage snapshot.
//!
//! The on-disk record carries no source tag: anything read back from disk is
//! by definition [`SnapshotSource::Cache`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};
use usagebar_core::{SnapshotSource, UsageSnapshot, clamp_percent};

use crate::error::StoreError;
use crate::persistence::{default_cache_path, load_json, remove_file, save_json};

/// Allowed clock drift for `fetched_at` in a persisted record.
const MAX_FUTURE_SKEW_SECS: i64 = 60;

// ============================================================================
// Cache Record
// ============================================================================

/// Persisted form of a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Rolling-window percentage.
    pub short_window_percent: f64,
    /// Weekly percentage.
    #[serde(default)]
    pub weekly_percent: Option<f64>,
    /// Rolling-window reset time.
    #[serde(default)]
    pub short_window_reset_at: Option<DateTime<Utc>>,
    /// Weekly reset time.
    #[serde(default)]
    pub weekly_reset_at: Option<DateTime<Utc>>,
    /// When the snapshot was obtained.
    pub fetched_at: DateTime<Utc>,
}

impl From<&UsageSnapshot> for CacheRecord {
    fn from(snapshot: &UsageSnapshot) -> Self {
        Self {
            short_window_percent: f64::from(snapshot.short_window_percent()),
            weekly_percent: snapshot.weekly_percent().map(f64::from),
            short_window_reset_at: snapshot.short_window_reset_at(),
            weekly_reset_at: snapshot.weekly_reset_at(),
            fetched_at: snapshot.fetched_at(),
        }
    }
}

impl CacheRecord {
    /// Converts the record back to a snapshot tagged as cached.
    ///
    /// Percentages are clamped. A record claiming to be from the future
    /// (beyond a small skew allowance) is rejected.
    pub fn into_snapshot(self, now: DateTime<Utc>) -> Result<UsageSnapshot, String> {
        if self.fetched_at > now + chrono::Duration::seconds(MAX_FUTURE_SKEW_SECS) {
            return Err(format!("fetched_at {} is in the future", self.fetched_at));
        }
        Ok(UsageSnapshot::new(
            clamp_percent(self.short_window_percent),
            self.weekly_percent.map(clamp_percent),
            self.fetched_at,
        )
        .with_short_window_reset(self.short_window_reset_at)
        .with_weekly_reset(self.weekly_reset_at)
        .with_source(SnapshotSource::Cache))
    }
}

// ============================================================================
// Usage Cache
// ============================================================================

/// File-backed usage cache.
#[derive(Debug, Clone)]
pub struct UsageCache {
    path: PathBuf,
}

impl UsageCache {
    /// Creates a cache backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates a cache at the default location.
    pub fn at_default_path() -> Self {
        Self::new(default_cache_path())
    }

    /// The backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the cached snapshot, always tagged [`SnapshotSource::Cache`].
    ///
    /// A missing or corrupt record reads as absent.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn read(&self) -> Option<UsageSnapshot> {
        let record = match load_json::<CacheRecord>(&self.path).await {
            Ok(record) => record,
            Err(e) if e.is_not_found() => {
                debug!("No cached usage");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "Malformed usage cache, treating as absent");
                return None;
            }
        };

        match record.into_snapshot(Utc::now()) {
            Ok(snapshot) => Some(snapshot),
            Err(reason) => {
                let err = StoreError::InvalidRecord {
                    path: self.path.display().to_string(),
                    reason,
                };
                warn!(error = %err, "Rejecting cached usage");
                None
            }
        }
    }

    /// Persists a snapshot, replacing the previous one atomically.
    #[instrument(skip(self, snapshot), fields(path = %self.path.display()))]
    pub async fn write(&self, snapshot: &UsageSnapshot) -> Result<(), StoreError> {
        save_json(&self.path, &CacheRecord::from(snapshot)).await?;
        debug!(
            short_window = snapshot.short_window_percent(),
            weekly = ?snapshot.weekly_percent(),
            "Usage cached"
        );
        Ok(())
    }

    /// Discards the cached snapshot. Returns true if one existed.
    pub async fn clear(&self) -> Result<bool, StoreError> {
        remove_file(&self.path).await
    }
}
