//! User preferences store.
//!
//! Settings live in `settings.json` next to the credential and the usage
//! cache. Missing fields take their defaults, so a partial file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;
use usagebar_core::{Evaluator, StalenessPolicy, Thresholds};

use crate::error::StoreError;
use crate::persistence::{default_settings_path, load_json, save_json};

/// Smallest refresh interval accepted. The remote API is not polled faster.
pub const MIN_REFRESH_INTERVAL_SECS: u64 = 10;

/// Largest value accepted for any duration setting (30 days).
pub const MAX_DURATION_SECS: u64 = 30 * 24 * 60 * 60;

// ============================================================================
// Settings Types
// ============================================================================

/// User preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Seconds between scheduled refreshes.
    pub refresh_interval_secs: u64,

    /// Maximum snapshot age, in seconds, before it is reported offline.
    pub grace_window_secs: u64,

    /// Upper bound for one fetch.
    pub fetch_timeout_secs: u64,

    /// Upper bound for the external login helper.
    pub login_timeout_secs: u64,

    /// Lowest percentage shown as a warning.
    pub warning_threshold: u8,

    /// Lowest percentage shown as critical.
    pub critical_threshold: u8,

    /// claude.ai base URL.
    pub base_url: String,

    /// Organization to query instead of the session's last active one.
    pub organization_id: Option<String>,

    /// Login helper argv; prints a `Cookie` header on stdout.
    pub login_command: Option<Vec<String>>,

    /// Level for `usagebar` logs when neither `--verbose` nor `RUST_LOG` is given.
    pub log_level: LogLevel,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 300,
            grace_window_secs: 900,
            fetch_timeout_secs: 60,
            login_timeout_secs: 600,
            warning_threshold: 70,
            critical_threshold: 90,
            base_url: "https://claude.ai".to_string(),
            organization_id: None,
            login_command: None,
            log_level: LogLevel::default(),
        }
    }
}

impl Settings {
    /// Checks every field for a usable value.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.refresh_interval_secs < MIN_REFRESH_INTERVAL_SECS {
            return Err(StoreError::Config(format!(
                "refresh_interval_secs must be at least {MIN_REFRESH_INTERVAL_SECS} (got {})",
                self.refresh_interval_secs
            )));
        }
        for (name, secs) in [
            ("refresh_interval_secs", self.refresh_interval_secs),
            ("grace_window_secs", self.grace_window_secs),
            ("fetch_timeout_secs", self.fetch_timeout_secs),
            ("login_timeout_secs", self.login_timeout_secs),
        ] {
            if secs > MAX_DURATION_SECS {
                return Err(StoreError::Config(format!(
                    "{name} must be at most {MAX_DURATION_SECS} (got {secs})"
                )));
            }
        }
        if self.fetch_timeout_secs == 0 {
            return Err(StoreError::Config("fetch_timeout_secs must be positive".to_string()));
        }
        if self.login_timeout_secs == 0 {
            return Err(StoreError::Config("login_timeout_secs must be positive".to_string()));
        }
        if self
            .login_command
            .as_ref()
            .is_some_and(|argv| argv.first().is_none_or(|p| p.trim().is_empty()))
        {
            return Err(StoreError::Config("login_command must name a program".to_string()));
        }
        Url::parse(&self.base_url)
            .map_err(|e| StoreError::Config(format!("invalid base_url {:?}: {e}", self.base_url)))?;

        self.thresholds()?;
        self.staleness_policy()?;
        Ok(())
    }

    /// Refresh interval as a duration.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    /// Fetch timeout as a duration.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Login timeout as a duration.
    pub fn login_timeout(&self) -> Duration {
        Duration::from_secs(self.login_timeout_secs)
    }

    /// Severity thresholds.
    pub fn thresholds(&self) -> Result<Thresholds, StoreError> {
        Ok(Thresholds::new(self.warning_threshold, self.critical_threshold)?)
    }

    /// Staleness limits.
    pub fn staleness_policy(&self) -> Result<StalenessPolicy, StoreError> {
        let interval = chrono_secs("refresh_interval_secs", self.refresh_interval_secs)?;
        let grace = chrono_secs("grace_window_secs", self.grace_window_secs)?;
        Ok(StalenessPolicy::new(interval, grace)?)
    }

    /// Builds the evaluator these settings describe.
    pub fn evaluator(&self) -> Result<Evaluator, StoreError> {
        Ok(Evaluator::new(self.thresholds()?, self.staleness_policy()?))
    }
}

fn chrono_secs(name: &str, secs: u64) -> Result<chrono::Duration, StoreError> {
    i64::try_from(secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .ok_or_else(|| StoreError::Config(format!("{name} is out of range (got {secs})")))
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Error level logging.
    Error,
    /// Warning level logging.
    #[default]
    Warn,
    /// Info level logging.
    Info,
    /// Debug level logging.
    Debug,
    /// Trace level logging.
    Trace,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}

// ============================================================================
// Settings Store
// ============================================================================

/// Persistent settings store.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    settings: Arc<RwLock<Settings>>,
    path: PathBuf,
}

impl SettingsStore {
    /// Creates a store holding defaults, backed by `path`.
    pub fn new(path: PathBuf) -> Self {
        Self {
            settings: Arc::new(RwLock::new(Settings::default())),
            path,
        }
    }

    /// Loads settings from the default path.
    pub async fn load_default() -> Self {
        Self::load(default_settings_path()).await
    }

    /// Loads settings from a path.
    ///
    /// A missing, malformed, or invalid file falls back to defaults.
    pub async fn load(path: PathBuf) -> Self {
        let settings = match load_json::<Settings>(&path).await {
            Ok(settings) => match settings.validate() {
                Ok(()) => {
                    info!(path = %path.display(), "Settings loaded");
                    settings
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Invalid settings, using defaults");
                    Settings::default()
                }
            },
            Err(e) if e.is_not_found() => {
                debug!(path = %path.display(), "Settings file not found, using defaults");
                Settings::default()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to load settings, using defaults");
                Settings::default()
            }
        };

        Self {
            settings: Arc::new(RwLock::new(settings)),
            path,
        }
    }

    /// The backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory holding the settings file and its sibling state files.
    pub fn dir(&self) -> PathBuf {
        self.path
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
    }

    /// Gets a copy of the current settings.
    pub async fn get(&self) -> Settings {
        self.settings.read().await.clone()
    }

    /// Updates settings in memory after validating the result.
    pub async fn update<F>(&self, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Settings),
    {
        let mut settings = self.settings.write().await;
        let mut candidate = settings.clone();
        f(&mut candidate);
        candidate.validate()?;
        *settings = candidate;
        Ok(())
    }

    /// Saves settings to disk.
    pub async fn save(&self) -> Result<(), StoreError> {
        let settings = self.settings.read().await;
        save_json(&self.path, &*settings).await?;
        info!(path = %self.path.display(), "Settings saved");
        Ok(())
    }
}
