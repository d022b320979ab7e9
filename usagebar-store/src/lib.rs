// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `usagebar` Store
//!
//! Durable state and the usage-state engine for `usagebar`.
//!
//! This crate provides:
//!
//! - **CredentialStore**: The session credential, owner-only on disk
//! - **UsageCache**: Last good snapshot, crash-safe on disk
//! - **SettingsStore**: User preferences with validation
//! - **RefreshCoordinator**: The `Idle / Fetching / Cooldown` refresh cycle
//! - **SessionRenewal**: Login, store, refresh
//!
//! ## Usage
//!
//! ```ignore
//! use usagebar_store::{CoordinatorConfig, CredentialStore, RefreshCoordinator, UsageCache};
//!
//! let coordinator = RefreshCoordinator::new(
//!     Arc::new(fetcher),
//!     CredentialStore::at_default_path(),
//!     UsageCache::at_default_path(),
//!     CoordinatorConfig::default(),
//! );
//! coordinator.load().await;
//!
//! // Periodic refresh until Ctrl+C
//! coordinator.run(async { let _ = tokio::signal::ctrl_c().await; }).await;
//! ```

pub mod coordinator;
pub mod credential_store;
pub mod error;
pub mod persistence;
pub mod renewal;
pub mod settings;
pub mod state;
pub mod usage_cache;

pub use coordinator::{CoordinatorConfig, RefreshCoordinator};
pub use credential_store::CredentialStore;
pub use error::StoreError;
pub use persistence::{
    CREDENTIALS_FILE, SETTINGS_FILE, USAGE_CACHE_FILE, default_cache_path, default_config_dir,
    default_credentials_path, default_settings_path, load_json, save_json,
};
pub use renewal::SessionRenewal;
pub use settings::{LogLevel, MAX_DURATION_SECS, MIN_REFRESH_INTERVAL_SECS, Settings, SettingsStore};
pub use state::{RefreshEvent, RefreshPhase, RefreshTrigger, transition};
pub use usage_cache::{CacheRecord, UsageCache};

#[cfg(test)]
mod coordinator_tests;
