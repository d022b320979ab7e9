// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `usagebar` Core
//!
//! Core types, evaluation rules, and capability traits for `usagebar`.
//!
//! This crate has no I/O. It provides:
//!
//! - The usage data model (snapshots, credentials, refresh outcomes)
//! - The pure staleness & severity [`Evaluator`]
//! - The [`UsageReport`] handed to presentation layers
//! - The capability traits the engine is wired with
//!
//! ## Key Types
//!
//! ### Usage
//! - [`UsageSnapshot`] - One immutable reading of both quota windows
//! - [`QuotaWindow`] - Short (rolling) window or weekly window
//! - [`SnapshotSource`] - Whether a snapshot is live or read back from cache
//!
//! ### Session
//! - [`Credential`] - Opaque set of session tokens
//! - [`RefreshOutcome`] - Tagged result of one refresh attempt
//! - [`RenewalOutcome`] - Result of a session renewal
//!
//! ### Evaluation
//! - [`Evaluator`] - Computes [`Staleness`] and [`Severity`]
//! - [`Thresholds`] / [`StalenessPolicy`] - Tunable evaluation inputs
//!
//! ### Capabilities
//! - [`UsageFetcher`] - One authenticated query against the remote quota API
//! - [`CredentialAcquirer`] - The opaque interactive login step

pub mod error;
pub mod evaluate;
pub mod models;
pub mod traits;

// Re-export error types
pub use error::CoreError;

// Re-export evaluation types
pub use evaluate::{Assessment, Evaluator, StalenessPolicy, Thresholds};

// Re-export all model types
pub use models::{
    // Session
    AcquireError,
    Credential,
    ORGANIZATION_TOKEN,
    RefreshOutcome,
    SESSION_TOKEN,
    RenewalOutcome,
    // Usage
    QuotaWindow,
    SnapshotSource,
    UsageSnapshot,
    clamp_percent,
    // Status
    Severity,
    Staleness,
    UsageReport,
};

// Re-export traits
pub use traits::{CredentialAcquirer, UsageFetcher};
