//! Domain models for usagebar.
//!
//! ## Submodules
//!
//! - [`usage`] - Usage types (UsageSnapshot, QuotaWindow, SnapshotSource)
//! - [`credential`] - Session credential (Credential)
//! - [`outcome`] - Refresh and renewal outcomes
//! - [`status`] - Staleness, severity, and the presentation report

mod credential;
mod outcome;
mod status;
mod usage;

// Re-export everything at the models level
pub use credential::{Credential, ORGANIZATION_TOKEN, SESSION_TOKEN};
pub use outcome::{AcquireError, RefreshOutcome, RenewalOutcome};
pub use status::{Severity, Staleness, UsageReport};
pub use usage::{QuotaWindow, SnapshotSource, UsageSnapshot, clamp_percent};

#[cfg(test)]
mod serde_tests;
