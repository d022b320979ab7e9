//! Refresh and renewal outcomes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::usage::UsageSnapshot;

// ============================================================================
// Refresh Outcome
// ============================================================================

/// Tagged result of one refresh attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum RefreshOutcome {
    /// The remote API answered with usage figures.
    Success(UsageSnapshot),
    /// The session credential was rejected. Recoverable only via renewal.
    AuthExpired,
    /// Network or remote fault (including timeouts). Recoverable by retry.
    TransportError(String),
    /// No credential has ever been stored.
    NoCredential,
}

impl RefreshOutcome {
    /// Returns true for [`RefreshOutcome::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns the snapshot for a successful outcome.
    pub fn snapshot(&self) -> Option<&UsageSnapshot> {
        match self {
            Self::Success(snapshot) => Some(snapshot),
            _ => None,
        }
    }

    /// Returns a short label for logs and output.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::AuthExpired => "auth_expired",
            Self::TransportError(_) => "transport_error",
            Self::NoCredential => "no_credential",
        }
    }

    /// Human-readable failure description, `None` on success.
    pub fn error_message(&self) -> Option<String> {
        match self {
            Self::Success(_) => None,
            Self::AuthExpired => Some("Session expired, log in again".to_string()),
            Self::TransportError(reason) => Some(reason.clone()),
            Self::NoCredential => Some("No session credential stored".to_string()),
        }
    }
}

// ============================================================================
// Renewal
// ============================================================================

/// Failure of the opaque login step.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AcquireError {
    /// The user backed out of the login.
    #[error("Login cancelled")]
    Cancelled,
    /// The login step failed.
    #[error("Login failed: {0}")]
    Failed(String),
}

/// Result of a session renewal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum RenewalOutcome {
    /// A new credential was stored and a refresh was requested.
    Renewed,
    /// The user backed out; nothing changed.
    Cancelled,
    /// The login or the credential write failed; nothing changed.
    Failed(String),
}

impl From<AcquireError> for RenewalOutcome {
    fn from(err: AcquireError) -> Self {
        match err {
            AcquireError::Cancelled => Self::Cancelled,
            AcquireError::Failed(reason) => Self::Failed(reason),
        }
    }
}

impl std::fmt::Display for RenewalOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Renewed => write!(f, "Session renewed"),
            Self::Cancelled => write!(f, "Login cancelled"),
            Self::Failed(reason) => write!(f, "Login failed: {reason}"),
        }
    }
}
