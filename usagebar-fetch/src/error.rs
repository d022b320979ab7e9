//! Fetch error types.

use std::time::Duration;
use thiserror::Error;
use usagebar_core::RefreshOutcome;

// ============================================================================
// Main Fetch Error
// ============================================================================

/// Error type for fetch operations.
///
/// Fetch errors never escape a [`usagebar_core::UsageFetcher`]; they are
/// folded into a [`RefreshOutcome`] with [`FetchError::into_outcome`].
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// The session was rejected.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// No organization could be resolved for the session.
    #[error("No organization found for this session")]
    NoOrganization,

    /// Unexpected status or body from the remote API.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl FetchError {
    /// Folds the error into the refresh outcome taxonomy.
    ///
    /// Authentication failures become [`RefreshOutcome::AuthExpired`]; every
    /// timeout, transport fault, unexpected status, or unparseable body is a
    /// retryable [`RefreshOutcome::TransportError`].
    pub fn into_outcome(self) -> RefreshOutcome {
        match self {
            Self::AuthenticationFailed(_) => RefreshOutcome::AuthExpired,
            Self::Http(HttpError::Timeout) => {
                RefreshOutcome::TransportError("Request timed out".to_string())
            }
            other => RefreshOutcome::TransportError(other.to_string()),
        }
    }
}

// ============================================================================
// HTTP Error
// ============================================================================

/// HTTP-specific error type.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Request error.
    #[error("Request error: {0}")]
    Request(#[source] reqwest::Error),

    /// The client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Build(String),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Timeout.
    #[error("Request timed out")]
    Timeout,
}

impl From<reqwest::Error> for HttpError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Request(err)
        }
    }
}

// ============================================================================
// Process Error
// ============================================================================

/// Error type for process operations.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Command not found.
    #[error("Command not found: {0}")]
    NotFound(String),

    /// Command timed out.
    #[error("Command timed out after {0:?}")]
    Timeout(Duration),

    /// Non-zero exit code.
    #[error("Command exited with code {code}: {stderr}")]
    NonZeroExit {
        /// Exit code from the process.
        code: i32,
        /// Standard error output.
        stderr: String,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
