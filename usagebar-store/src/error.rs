//! Store error types.

use thiserror::Error;

/// Errors that can occur in the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A caller-supplied value was out of range.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A persisted record failed validation.
    #[error("Invalid record in {path}: {reason}")]
    InvalidRecord {
        /// File the record was read from.
        path: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The fetcher could not be constructed.
    #[error("Fetcher setup failed: {0}")]
    Fetch(#[from] usagebar_fetch::FetchError),
}

impl StoreError {
    /// Returns true if the error only means the file does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}

impl From<usagebar_core::CoreError> for StoreError {
    fn from(err: usagebar_core::CoreError) -> Self {
        StoreError::Config(err.to_string())
    }
}
