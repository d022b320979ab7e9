//! Core error types for `usagebar`.

use thiserror::Error;

/// Core error type for `usagebar` operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid data (percentages, timestamps, tokens).
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
