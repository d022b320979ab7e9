//! Host APIs for the usage fetcher and login helpers.
//!
//! - [`http`] - HTTP client with tracing and a bounded timeout
//! - [`process`] - Subprocess execution for external helpers

pub mod http;
pub mod process;

// Re-export key types
pub use http::{HttpClient, ResponseExt};
pub use process::{ProcessOutput, ProcessRunner};
