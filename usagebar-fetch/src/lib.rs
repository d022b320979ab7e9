// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `usagebar` Fetch
//!
//! Remote usage fetching and login capabilities for `usagebar`.
//!
//! ## Host APIs
//!
//! The [`host`] module wraps system interactions:
//!
//! - [`host::http`] - HTTP client with tracing and a bounded timeout
//! - [`host::process`] - Subprocess execution for the login helper
//!
//! ## Capabilities
//!
//! - [`ClaudeWebFetcher`] - [`usagebar_core::UsageFetcher`] for claude.ai
//! - [`CommandAcquirer`] / [`CookieHeaderAcquirer`] -
//!   [`usagebar_core::CredentialAcquirer`] implementations
//!
//! ## Example
//!
//! ```ignore
//! use usagebar_fetch::ClaudeWebFetcher;
//! use usagebar_core::UsageFetcher;
//!
//! let fetcher = ClaudeWebFetcher::new("https://claude.ai", Duration::from_secs(60))?;
//! let outcome = fetcher.fetch(credential.as_ref()).await;
//! ```

pub mod acquire;
pub mod claude;
pub mod error;
pub mod host;

// Re-export main types
pub use acquire::{CommandAcquirer, CookieHeaderAcquirer, CookieSource, parse_cookie_capture};
pub use claude::{ClaudeWebFetcher, DEFAULT_BASE_URL};
pub use error::{FetchError, HttpError, ProcessError};
pub use host::{HttpClient, ProcessOutput, ProcessRunner};
