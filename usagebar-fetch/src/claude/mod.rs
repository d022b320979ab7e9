//! claude.ai usage source.
//!
//! - [`api`] - Wire types for the usage and organizations endpoints
//! - [`web`] - [`ClaudeWebFetcher`], the cookie-authenticated fetcher

pub mod api;
pub mod web;

pub use api::{Organization, UsageResponse, UsageWindow};
pub use web::{ClaudeWebFetcher, DEFAULT_BASE_URL};
