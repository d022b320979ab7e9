//! HTTP client with tracing and browser-session support.
//!
//! This module provides a wrapped HTTP client that adds:
//! - Request/response tracing
//! - A per-request timeout surfaced as [`HttpError::Timeout`]
//! - Cookie-header requests for the claude.ai session

use reqwest::{Client, Response, header};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use crate::error::HttpError;

/// claude.ai rejects requests that do not look like they come from a browser.
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

// ============================================================================
// HTTP Client
// ============================================================================

/// HTTP client wrapper with tracing and a bounded timeout.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
    timeout: Duration,
}

impl HttpClient {
    /// Creates a new HTTP client with a custom timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, HttpError> {
        let inner = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;

        Ok(Self { inner, timeout })
    }

    /// The per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Performs a GET request with a `Cookie` header.
    ///
    /// The cookie value is never recorded in spans or logs.
    #[instrument(skip(self, cookies), fields(url = %url))]
    pub async fn get_with_cookies(&self, url: &Url, cookies: &str) -> Result<Response, HttpError> {
        debug!("GET request with cookies");

        let response = self
            .inner
            .get(url.clone())
            .header(header::COOKIE, cookies)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;
        debug!(status = %response.status(), "Response received");
        Ok(response)
    }
}

// ============================================================================
// Response Extensions
// ============================================================================

/// Extension trait for Response handling.
pub trait ResponseExt {
    /// Check if the status means the session was rejected.
    fn is_auth_rejected(&self) -> bool;
}

impl ResponseExt for Response {
    fn is_auth_rejected(&self) -> bool {
        matches!(
            self.status(),
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
