//! claude.ai usage fetcher using the browser session cookie.
//!
//! One fetch is at most two requests: organization discovery (only when no
//! organization is configured or recorded in the session) and the usage
//! query itself, which returns both quota windows in one round trip.

use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;
use usagebar_core::{Credential, RefreshOutcome, UsageFetcher, UsageSnapshot};

use super::api::{Organization, UsageResponse, auth_error};
use crate::error::{FetchError, HttpError};
use crate::host::{HttpClient, ResponseExt};

/// Default claude.ai base URL.
pub const DEFAULT_BASE_URL: &str = "https://claude.ai";

// ============================================================================
// Web Fetcher
// ============================================================================

/// [`UsageFetcher`] backed by the claude.ai web API.
#[derive(Debug, Clone)]
pub struct ClaudeWebFetcher {
    client: HttpClient,
    base_url: Url,
    organization_id: Option<String>,
}

impl ClaudeWebFetcher {
    /// Creates a fetcher against `base_url` with a per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let base_url = Url::parse(base_url).map_err(|e| HttpError::InvalidUrl(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(HttpError::InvalidUrl(base_url.to_string()).into());
        }
        Ok(Self {
            client: HttpClient::with_timeout(timeout)?,
            base_url,
            organization_id: None,
        })
    }

    /// Pins the organization instead of reading it from the session.
    #[must_use]
    pub fn with_organization(mut self, organization_id: Option<String>) -> Self {
        self.organization_id = organization_id.filter(|id| !id.trim().is_empty());
        self
    }

    /// The base URL requests are made against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| HttpError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Fetches a snapshot for the given session.
    #[instrument(skip(self, credential))]
    pub async fn fetch_snapshot(&self, credential: &Credential) -> Result<UsageSnapshot, FetchError> {
        let cookies = credential.cookie_header();
        let organization = self.resolve_organization(credential, &cookies).await?;
        let url = self.endpoint(&["api", "organizations", &organization, "usage"])?;

        let body = self.get_body(&url, &cookies).await?;
        let response: UsageResponse = serde_json::from_str(&body).map_err(|e| {
            warn!(error = %e, len = body.len(), "Failed to parse usage response");
            FetchError::InvalidResponse(format!("unparseable usage body: {e}"))
        })?;

        let snapshot = response.to_snapshot(Utc::now())?;
        info!(
            short_window = snapshot.short_window_percent(),
            weekly = ?snapshot.weekly_percent(),
            "Usage fetched"
        );
        Ok(snapshot)
    }

    /// Resolution order: pinned organization, the session's
    /// `lastActiveOrg` token, then the first organization the session
    /// belongs to.
    async fn resolve_organization(
        &self,
        credential: &Credential,
        cookies: &str,
    ) -> Result<String, FetchError> {
        if let Some(id) = &self.organization_id {
            return Ok(id.clone());
        }
        if let Some(id) = credential.organization_id() {
            return Ok(id.to_string());
        }
        self.discover_organization(cookies).await
    }

    #[instrument(skip(self, cookies))]
    async fn discover_organization(&self, cookies: &str) -> Result<String, FetchError> {
        debug!("No organization recorded, discovering");
        let url = self.endpoint(&["api", "organizations"])?;
        let body = self.get_body(&url, cookies).await?;

        let organizations: Vec<Organization> = serde_json::from_str(&body)
            .map_err(|e| FetchError::InvalidResponse(format!("unparseable organizations: {e}")))?;

        let first = organizations
            .into_iter()
            .find(|org| !org.uuid.is_empty())
            .ok_or(FetchError::NoOrganization)?;
        debug!(name = ?first.name, "Using first organization");
        Ok(first.uuid)
    }

    /// GETs a URL and returns the body of a successful, non-error response.
    async fn get_body(&self, url: &Url, cookies: &str) -> Result<String, FetchError> {
        let response = match self.client.get_with_cookies(url, cookies).await {
            Ok(response) => response,
            Err(HttpError::Timeout) => {
                return Err(FetchError::Timeout(self.client.timeout().as_secs()));
            }
            Err(e) => return Err(e.into()),
        };

        let status = response.status();
        if response.is_auth_rejected() {
            return Err(FetchError::AuthenticationFailed(format!(
                "session rejected ({status})"
            )));
        }

        let body = response.text().await.map_err(HttpError::from)?;

        if let Some(message) = auth_error(&body) {
            return Err(FetchError::AuthenticationFailed(message));
        }
        if !status.is_success() {
            warn!(status = %status, len = body.len(), "Usage API request failed");
            return Err(FetchError::InvalidResponse(format!("HTTP {status}")));
        }
        Ok(body)
    }
}

#[async_trait]
impl UsageFetcher for ClaudeWebFetcher {
    async fn fetch(&self, credential: Option<&Credential>) -> RefreshOutcome {
        let Some(credential) = credential else {
            debug!("No credential, skipping network");
            return RefreshOutcome::NoCredential;
        };

        match self.fetch_snapshot(credential).await {
            Ok(snapshot) => RefreshOutcome::Success(snapshot),
            Err(e) => {
                warn!(error = %e, "Fetch failed");
                e.into_outcome()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_building() {
        let fetcher = ClaudeWebFetcher::new("https://claude.ai", Duration::from_secs(5)).unwrap();
        let url = fetcher
            .endpoint(&["api", "organizations", "org-1", "usage"])
            .unwrap();
        assert_eq!(url.as_str(), "https://claude.ai/api/organizations/org-1/usage");
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let fetcher =
            ClaudeWebFetcher::new("http://localhost:8080/proxy/", Duration::from_secs(5)).unwrap();
        let url = fetcher.endpoint(&["api", "organizations"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/proxy/api/organizations");
    }

    #[test]
    fn test_organization_id_is_escaped() {
        let fetcher = ClaudeWebFetcher::new("https://claude.ai", Duration::from_secs(5)).unwrap();
        let url = fetcher.endpoint(&["api", "organizations", "a/b", "usage"]).unwrap();
        assert_eq!(url.as_str(), "https://claude.ai/api/organizations/a%2Fb/usage");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(ClaudeWebFetcher::new("not a url", Duration::from_secs(5)).is_err());
        assert!(ClaudeWebFetcher::new("mailto:x@y", Duration::from_secs(5)).is_err());
    }

    #[test]
    fn test_blank_pinned_organization_ignored() {
        let fetcher = ClaudeWebFetcher::new(DEFAULT_BASE_URL, Duration::from_secs(5))
            .unwrap()
            .with_organization(Some("  ".to_string()));
        assert!(fetcher.organization_id.is_none());
    }

    #[tokio::test]
    async fn test_no_credential_short_circuits() {
        // Port 9 is discard; nothing should be contacted anyway
        let fetcher = ClaudeWebFetcher::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        assert_eq!(fetcher.fetch(None).await, RefreshOutcome::NoCredential);
    }
}
