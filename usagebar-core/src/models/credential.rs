//! Session credential.
//!
//! A [`Credential`] is an opaque mapping of named session tokens (browser
//! cookie values) plus the time it was acquired. It is only ever replaced
//! wholesale; there is no way to edit a single token in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Token carrying the last organization the user had open on claude.ai.
pub const ORGANIZATION_TOKEN: &str = "lastActiveOrg";

/// Token carrying the claude.ai session itself.
pub const SESSION_TOKEN: &str = "sessionKey";

/// Opaque session credential.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    tokens: BTreeMap<String, String>,
    acquired_at: DateTime<Utc>,
}

impl Credential {
    /// Creates a credential from a set of named tokens.
    pub fn new<I, K, V>(tokens: I, acquired_at: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            tokens: tokens
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            acquired_at,
        }
    }

    /// Parses a browser `Cookie` header (`name=value; name2=value2`).
    ///
    /// Pairs without `=` or with an empty name are skipped. Later duplicates
    /// win.
    pub fn from_cookie_header(header: &str, acquired_at: DateTime<Utc>) -> Self {
        let tokens = header.split(';').filter_map(|part| {
            let (name, value) = part.trim().split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), value.trim().to_string()))
        });
        Self::new(tokens, acquired_at)
    }

    /// Renders the tokens as a `Cookie` header value, sorted by name.
    pub fn cookie_header(&self) -> String {
        self.tokens
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Returns a token by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.tokens.get(name).map(String::as_str)
    }

    /// Returns the organization the session last had active, if recorded.
    pub fn organization_id(&self) -> Option<&str> {
        self.get(ORGANIZATION_TOKEN).filter(|v| !v.is_empty())
    }

    /// Returns true if the session token itself is present.
    pub fn has_session_token(&self) -> bool {
        self.get(SESSION_TOKEN).is_some_and(|v| !v.is_empty())
    }

    /// Names of all tokens, sorted.
    pub fn token_names(&self) -> impl Iterator<Item = &str> {
        self.tokens.keys().map(String::as_str)
    }

    /// Number of tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns true if the credential holds no tokens at all.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// When the credential was acquired.
    pub fn acquired_at(&self) -> DateTime<Utc> {
        self.acquired_at
    }
}

// Token values grant account access and must never reach logs.
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("tokens", &self.tokens.keys().collect::<Vec<_>>())
            .field("acquired_at", &self.acquired_at)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cookie_header() {
        let credential = Credential::from_cookie_header(
            "sessionKey=sk-ant-abc; lastActiveOrg=org-123; cf_clearance=x=y",
            Utc::now(),
        );

        assert_eq!(credential.len(), 3);
        assert_eq!(credential.get("sessionKey"), Some("sk-ant-abc"));
        assert_eq!(credential.organization_id(), Some("org-123"));
        // Only the first '=' separates name from value
        assert_eq!(credential.get("cf_clearance"), Some("x=y"));
        assert!(credential.has_session_token());
    }

    #[test]
    fn test_parse_skips_malformed_pairs() {
        let credential = Credential::from_cookie_header("garbage; =novalue; ok=1;;", Utc::now());
        assert_eq!(credential.len(), 1);
        assert_eq!(credential.get("ok"), Some("1"));
        assert!(!credential.has_session_token());
    }

    #[test]
    fn test_empty_header() {
        let credential = Credential::from_cookie_header("   ", Utc::now());
        assert!(credential.is_empty());
        assert_eq!(credential.cookie_header(), "");
    }

    #[test]
    fn test_cookie_header_is_sorted() {
        let credential = Credential::new([("b", "2"), ("a", "1")], Utc::now());
        assert_eq!(credential.cookie_header(), "a=1; b=2");
    }

    #[test]
    fn test_debug_redacts_values() {
        let credential = Credential::new([("sessionKey", "super-secret")], Utc::now());
        let debug = format!("{credential:?}");
        assert!(debug.contains("sessionKey"));
        assert!(!debug.contains("super-secret"));
    }

    #[test]
    fn test_empty_organization_is_none() {
        let credential = Credential::new([("lastActiveOrg", "")], Utc::now());
        assert_eq!(credential.organization_id(), None);
    }
}
