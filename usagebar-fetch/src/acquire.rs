//! Credential acquirers.
//!
//! Two ways of producing a fresh [`Credential`]:
//!
//! - [`CommandAcquirer`] runs an external login helper and reads the
//!   captured `Cookie` header from its stdout
//! - [`CookieHeaderAcquirer`] takes a header the user already has, either as
//!   text or as a file (the classic `cookies.txt` with `a=b; c=d`)

use async_trait::async_trait;
use chrono::Utc;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use usagebar_core::{AcquireError, Credential, CredentialAcquirer};

use crate::error::ProcessError;
use crate::host::ProcessRunner;

/// Exit code of a process interrupted with Ctrl+C.
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Parses a captured cookie header.
///
/// Accepts an optional `Cookie:` prefix and header pairs split across
/// several lines. Returns `Cancelled` for an empty capture and `Failed` when
/// nothing in the capture looks like a token.
pub fn parse_cookie_capture(raw: &str) -> Result<Credential, AcquireError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AcquireError::Cancelled);
    }

    let header = trimmed
        .lines()
        .map(|line| {
            let line = line.trim();
            line.strip_prefix("Cookie:")
                .or_else(|| line.strip_prefix("cookie:"))
                .unwrap_or(line)
        })
        .collect::<Vec<_>>()
        .join(";");

    let credential = Credential::from_cookie_header(&header, Utc::now());
    if credential.is_empty() {
        return Err(AcquireError::Failed(
            "no session tokens found in the captured cookies".to_string(),
        ));
    }
    if !credential.has_session_token() {
        warn!(tokens = ?credential.token_names().collect::<Vec<_>>(), "Captured cookies carry no session token");
    }
    Ok(credential)
}

// ============================================================================
// Command Acquirer
// ============================================================================

/// Runs an external login helper and parses its stdout as a cookie header.
#[derive(Debug, Clone)]
pub struct CommandAcquirer {
    runner: ProcessRunner,
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandAcquirer {
    /// Creates an acquirer from an argv (`program`, then arguments).
    ///
    /// Returns `None` for an empty argv.
    pub fn from_argv(argv: &[String], timeout: Duration) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            runner: ProcessRunner::new(),
            program: program.clone(),
            args: args.to_vec(),
            timeout,
        })
    }

    /// The helper program.
    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl CredentialAcquirer for CommandAcquirer {
    #[instrument(skip(self), fields(program = %self.program))]
    async fn acquire(&self) -> Result<Credential, AcquireError> {
        let args: Vec<&str> = self.args.iter().map(String::as_str).collect();
        info!("Running login helper");

        let output = self
            .runner
            .run_with_timeout(&self.program, &args, self.timeout)
            .await
            .map_err(|e| match e {
                ProcessError::Timeout(after) => {
                    AcquireError::Failed(format!("login timed out after {}s", after.as_secs()))
                }
                other => AcquireError::Failed(other.to_string()),
            })?;

        if output.exit_code == INTERRUPTED_EXIT_CODE {
            debug!("Login helper interrupted");
            return Err(AcquireError::Cancelled);
        }
        if !output.success() {
            let stderr = output.stderr.trim();
            let reason = if stderr.is_empty() {
                format!("login helper exited with code {}", output.exit_code)
            } else {
                stderr.to_string()
            };
            return Err(AcquireError::Failed(reason));
        }

        parse_cookie_capture(&output.stdout)
    }
}

// ============================================================================
// Cookie Header Acquirer
// ============================================================================

/// Where a cookie header comes from.
#[derive(Clone)]
pub enum CookieSource {
    /// Header text already in memory (pasted or read from stdin).
    Text(String),
    /// A text file holding the header.
    File(PathBuf),
}

impl std::fmt::Debug for CookieSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => write!(f, "Text({} bytes)", text.len()),
            Self::File(path) => write!(f, "File({})", path.display()),
        }
    }
}

/// Imports a cookie header the user captured themselves.
#[derive(Debug, Clone)]
pub struct CookieHeaderAcquirer {
    source: CookieSource,
}

impl CookieHeaderAcquirer {
    /// Reads the header from text.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            source: CookieSource::Text(text.into()),
        }
    }

    /// Reads the header from a file at acquire time.
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self {
            source: CookieSource::File(path.into()),
        }
    }
}

#[async_trait]
impl CredentialAcquirer for CookieHeaderAcquirer {
    #[instrument(skip(self))]
    async fn acquire(&self) -> Result<Credential, AcquireError> {
        match &self.source {
            CookieSource::Text(text) => parse_cookie_capture(text),
            CookieSource::File(path) => {
                let content = tokio::fs::read_to_string(path).await.map_err(|e| {
                    AcquireError::Failed(format!("cannot read {}: {e}", path.display()))
                })?;
                match parse_cookie_capture(&content) {
                    Err(AcquireError::Cancelled) => Err(AcquireError::Failed(format!(
                        "{} is empty",
                        path.display()
                    ))),
                    other => other,
                }
            }
        }
    }
}
