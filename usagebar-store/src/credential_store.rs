//! Durable session credential.
//!
//! The credential file is a single JSON document with owner-only
//! permissions. It is only ever replaced wholesale.

use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};
use usagebar_core::Credential;

use crate::error::StoreError;
use crate::persistence::{default_credentials_path, load_json, remove_file, save_json};

/// Persists the session credential.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Creates a store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates a store at the default location.
    pub fn at_default_path() -> Self {
        Self::new(default_credentials_path())
    }

    /// The backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the stored credential.
    ///
    /// Missing, unreadable, malformed, or token-less files all read as
    /// absent. This never fails.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn load(&self) -> Option<Credential> {
        match load_json::<Credential>(&self.path).await {
            Ok(credential) if credential.is_empty() => {
                warn!("Stored credential has no tokens, treating as absent");
                None
            }
            Ok(credential) => {
                debug!(tokens = credential.len(), "Credential loaded");
                Some(credential)
            }
            Err(e) if e.is_not_found() => {
                debug!("No stored credential");
                None
            }
            Err(e) => {
                warn!(error = %e, "Malformed credential file, treating as absent");
                None
            }
        }
    }

    /// Replaces the stored credential atomically.
    #[instrument(skip(self, credential), fields(path = %self.path.display()))]
    pub async fn save(&self, credential: &Credential) -> Result<(), StoreError> {
        save_json(&self.path, credential).await?;
        info!(tokens = credential.len(), "Credential saved");
        Ok(())
    }

    /// Deletes the stored credential. Returns true if one existed.
    pub async fn clear(&self) -> Result<bool, StoreError> {
        remove_file(&self.path).await
    }
}
