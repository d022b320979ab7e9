//! Session renewal.
//!
//! Drives the opaque login step, stores the credential it yields, and asks
//! the coordinator for one immediate refresh. Cancelled or failed logins
//! leave the stored credential and the cache untouched.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};
use usagebar_core::{CredentialAcquirer, RefreshOutcome, RenewalOutcome};

use crate::coordinator::RefreshCoordinator;
use crate::credential_store::CredentialStore;
use crate::state::RefreshTrigger;

/// Session renewal flow.
#[derive(Clone)]
pub struct SessionRenewal {
    acquirer: Arc<dyn CredentialAcquirer>,
    credentials: CredentialStore,
    coordinator: RefreshCoordinator,
    in_progress: Arc<Mutex<()>>,
}

impl std::fmt::Debug for SessionRenewal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRenewal")
            .field("credentials", &self.credentials.path())
            .finish_non_exhaustive()
    }
}

impl SessionRenewal {
    /// Creates a renewal flow.
    pub fn new(
        acquirer: Arc<dyn CredentialAcquirer>,
        credentials: CredentialStore,
        coordinator: RefreshCoordinator,
    ) -> Self {
        Self {
            acquirer,
            credentials,
            coordinator,
            in_progress: Arc::new(Mutex::new(())),
        }
    }

    /// Renews the session.
    ///
    /// Only one renewal runs at a time; a concurrent call fails immediately.
    /// The "needs renewal" signal is left for the follow-up refresh to clear.
    pub async fn renew(&self) -> RenewalOutcome {
        self.renew_and_refresh().await.0
    }

    /// Renews the session and also returns the follow-up refresh outcome.
    ///
    /// The refresh outcome is `None` when renewal did not succeed or a fetch
    /// was already in flight.
    #[instrument(skip(self))]
    pub async fn renew_and_refresh(&self) -> (RenewalOutcome, Option<RefreshOutcome>) {
        let Ok(_guard) = self.in_progress.try_lock() else {
            warn!("Renewal already in progress");
            return (
                RenewalOutcome::Failed("renewal already in progress".to_string()),
                None,
            );
        };

        let credential = match self.acquirer.acquire().await {
            Ok(credential) => credential,
            Err(e) => {
                info!(error = %e, "Login did not produce a credential");
                return (e.into(), None);
            }
        };
        if credential.is_empty() {
            return (
                RenewalOutcome::Failed("login produced no session tokens".to_string()),
                None,
            );
        }

        if let Err(e) = self.credentials.save(&credential).await {
            warn!(error = %e, "Could not store renewed credential");
            return (
                RenewalOutcome::Failed(format!("could not store credential: {e}")),
                None,
            );
        }
        info!(tokens = credential.len(), "Session renewed");

        let refresh = self.coordinator.refresh(RefreshTrigger::Renewal).await;
        match &refresh {
            Some(outcome) => info!(outcome = outcome.label(), "Post-renewal refresh finished"),
            None => info!("Refresh already in flight, new session used from the next cycle"),
        }
        (RenewalOutcome::Renewed, refresh)
    }
}
