//! Capability traits the engine is wired with.
//!
//! Both traits are object-safe so the refresh coordinator and the renewal
//! flow can hold them as `Arc<dyn ...>` and tests can substitute fakes.

use async_trait::async_trait;

use crate::models::{AcquireError, Credential, RefreshOutcome};

/// One authenticated query against the remote quota API.
///
/// Implementors are responsible for:
/// - Short-circuiting to [`RefreshOutcome::NoCredential`] without touching
///   the network when `credential` is `None`
/// - Requesting both quota figures, in one round trip where possible
/// - Mapping every failure into the [`RefreshOutcome`] taxonomy
///
/// Implementations never retry internally; retry policy belongs to the
/// caller.
///
/// ```ignore
/// struct CannedFetcher(UsageSnapshot);
///
/// #[async_trait]
/// impl UsageFetcher for CannedFetcher {
///     async fn fetch(&self, credential: Option<&Credential>) -> RefreshOutcome {
///         match credential {
///             Some(_) => RefreshOutcome::Success(self.0.clone()),
///             None => RefreshOutcome::NoCredential,
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait UsageFetcher: Send + Sync {
    /// Performs one fetch.
    async fn fetch(&self, credential: Option<&Credential>) -> RefreshOutcome;
}

/// The opaque interactive login step.
///
/// Whatever drives the login (a browser helper, a pasted cookie header)
/// either yields a fresh credential or fails. No identity pinning is
/// implied: the credential may belong to a different account than the
/// previous one.
#[async_trait]
pub trait CredentialAcquirer: Send + Sync {
    /// Obtains a new credential.
    async fn acquire(&self) -> Result<Credential, AcquireError>;
}
