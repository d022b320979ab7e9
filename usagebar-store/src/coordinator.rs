//! Refresh coordinator.
//!
//! Single owner of the mutable usage state. Timer ticks, manual requests,
//! and renewal completions all funnel through the same
//! `Idle / Fetching / Cooldown` machine, so no two fetches ever overlap and
//! no two cache writes race.
//!
//! ```ignore
//! let coordinator = RefreshCoordinator::new(fetcher, credentials, cache, config);
//! coordinator.load().await;
//!
//! // Fire-and-forget
//! coordinator.trigger_refresh().await;
//!
//! // Observe
//! let mut rx = coordinator.subscribe();
//! while rx.changed().await.is_ok() {
//!     render(coordinator.report().await);
//! }
//! ```

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use usagebar_core::{Evaluator, RefreshOutcome, UsageFetcher, UsageReport, UsageSnapshot};

use crate::credential_store::CredentialStore;
use crate::error::StoreError;
use crate::settings::Settings;
use crate::state::{RefreshEvent, RefreshPhase, RefreshTrigger, transition};
use crate::usage_cache::UsageCache;

// ============================================================================
// Configuration
// ============================================================================

/// Tunables for the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Time between scheduled refreshes; also the cooldown after any fetch.
    pub refresh_interval: Duration,
    /// Upper bound for one fetch. Hitting it is a transport error.
    pub fetch_timeout: Duration,
    /// Staleness and severity rules for reports.
    pub evaluator: Evaluator,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(300),
            fetch_timeout: Duration::from_secs(60),
            evaluator: Evaluator::default(),
        }
    }
}

impl CoordinatorConfig {
    /// Derives the configuration from settings.
    pub fn from_settings(settings: &Settings) -> Result<Self, StoreError> {
        Ok(Self {
            refresh_interval: settings.refresh_interval(),
            fetch_timeout: settings.fetch_timeout(),
            evaluator: settings.evaluator()?,
        })
    }
}

// ============================================================================
// Coordinator
// ============================================================================

#[derive(Debug)]
struct CoordinatorState {
    phase: RefreshPhase,
    latest: Option<UsageSnapshot>,
    needs_renewal: bool,
    last_error: Option<String>,
    version: u64,
}

struct Inner {
    fetcher: Arc<dyn UsageFetcher>,
    credentials: CredentialStore,
    cache: UsageCache,
    config: CoordinatorConfig,
    state: Mutex<CoordinatorState>,
    cache_lock: Mutex<()>,
    notify: watch::Sender<u64>,
}

/// Owns the refresh cycle and the latest known usage.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("cache", &self.inner.cache.path())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl RefreshCoordinator {
    /// Creates a coordinator in the `Idle` phase with no snapshot loaded.
    pub fn new(
        fetcher: Arc<dyn UsageFetcher>,
        credentials: CredentialStore,
        cache: UsageCache,
        config: CoordinatorConfig,
    ) -> Self {
        let (notify, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                fetcher,
                credentials,
                cache,
                config,
                state: Mutex::new(CoordinatorState {
                    phase: RefreshPhase::Idle,
                    latest: None,
                    needs_renewal: false,
                    last_error: None,
                    version: 0,
                }),
                cache_lock: Mutex::new(()),
                notify,
            }),
        }
    }

    /// Seeds the latest snapshot from the cache. Call once at startup.
    pub async fn load(&self) {
        let cached = self.inner.cache.read().await;
        debug!(has_cache = cached.is_some(), "Loaded cached usage");
        let mut state = self.inner.state.lock().await;
        state.latest = cached;
        self.notify_change(&mut state);
    }

    /// The configuration in use.
    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    // ========================================================================
    // Triggers
    // ========================================================================

    /// Requests a refresh without waiting for it.
    ///
    /// Returns false when a fetch is already in flight; the request is
    /// dropped, not queued.
    pub async fn trigger_refresh(&self) -> bool {
        self.trigger(RefreshTrigger::Manual).await
    }

    /// Requests a refresh from `trigger` without waiting for it.
    pub async fn trigger(&self, trigger: RefreshTrigger) -> bool {
        if !self.begin(trigger).await {
            return false;
        }
        let this = self.clone();
        tokio::spawn(async move {
            this.complete().await;
        });
        true
    }

    /// Refreshes immediately and waits for the outcome.
    ///
    /// Returns `None` if a fetch was already in flight.
    pub async fn refresh_now(&self) -> Option<RefreshOutcome> {
        self.refresh(RefreshTrigger::Manual).await
    }

    /// Refreshes on behalf of `trigger` and waits for the outcome.
    pub async fn refresh(&self, trigger: RefreshTrigger) -> Option<RefreshOutcome> {
        if !self.begin(trigger).await {
            return None;
        }
        Some(self.complete().await)
    }

    /// Moves into `Fetching` if the state machine allows it.
    async fn begin(&self, trigger: RefreshTrigger) -> bool {
        let mut state = self.inner.state.lock().await;
        let next = transition(
            state.phase,
            RefreshEvent::Trigger(trigger),
            Instant::now(),
            self.inner.config.refresh_interval,
        );
        match next {
            Some(phase) => {
                debug!(?trigger, from = state.phase.label(), "Refresh started");
                state.phase = phase;
                self.notify_change(&mut state);
                true
            }
            None => {
                debug!(?trigger, phase = state.phase.label(), "Refresh request ignored");
                false
            }
        }
    }

    /// Runs the fetch for a cycle `begin` opened and applies its outcome.
    async fn complete(&self) -> RefreshOutcome {
        let outcome = self.fetch_bounded().await;
        self.apply(&outcome).await;
        outcome
    }

    #[instrument(skip(self))]
    async fn fetch_bounded(&self) -> RefreshOutcome {
        let credential = self.inner.credentials.load().await;
        let timeout = self.inner.config.fetch_timeout;

        match tokio::time::timeout(timeout, self.inner.fetcher.fetch(credential.as_ref())).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(timeout = ?timeout, "Fetch timed out");
                RefreshOutcome::TransportError(format!(
                    "fetch timed out after {}s",
                    timeout.as_secs_f64()
                ))
            }
        }
    }

    /// Folds an outcome into the cache and the in-memory state, then starts
    /// the cooldown.
    async fn apply(&self, outcome: &RefreshOutcome) {
        let (latest, write_error) = match outcome {
            RefreshOutcome::Success(snapshot) => {
                let _guard = self.inner.cache_lock.lock().await;
                let write_error = self.inner.cache.write(snapshot).await.err();
                if let Some(e) = &write_error {
                    error!(error = %e, "Failed to persist usage");
                }
                (Some(snapshot.clone()), write_error)
            }
            // Failures never touch the cache; present whatever it holds.
            _ => (self.inner.cache.read().await, None),
        };

        let mut state = self.inner.state.lock().await;
        state.latest = latest;
        match outcome {
            RefreshOutcome::Success(snapshot) => {
                info!(
                    short_window = snapshot.short_window_percent(),
                    weekly = ?snapshot.weekly_percent(),
                    "Refresh succeeded"
                );
                state.needs_renewal = false;
                state.last_error = write_error.map(|e| format!("Could not cache usage: {e}"));
            }
            RefreshOutcome::AuthExpired => {
                warn!("Session expired, renewal needed");
                state.needs_renewal = true;
                state.last_error = outcome.error_message();
            }
            RefreshOutcome::TransportError(_) | RefreshOutcome::NoCredential => {
                info!(outcome = outcome.label(), "Refresh failed, keeping cached usage");
                state.last_error = outcome.error_message();
            }
        }

        if let Some(phase) = transition(
            state.phase,
            RefreshEvent::FetchFinished,
            Instant::now(),
            self.inner.config.refresh_interval,
        ) {
            state.phase = phase;
        }
        self.notify_change(&mut state);
    }

    // ========================================================================
    // Manual Update
    // ========================================================================

    /// Records a manually entered reading as if it had been fetched.
    ///
    /// Percentages may be fractional and are rounded; anything outside
    /// `0..=100` is rejected. The snapshot is tagged as cached and fully
    /// replaces the previous one.
    pub async fn set_manual(
        &self,
        short_window_percent: f64,
        weekly_percent: Option<f64>,
    ) -> Result<UsageSnapshot, StoreError> {
        let short = checked_percent(short_window_percent)?;
        let weekly = weekly_percent.map(checked_percent).transpose()?;
        let snapshot = UsageSnapshot::manual(short, weekly, Utc::now());

        {
            let _guard = self.inner.cache_lock.lock().await;
            self.inner.cache.write(&snapshot).await?;
        }
        info!(short_window = short, weekly = ?weekly, "Usage set manually");

        let mut state = self.inner.state.lock().await;
        state.latest = Some(snapshot.clone());
        self.notify_change(&mut state);
        Ok(snapshot)
    }

    // ========================================================================
    // Query
    // ========================================================================

    /// Latest snapshot with its staleness and severity, computed now.
    pub async fn report(&self) -> UsageReport {
        self.report_at(Utc::now()).await
    }

    /// Latest snapshot with its staleness and severity, computed at `now`.
    pub async fn report_at(&self, now: DateTime<Utc>) -> UsageReport {
        let state = self.inner.state.lock().await;
        let assessment = self.inner.config.evaluator.assess(state.latest.as_ref(), now);
        UsageReport {
            snapshot: state.latest.clone(),
            staleness: assessment.staleness,
            severity: assessment.severity,
            needs_renewal: state.needs_renewal,
            refreshing: state.phase.is_fetching(),
            last_error: state.last_error.clone(),
            generated_at: now,
        }
    }

    /// Current phase of the refresh cycle.
    pub async fn phase(&self) -> RefreshPhase {
        self.inner.state.lock().await.phase
    }

    /// True once the session was rejected and until a fetch succeeds.
    pub async fn needs_renewal(&self) -> bool {
        self.inner.state.lock().await.needs_renewal
    }

    /// Subscribes to state changes. The value is a change counter.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.notify.subscribe()
    }

    fn notify_change(&self, state: &mut CoordinatorState) {
        state.version += 1;
        let _ = self.inner.notify.send(state.version);
    }

    // ========================================================================
    // Scheduler
    // ========================================================================

    /// Drives the periodic refresh until `shutdown` resolves.
    ///
    /// Ticks never come faster than the refresh interval. Manual refreshes
    /// and renewals issued meanwhile restart the cooldown.
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut changes = self.subscribe();
        info!(interval = ?self.inner.config.refresh_interval, "Refresh loop started");

        loop {
            if let Err(e) = self.tick().await {
                debug!(phase = e.label(), "Tick skipped");
            }
            let _ = changes.borrow_and_update();
            let deadline = deadline_for(self.phase().await, Instant::now());
            let wake = async {
                match deadline {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                () = &mut shutdown => break,
                () = wake => self.elapse_cooldown().await,
                changed = changes.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        info!("Refresh loop stopped");
    }

    /// One timer tick. Returns the blocking phase if nothing was started.
    async fn tick(&self) -> Result<RefreshOutcome, RefreshPhase> {
        match self.refresh(RefreshTrigger::Timer).await {
            Some(outcome) => Ok(outcome),
            None => Err(self.phase().await),
        }
    }

    async fn elapse_cooldown(&self) {
        let mut state = self.inner.state.lock().await;
        if let Some(phase) = transition(
            state.phase,
            RefreshEvent::CooldownElapsed,
            Instant::now(),
            self.inner.config.refresh_interval,
        ) {
            state.phase = phase;
            self.notify_change(&mut state);
        }
    }
}

/// When the scheduler should wake on its own. A fetch in flight has no
/// deadline; its completion arrives as a change notification.
fn deadline_for(phase: RefreshPhase, now: Instant) -> Option<Instant> {
    match phase {
        RefreshPhase::Cooldown { until } => Some(until),
        RefreshPhase::Idle => Some(now),
        RefreshPhase::Fetching { .. } => None,
    }
}

fn checked_percent(value: f64) -> Result<u8, StoreError> {
    if !(0.0..=100.0).contains(&value) {
        return Err(StoreError::InvalidInput(format!(
            "percentage must be between 0 and 100 (got {value})"
        )));
    }
    Ok(usagebar_core::clamp_percent(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_percent() {
        assert_eq!(checked_percent(45.0).unwrap(), 45);
        assert_eq!(checked_percent(44.5).unwrap(), 45);
        assert_eq!(checked_percent(0.0).unwrap(), 0);
        assert_eq!(checked_percent(100.0).unwrap(), 100);
        assert!(checked_percent(100.1).is_err());
        assert!(checked_percent(-1.0).is_err());
        assert!(checked_percent(f64::NAN).is_err());
    }

    #[test]
    fn test_deadline_for_phase() {
        let now = Instant::now();
        let until = now + Duration::from_secs(60);

        assert_eq!(deadline_for(RefreshPhase::Idle, now), Some(now));
        assert_eq!(deadline_for(RefreshPhase::Cooldown { until }, now), Some(until));
        assert_eq!(
            deadline_for(RefreshPhase::Fetching { since: now - Duration::from_secs(3600) }, now),
            None
        );
    }

    #[test]
    fn test_config_from_settings() {
        let settings = Settings {
            refresh_interval_secs: 120,
            fetch_timeout_secs: 30,
            ..Settings::default()
        };
        let config = CoordinatorConfig::from_settings(&settings).unwrap();
        assert_eq!(config.refresh_interval, Duration::from_secs(120));
        assert_eq!(config.fetch_timeout, Duration::from_secs(30));
    }
}
