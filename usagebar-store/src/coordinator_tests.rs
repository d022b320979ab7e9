//! Refresh coordinator and session renewal tests.
//!
//! Every test wires the coordinator with fakes; nothing touches the network.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use usagebar_core::{
    AcquireError, Credential, CredentialAcquirer, RefreshOutcome, RenewalOutcome, Severity,
    SnapshotSource, Staleness, UsageFetcher, UsageSnapshot,
};

use crate::coordinator::{CoordinatorConfig, RefreshCoordinator};
use crate::credential_store::CredentialStore;
use crate::renewal::SessionRenewal;
use crate::state::{RefreshPhase, RefreshTrigger};
use crate::usage_cache::UsageCache;

// ============================================================================
// Fakes
// ============================================================================

/// Returns a fixed outcome after an optional delay and counts calls.
struct FakeFetcher {
    outcome: std::sync::Mutex<RefreshOutcome>,
    delay: Duration,
    calls: AtomicUsize,
    seen_sessions: std::sync::Mutex<Vec<Option<String>>>,
}

impl FakeFetcher {
    fn new(outcome: RefreshOutcome) -> Arc<Self> {
        Self::with_delay(outcome, Duration::ZERO)
    }

    fn with_delay(outcome: RefreshOutcome, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            outcome: std::sync::Mutex::new(outcome),
            delay,
            calls: AtomicUsize::new(0),
            seen_sessions: std::sync::Mutex::new(Vec::new()),
        })
    }

    fn set_outcome(&self, outcome: RefreshOutcome) {
        *self.outcome.lock().unwrap() = outcome;
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn seen_sessions(&self) -> Vec<Option<String>> {
        self.seen_sessions.lock().unwrap().clone()
    }
}

#[async_trait]
impl UsageFetcher for FakeFetcher {
    async fn fetch(&self, credential: Option<&Credential>) -> RefreshOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_sessions
            .lock()
            .unwrap()
            .push(credential.and_then(|c| c.get("sessionKey").map(str::to_string)));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.outcome.lock().unwrap().clone()
    }
}

/// Returns a canned login result after an optional delay.
struct FakeAcquirer {
    result: Result<Credential, AcquireError>,
    delay: Duration,
}

#[async_trait]
impl CredentialAcquirer for FakeAcquirer {
    async fn acquire(&self) -> Result<Credential, AcquireError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.result.clone()
    }
}

struct Harness {
    _dir: TempDir,
    credentials: CredentialStore,
    cache: UsageCache,
}

impl Harness {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        Self {
            credentials: CredentialStore::new(dir.path().join("credentials.json")),
            cache: UsageCache::new(dir.path().join("usage_cache.json")),
            _dir: dir,
        }
    }

    async fn with_session() -> Self {
        let harness = Self::new();
        harness
            .credentials
            .save(&Credential::new([("sessionKey", "sk-old")], Utc::now()))
            .await
            .unwrap();
        harness
    }

    fn coordinator(&self, fetcher: Arc<FakeFetcher>) -> RefreshCoordinator {
        self.coordinator_with(fetcher, CoordinatorConfig::default())
    }

    fn coordinator_with(&self, fetcher: Arc<FakeFetcher>, config: CoordinatorConfig) -> RefreshCoordinator {
        RefreshCoordinator::new(fetcher, self.credentials.clone(), self.cache.clone(), config)
    }

    async fn cache_bytes(&self) -> Option<Vec<u8>> {
        tokio::fs::read(self.cache.path()).await.ok()
    }
}

fn success(short: u8, weekly: Option<u8>) -> RefreshOutcome {
    RefreshOutcome::Success(UsageSnapshot::new(short, weekly, Utc::now()))
}

// ============================================================================
// Mutual Exclusion
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_refreshes_fetch_once() {
    let harness = Harness::with_session().await;
    let fetcher = FakeFetcher::with_delay(success(10, None), Duration::from_millis(200));
    let coordinator = harness.coordinator(fetcher.clone());

    let attempts = (0..16).map(|i| {
        let coordinator = coordinator.clone();
        tokio::spawn(async move {
            let trigger = if i % 2 == 0 { RefreshTrigger::Timer } else { RefreshTrigger::Manual };
            coordinator.refresh(trigger).await
        })
    });
    let results = futures::future::join_all(attempts).await;

    let completed = results
        .into_iter()
        .map(Result::unwrap)
        .filter(Option::is_some)
        .count();
    assert_eq!(completed, 1);
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn test_trigger_while_fetching_is_noop() {
    let harness = Harness::with_session().await;
    let fetcher = FakeFetcher::with_delay(success(10, None), Duration::from_millis(200));
    let coordinator = harness.coordinator(fetcher.clone());

    assert!(coordinator.trigger_refresh().await);
    assert!(coordinator.phase().await.is_fetching());
    assert!(coordinator.report().await.refreshing);

    assert!(!coordinator.trigger_refresh().await);
    assert!(coordinator.refresh_now().await.is_none());

    // Wait for the spawned fetch to finish
    let mut rx = coordinator.subscribe();
    while coordinator.phase().await.is_fetching() {
        rx.changed().await.unwrap();
    }
    assert_eq!(fetcher.calls(), 1);
    assert!(matches!(coordinator.phase().await, RefreshPhase::Cooldown { .. }));
}

#[tokio::test]
async fn test_timer_respects_cooldown_but_manual_does_not() {
    let harness = Harness::with_session().await;
    let fetcher = FakeFetcher::new(success(10, None));
    let coordinator = harness.coordinator(fetcher.clone());

    assert!(coordinator.refresh(RefreshTrigger::Timer).await.is_some());
    assert!(coordinator.refresh(RefreshTrigger::Timer).await.is_none());
    assert_eq!(fetcher.calls(), 1);

    assert!(coordinator.refresh_now().await.is_some());
    assert_eq!(fetcher.calls(), 2);
}

// ============================================================================
// Outcome Handling
// ============================================================================

#[tokio::test]
async fn test_success_updates_cache() {
    let harness = Harness::with_session().await;
    let before = Utc::now();
    let fetcher = FakeFetcher::new(RefreshOutcome::Success(UsageSnapshot::new(45, Some(60), before)));
    let coordinator = harness.coordinator(fetcher);

    let outcome = coordinator.refresh_now().await.unwrap();
    assert!(outcome.is_success());

    let cached = harness.cache.read().await.unwrap();
    assert_eq!(cached.fetched_at(), before);
    assert_eq!(cached.short_window_percent(), 45);
    assert_eq!(cached.weekly_percent(), Some(60));
    assert_eq!(cached.source(), SnapshotSource::Cache);

    let report = coordinator.report().await;
    let snapshot = report.snapshot.unwrap();
    assert_eq!(snapshot.source(), SnapshotSource::Live);
    assert_eq!(report.staleness, Staleness::Fresh);
    assert_eq!(report.severity, Some(Severity::Normal));
    assert!(!report.needs_renewal);
    assert_eq!(report.last_error, None);
}

#[tokio::test]
async fn test_transport_error_leaves_cache_untouched() {
    let harness = Harness::with_session().await;
    harness
        .cache
        .write(&UsageSnapshot::new(30, Some(40), Utc::now()))
        .await
        .unwrap();
    let before = harness.cache_bytes().await;

    let fetcher = FakeFetcher::new(RefreshOutcome::TransportError("connection reset".to_string()));
    let coordinator = harness.coordinator(fetcher);
    coordinator.load().await;
    coordinator.refresh_now().await.unwrap();

    assert_eq!(harness.cache_bytes().await, before);
    let report = coordinator.report().await;
    assert_eq!(report.snapshot.as_ref().map(UsageSnapshot::short_window_percent), Some(30));
    assert_eq!(report.snapshot.unwrap().source(), SnapshotSource::Cache);
    assert_eq!(report.last_error.as_deref(), Some("connection reset"));
    assert!(!report.needs_renewal);
}

#[tokio::test]
async fn test_auth_expired_keeps_cached_critical_and_flags_renewal() {
    let harness = Harness::with_session().await;
    harness
        .cache
        .write(&UsageSnapshot::new(20, Some(95), Utc::now()))
        .await
        .unwrap();
    let before = harness.cache_bytes().await;

    let coordinator = harness.coordinator(FakeFetcher::new(RefreshOutcome::AuthExpired));
    coordinator.load().await;
    assert_eq!(coordinator.refresh_now().await, Some(RefreshOutcome::AuthExpired));

    assert_eq!(harness.cache_bytes().await, before);
    let report = coordinator.report().await;
    assert_eq!(report.snapshot.as_ref().and_then(UsageSnapshot::weekly_percent), Some(95));
    assert_eq!(report.severity, Some(Severity::Critical));
    assert!(report.needs_renewal);
    assert!(coordinator.needs_renewal().await);
}

#[tokio::test]
async fn test_no_credential_reaches_fetcher_as_none() {
    let harness = Harness::new();
    let fetcher = FakeFetcher::new(RefreshOutcome::NoCredential);
    let coordinator = harness.coordinator(fetcher.clone());

    assert_eq!(coordinator.refresh_now().await, Some(RefreshOutcome::NoCredential));
    assert_eq!(fetcher.seen_sessions(), vec![None]);

    let report = coordinator.report().await;
    assert_eq!(report.snapshot, None);
    assert_eq!(report.staleness, Staleness::Unknown);
    assert_eq!(report.severity, None);
    assert!(report.last_error.is_some());
}

#[tokio::test]
async fn test_slow_fetch_times_out() {
    let harness = Harness::with_session().await;
    let fetcher = FakeFetcher::with_delay(success(10, None), Duration::from_secs(5));
    let config = CoordinatorConfig {
        fetch_timeout: Duration::from_millis(50),
        ..CoordinatorConfig::default()
    };
    let coordinator = harness.coordinator_with(fetcher, config);

    let outcome = coordinator.refresh_now().await.unwrap();

    assert!(matches!(outcome, RefreshOutcome::TransportError(ref reason) if reason.contains("timed out")));
    assert!(harness.cache.read().await.is_none());
    assert!(matches!(coordinator.phase().await, RefreshPhase::Cooldown { .. }));
}

#[tokio::test]
async fn test_success_clears_renewal_flag() {
    let harness = Harness::with_session().await;
    let fetcher = FakeFetcher::new(RefreshOutcome::AuthExpired);
    let coordinator = harness.coordinator(fetcher.clone());

    coordinator.refresh_now().await;
    assert!(coordinator.needs_renewal().await);

    // Transport errors do not clear it
    fetcher.set_outcome(RefreshOutcome::TransportError("dns".to_string()));
    coordinator.refresh_now().await;
    assert!(coordinator.needs_renewal().await);

    fetcher.set_outcome(success(5, None));
    coordinator.refresh_now().await;
    assert!(!coordinator.needs_renewal().await);
}

// ============================================================================
// Manual Update
// ============================================================================

#[tokio::test]
async fn test_manual_update() {
    let harness = Harness::new();
    let coordinator = harness.coordinator(FakeFetcher::new(RefreshOutcome::NoCredential));

    coordinator.set_manual(45.0, None).await.unwrap();

    let report = coordinator.report().await;
    let snapshot = report.snapshot.unwrap();
    assert_eq!(snapshot.short_window_percent(), 45);
    assert_eq!(snapshot.source(), SnapshotSource::Cache);
    assert_eq!(report.severity, Some(Severity::Normal));

    let cached = harness.cache.read().await.unwrap();
    assert_eq!(cached.short_window_percent(), 45);
    assert_eq!(cached.weekly_percent(), None);
}

#[tokio::test]
async fn test_manual_update_replaces_previous_snapshot() {
    let harness = Harness::new();
    harness
        .cache
        .write(&UsageSnapshot::new(10, Some(80), Utc::now()))
        .await
        .unwrap();
    let coordinator = harness.coordinator(FakeFetcher::new(RefreshOutcome::NoCredential));
    coordinator.load().await;

    coordinator.set_manual(72.4, None).await.unwrap();

    let cached = harness.cache.read().await.unwrap();
    assert_eq!(cached.short_window_percent(), 72);
    assert_eq!(cached.weekly_percent(), None);
    assert_eq!(coordinator.report().await.severity, Some(Severity::Warning));
}

#[tokio::test]
async fn test_manual_update_rejects_out_of_range() {
    let harness = Harness::new();
    let coordinator = harness.coordinator(FakeFetcher::new(RefreshOutcome::NoCredential));

    assert!(coordinator.set_manual(101.0, None).await.is_err());
    assert!(coordinator.set_manual(50.0, Some(-1.0)).await.is_err());
    assert!(harness.cache.read().await.is_none());
}

// ============================================================================
// Scheduler
// ============================================================================

#[tokio::test]
async fn test_run_loop_ticks_at_interval_and_stops() {
    let harness = Harness::with_session().await;
    let fetcher = FakeFetcher::new(success(10, None));
    let config = CoordinatorConfig {
        refresh_interval: Duration::from_millis(100),
        ..CoordinatorConfig::default()
    };
    let coordinator = harness.coordinator_with(fetcher.clone(), config);

    coordinator
        .run(tokio::time::sleep(Duration::from_millis(350)))
        .await;

    let calls = fetcher.calls();
    assert!((2..=5).contains(&calls), "unexpected fetch count {calls}");
    assert!(harness.cache.read().await.is_some());
}

// ============================================================================
// Session Renewal
// ============================================================================

fn renewal(
    harness: &Harness,
    coordinator: &RefreshCoordinator,
    result: Result<Credential, AcquireError>,
    delay: Duration,
) -> SessionRenewal {
    SessionRenewal::new(
        Arc::new(FakeAcquirer { result, delay }),
        harness.credentials.clone(),
        coordinator.clone(),
    )
}

#[tokio::test]
async fn test_renewal_stores_credential_and_refreshes() {
    let harness = Harness::with_session().await;
    let fetcher = FakeFetcher::new(success(12, Some(34)));
    let coordinator = harness.coordinator(fetcher.clone());
    let new_session = Credential::new([("sessionKey", "sk-new")], Utc::now());
    let flow = renewal(&harness, &coordinator, Ok(new_session.clone()), Duration::ZERO);

    let (outcome, refresh) = flow.renew_and_refresh().await;

    assert_eq!(outcome, RenewalOutcome::Renewed);
    assert!(refresh.is_some_and(|r| r.is_success()));
    assert_eq!(harness.credentials.load().await, Some(new_session));
    assert_eq!(fetcher.seen_sessions(), vec![Some("sk-new".to_string())]);
    assert_eq!(harness.cache.read().await.unwrap().weekly_percent(), Some(34));
}

#[tokio::test]
async fn test_renewal_cuts_cooldown_short() {
    let harness = Harness::with_session().await;
    let fetcher = FakeFetcher::new(RefreshOutcome::AuthExpired);
    let coordinator = harness.coordinator(fetcher.clone());
    coordinator.refresh(RefreshTrigger::Timer).await;
    assert!(coordinator.needs_renewal().await);

    fetcher.set_outcome(success(1, None));
    let flow = renewal(
        &harness,
        &coordinator,
        Ok(Credential::new([("sessionKey", "sk-new")], Utc::now())),
        Duration::ZERO,
    );
    assert_eq!(flow.renew().await, RenewalOutcome::Renewed);

    assert_eq!(fetcher.calls(), 2);
    assert!(!coordinator.needs_renewal().await);
}

#[tokio::test]
async fn test_cancelled_renewal_changes_nothing() {
    let harness = Harness::with_session().await;
    let before = harness.credentials.load().await;
    let fetcher = FakeFetcher::new(success(1, None));
    let coordinator = harness.coordinator(fetcher.clone());
    let flow = renewal(&harness, &coordinator, Err(AcquireError::Cancelled), Duration::ZERO);

    assert_eq!(flow.renew().await, RenewalOutcome::Cancelled);
    assert_eq!(harness.credentials.load().await, before);
    assert_eq!(fetcher.calls(), 0);
    assert!(harness.cache.read().await.is_none());
}

#[tokio::test]
async fn test_failed_renewal_changes_nothing() {
    let harness = Harness::with_session().await;
    let before = harness.credentials.load().await;
    let coordinator = harness.coordinator(FakeFetcher::new(success(1, None)));
    let flow = renewal(
        &harness,
        &coordinator,
        Err(AcquireError::Failed("browser closed".to_string())),
        Duration::ZERO,
    );

    assert_eq!(
        flow.renew().await,
        RenewalOutcome::Failed("browser closed".to_string())
    );
    assert_eq!(harness.credentials.load().await, before);
}

#[tokio::test]
async fn test_empty_credential_is_rejected() {
    let harness = Harness::with_session().await;
    let before = harness.credentials.load().await;
    let coordinator = harness.coordinator(FakeFetcher::new(success(1, None)));
    let empty = Credential::new(Vec::<(String, String)>::new(), Utc::now());
    let flow = renewal(&harness, &coordinator, Ok(empty), Duration::ZERO);

    assert!(matches!(flow.renew().await, RenewalOutcome::Failed(_)));
    assert_eq!(harness.credentials.load().await, before);
}

#[tokio::test]
async fn test_concurrent_renewal_is_refused() {
    let harness = Harness::new();
    let coordinator = harness.coordinator(FakeFetcher::new(success(1, None)));
    let flow = renewal(
        &harness,
        &coordinator,
        Ok(Credential::new([("sessionKey", "sk")], Utc::now())),
        Duration::from_millis(200),
    );

    let first = {
        let flow = flow.clone();
        tokio::spawn(async move { flow.renew().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    let second = flow.renew().await;

    assert_eq!(
        second,
        RenewalOutcome::Failed("renewal already in progress".to_string())
    );
    assert_eq!(first.await.unwrap(), RenewalOutcome::Renewed);
}

#[tokio::test]
async fn test_renewal_may_switch_accounts() {
    let harness = Harness::new();
    harness
        .credentials
        .save(&Credential::new([("sessionKey", "a"), ("lastActiveOrg", "org-a")], Utc::now()))
        .await
        .unwrap();
    let fetcher = FakeFetcher::new(success(1, None));
    let coordinator = harness.coordinator(fetcher.clone());
    let other_account = Credential::new([("sessionKey", "b"), ("lastActiveOrg", "org-b")], Utc::now());
    let flow = renewal(&harness, &coordinator, Ok(other_account), Duration::ZERO);

    assert_eq!(flow.renew().await, RenewalOutcome::Renewed);
    let stored = harness.credentials.load().await.unwrap();
    assert_eq!(stored.organization_id(), Some("org-b"));
    assert_eq!(fetcher.seen_sessions(), vec![Some("b".to_string())]);
}
