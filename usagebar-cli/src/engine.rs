//! Wires the stores, the fetcher, and the coordinator from settings.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::debug;
use usagebar_fetch::ClaudeWebFetcher;
use usagebar_store::{
    CREDENTIALS_FILE, CoordinatorConfig, CredentialStore, RefreshCoordinator, Settings,
    SettingsStore, USAGE_CACHE_FILE, UsageCache,
};

/// Everything a command needs, built from one settings file.
pub struct Engine {
    pub settings: Settings,
    pub credentials: CredentialStore,
    pub coordinator: RefreshCoordinator,
}

impl Engine {
    /// Builds the engine and seeds the coordinator from the cache.
    pub async fn open(store: &SettingsStore) -> Result<Self> {
        Self::open_with(store.get().await, store).await
    }

    /// Builds the engine from `settings`, keeping state files next to `store`.
    pub async fn open_with(settings: Settings, store: &SettingsStore) -> Result<Self> {
        settings.validate().context("invalid settings")?;

        let dir = store.dir();
        let credentials = CredentialStore::new(dir.join(CREDENTIALS_FILE));
        let cache = Self::cache_for(store);
        debug!(dir = %dir.display(), "Using state directory");

        let fetcher = ClaudeWebFetcher::new(&settings.base_url, settings.fetch_timeout())
            .context("cannot create HTTP client")?
            .with_organization(settings.organization_id.clone());
        let config = CoordinatorConfig::from_settings(&settings)?;
        let coordinator =
            RefreshCoordinator::new(Arc::new(fetcher), credentials.clone(), cache, config);
        coordinator.load().await;

        Ok(Self {
            settings,
            credentials,
            coordinator,
        })
    }

    /// Cache-only view of the state directory; never builds a fetcher.
    pub fn cache_for(store: &SettingsStore) -> UsageCache {
        UsageCache::new(store.dir().join(USAGE_CACHE_FILE))
    }
}
