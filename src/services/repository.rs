use crate::error::FilterError;
use crate::models::{School, Tier};
use crate::services::cache::{CacheStats, TierCache};
use crate::services::guard::ResourceGuard;
use crate::services::store::SchoolStore;
use std::sync::Arc;

/// Read-only, tier-grouped access to the catalog.
///
/// All store traffic goes through the shared [`ResourceGuard`]; tier pools are
/// served from the [`TierCache`] when fresh.
pub struct SchoolRepository {
    store: Arc<dyn SchoolStore>,
    guard: Arc<ResourceGuard>,
    cache: TierCache,
}

impl SchoolRepository {
    pub fn new(store: Arc<dyn SchoolStore>, guard: Arc<ResourceGuard>, cache: TierCache) -> Self {
        Self { store, guard, cache }
    }

    /// Repository with no cache, mostly for tests
    pub fn uncached(store: Arc<dyn SchoolStore>, guard: Arc<ResourceGuard>) -> Self {
        Self::new(store, guard, TierCache::disabled())
    }

    /// Every school in `tier`
    pub async fn fetch_tier(&self, tier: Tier) -> Result<Arc<Vec<School>>, FilterError> {
        if let Some(pool) = self.cache.get(tier).await {
            return Ok(pool);
        }

        let operation = format!("fetch_tier:{}", tier);
        let schools = self
            .guard
            .execute(&operation, || self.store.fetch_tier(tier))
            .await
            .map_err(|e| {
                tracing::error!(tier = %tier, store = self.store.kind(), error = %e, "Tier fetch failed");
                FilterError::from(e)
            })?;

        tracing::info!(tier = %tier, count = schools.len(), "Retrieved tier pool");
        let pool = Arc::new(schools);
        self.cache.insert(tier, pool.clone()).await;
        Ok(pool)
    }

    /// Schools by exact name; names not in the catalog are simply absent
    pub async fn fetch_by_names(&self, names: &[String]) -> Result<Vec<School>, FilterError> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let schools = self
            .guard
            .execute("fetch_by_names", || self.store.fetch_by_names(names))
            .await
            .map_err(|e| {
                tracing::error!(requested = names.len(), error = %e, "Name lookup failed");
                FilterError::from(e)
            })?;

        tracing::info!(requested = names.len(), found = schools.len(), "Retrieved schools by name");
        Ok(schools)
    }

    /// Probe the store through the guard
    pub async fn health(&self) -> bool {
        match self.guard.execute("health", || self.store.health()).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Store health check failed");
                false
            }
        }
    }

    pub fn guard(&self) -> &Arc<ResourceGuard> {
        &self.guard
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
