use crate::models::{School, Tier};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// In-process cache of whole tier pools.
///
/// Entries expire after the configured TTL and nothing is persisted.
/// A TTL of zero disables the cache.
pub struct TierCache {
    cache: Option<moka::future::Cache<Tier, Arc<Vec<School>>>>,
    ttl_secs: u64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl TierCache {
    pub fn new(max_entries: u64, ttl_secs: u64) -> Self {
        let cache = (ttl_secs > 0).then(|| {
            moka::future::CacheBuilder::new(max_entries.max(1))
                .time_to_live(Duration::from_secs(ttl_secs))
                .build()
        });

        Self {
            cache,
            ttl_secs,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn disabled() -> Self {
        Self::new(0, 0)
    }

    pub fn is_enabled(&self) -> bool {
        self.cache.is_some()
    }

    pub async fn get(&self, tier: Tier) -> Option<Arc<Vec<School>>> {
        let cache = self.cache.as_ref()?;
        match cache.get(&tier).await {
            Some(pool) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::trace!("Tier cache hit: {}", tier);
                Some(pool)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                tracing::trace!("Tier cache miss: {}", tier);
                None
            }
        }
    }

    pub async fn insert(&self, tier: Tier, pool: Arc<Vec<School>>) {
        if let Some(cache) = &self.cache {
            cache.insert(tier, pool).await;
        }
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;
        CacheStats {
            entries: self.cache.as_ref().map(|c| c.entry_count()).unwrap_or(0),
            ttl_secs: self.ttl_secs,
            hit_count: hits,
            miss_count: misses,
            hit_rate: if lookups > 0 { hits as f64 / lookups as f64 } else { 0.0 },
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: u64,
    pub ttl_secs: u64,
    pub hit_count: u64,
    pub miss_count: u64,
    pub hit_rate: f64,
}
