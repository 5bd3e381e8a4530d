use crate::error::StoreError;
use crate::models::{School, Tier};
use async_trait::async_trait;

/// Narrow read interface to the school catalog.
///
/// Implementations perform exactly one round-trip per call and never retry;
/// retries, throttling and circuit breaking belong to the
/// [`ResourceGuard`](crate::services::ResourceGuard) wrapped around them.
#[async_trait]
pub trait SchoolStore: Send + Sync {
    /// Every school in one competitive tier
    async fn fetch_tier(&self, tier: Tier) -> Result<Vec<School>, StoreError>;

    /// Schools whose names are in `names`. Unknown names are ignored.
    async fn fetch_by_names(&self, names: &[String]) -> Result<Vec<School>, StoreError>;

    /// Lightweight liveness probe
    async fn health(&self) -> Result<(), StoreError>;

    /// Short label for logs
    fn kind(&self) -> &'static str;
}
