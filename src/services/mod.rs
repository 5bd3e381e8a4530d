// Service exports
pub mod cache;
pub mod circuit_breaker;
pub mod guard;
pub mod memory_store;
pub mod rate_limit;
pub mod repository;
pub mod rest_store;
pub mod retry;
pub mod store;

pub use cache::{CacheStats, TierCache};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use guard::{GuardConfig, GuardStats, ResourceGuard};
pub use memory_store::InMemoryStore;
pub use rate_limit::{RateLimitConfig, RateLimitStats, TokenBucket};
pub use repository::SchoolRepository;
pub use rest_store::RestSchoolStore;
pub use retry::{calculate_delay, retry_with_backoff, RetryConfig};
pub use store::SchoolStore;
