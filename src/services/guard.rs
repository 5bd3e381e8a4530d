use crate::config::GuardSettings;
use crate::error::StoreError;
use crate::services::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
use crate::services::rate_limit::{RateLimitConfig, RateLimitStats, TokenBucket};
use crate::services::retry::{retry_with_backoff, RetryConfig};
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;

/// Settings for a [`ResourceGuard`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuardConfig {
    pub max_concurrent: usize,
    pub rate_limit: RateLimitConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    pub retry: RetryConfig,
    /// Applied to every single store round-trip
    pub call_timeout: Duration,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 10,
            rate_limit: RateLimitConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            retry: RetryConfig::default(),
            call_timeout: Duration::from_secs(10),
        }
    }
}

impl GuardConfig {
    pub fn from_settings(settings: &GuardSettings) -> Self {
        Self {
            max_concurrent: settings.max_concurrent_requests.max(1),
            rate_limit: RateLimitConfig::default()
                .with_requests_per_second(settings.requests_per_second)
                .with_burst_size(settings.burst_size)
                .with_max_wait(Duration::from_millis(settings.max_throttle_wait_ms)),
            circuit_breaker: CircuitBreakerConfig::default()
                .with_failure_threshold(settings.failure_threshold)
                .with_cooldown(Duration::from_secs(settings.cooldown_secs)),
            retry: RetryConfig::default()
                .with_max_attempts(settings.retry_attempts)
                .with_base_delay(Duration::from_millis(settings.retry_base_delay_ms))
                .with_max_delay(Duration::from_millis(settings.retry_max_delay_ms)),
            call_timeout: Duration::from_millis(settings.call_timeout_ms),
        }
    }
}

/// Bounded-concurrency, rate-limited, circuit-breaking wrapper around store calls.
///
/// Every store round-trip goes through [`execute`](Self::execute), which applies,
/// per attempt: concurrency permit, rate token, circuit check, timeout. Transient
/// failures are retried with backoff; an open circuit is never retried.
///
/// One instance is shared (behind an `Arc`) by every request that talks to the
/// same store. Its counters are only touched through its own methods.
#[derive(Debug)]
pub struct ResourceGuard {
    config: GuardConfig,
    semaphore: Semaphore,
    bucket: TokenBucket,
    breaker: CircuitBreaker,
    total_calls: AtomicU64,
    failed_calls: AtomicU64,
}

impl ResourceGuard {
    pub fn new(config: GuardConfig) -> Self {
        Self {
            semaphore: Semaphore::new(config.max_concurrent.max(1)),
            bucket: TokenBucket::new(config.rate_limit),
            breaker: CircuitBreaker::new(config.circuit_breaker),
            total_calls: AtomicU64::new(0),
            failed_calls: AtomicU64::new(0),
            config,
        }
    }

    /// Run a store operation under every guard discipline, retrying transient failures.
    ///
    /// `call` is invoked once per attempt and must build a fresh future each time.
    pub async fn execute<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        retry_with_backoff(&self.config.retry, operation, |_| self.attempt(operation, call())).await
    }

    async fn attempt<T, Fut>(&self, operation: &str, call: Fut) -> Result<T, StoreError>
    where
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let _slot = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| StoreError::Connection("resource guard closed".to_string()))?;

        self.bucket.acquire().await?;

        // Checked after queueing so calls that waited out a failure never reach the store
        let permit = self.breaker.try_acquire().map_err(|err| {
            tracing::debug!(operation, "Circuit open, rejecting store call");
            err
        })?;
        if permit.is_probe() {
            tracing::info!(operation, "Circuit half-open, sending probe call");
        }

        self.total_calls.fetch_add(1, Ordering::Relaxed);
        let timeout = self.config.call_timeout;

        match tokio::time::timeout(timeout, call).await {
            Ok(Ok(value)) => {
                permit.success();
                Ok(value)
            }
            Ok(Err(err)) => {
                self.failed_calls.fetch_add(1, Ordering::Relaxed);
                permit.failure();
                Err(err)
            }
            Err(_) => {
                self.failed_calls.fetch_add(1, Ordering::Relaxed);
                permit.failure();
                tracing::warn!(operation, timeout_ms = timeout.as_millis() as u64, "Store call timed out");
                Err(StoreError::Timeout(timeout.as_millis() as u64))
            }
        }
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.breaker.state()
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub fn stats(&self) -> GuardStats {
        let available = self.semaphore.available_permits();
        GuardStats {
            max_concurrent: self.config.max_concurrent,
            in_flight: self.config.max_concurrent.saturating_sub(available),
            circuit_state: self.breaker.state(),
            consecutive_failures: self.breaker.consecutive_failures(),
            total_calls: self.total_calls.load(Ordering::Relaxed),
            failed_calls: self.failed_calls.load(Ordering::Relaxed),
            rejected_calls: self.breaker.rejected_calls(),
            times_opened: self.breaker.times_opened(),
            rate_limit: self.bucket.stats(),
        }
    }
}

impl Default for ResourceGuard {
    fn default() -> Self {
        Self::new(GuardConfig::default())
    }
}

/// Snapshot of guard counters for the health probe
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GuardStats {
    pub max_concurrent: usize,
    pub in_flight: usize,
    pub circuit_state: CircuitState,
    pub consecutive_failures: u32,
    pub total_calls: u64,
    pub failed_calls: u64,
    pub rejected_calls: u64,
    pub times_opened: u64,
    pub rate_limit: RateLimitStats,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    fn quick_guard(threshold: u32, attempts: u32) -> ResourceGuard {
        ResourceGuard::new(GuardConfig {
            max_concurrent: 2,
            rate_limit: RateLimitConfig::default().with_requests_per_second(0.0),
            circuit_breaker: CircuitBreakerConfig::default()
                .with_failure_threshold(threshold)
                .with_cooldown(Duration::from_secs(30)),
            retry: RetryConfig::default()
                .with_max_attempts(attempts)
                .with_base_delay(Duration::from_millis(5))
                .with_jitter(false),
            call_timeout: Duration::from_millis(200),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_failure() {
        let guard = quick_guard(5, 1);
        let result: Result<(), _> = guard
            .execute("slow", || async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;

        assert_eq!(result, Err(StoreError::Timeout(200)));
        assert_eq!(guard.stats().failed_calls, 1);
        assert_eq!(guard.stats().consecutive_failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_circuit_skips_store() {
        let guard = quick_guard(2, 1);
        let attempts = AtomicUsize::new(0);

        for _ in 0..2 {
            let _ = guard
                .execute("failing", || async {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(StoreError::Connection("refused".into()))
                })
                .await;
        }
        assert_eq!(guard.circuit_state(), CircuitState::Open);

        let result = guard
            .execute("failing", || async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Ok::<_, StoreError>(())
            })
            .await;
        assert!(matches!(result, Err(StoreError::CircuitOpen { .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert_eq!(guard.stats().total_calls, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_is_bounded() {
        let guard = Arc::new(quick_guard(5, 1));
        let peak = Arc::new(AtomicUsize::new(0));
        let current = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let guard = guard.clone();
            let peak = peak.clone();
            let current = current.clone();
            handles.push(tokio::spawn(async move {
                guard
                    .execute("probe", || {
                        let peak = peak.clone();
                        let current = current.clone();
                        async move {
                            let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                            peak.fetch_max(now, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(10)).await;
                            current.fetch_sub(1, Ordering::SeqCst);
                            Ok::<_, StoreError>(())
                        }
                    })
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(guard.stats().in_flight, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_queued_call_rejected_once_circuit_opens() {
        let guard = Arc::new(ResourceGuard::new(GuardConfig {
            max_concurrent: 1,
            ..quick_guard(1, 1).config
        }));
        let hits = Arc::new(AtomicUsize::new(0));

        let first = {
            let guard = guard.clone();
            let hits = hits.clone();
            tokio::spawn(async move {
                guard
                    .execute("failing", || {
                        let hits = hits.clone();
                        async move {
                            hits.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(100)).await;
                            Err::<(), _>(StoreError::Connection("down".into()))
                        }
                    })
                    .await
            })
        };
        // Let the first call take the only slot
        tokio::task::yield_now().await;

        let queued = guard
            .execute("queued", || {
                let hits = hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, StoreError>(())
                }
            })
            .await;

        assert!(first.await.unwrap().is_err());
        assert!(matches!(queued, Err(StoreError::CircuitOpen { .. })));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(guard.circuit_state(), CircuitState::Open);
        assert_eq!(guard.stats().times_opened, 1);
    }
}
