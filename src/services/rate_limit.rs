//! Token bucket throttle for store requests.
//!
//! Caps the request rate independently of how many calls are in flight.

use crate::error::StoreError;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Configuration for rate limiting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitConfig {
    /// Sustained rate. Zero or negative disables throttling.
    pub requests_per_second: f64,
    /// Maximum requests that can be made instantly.
    pub burst_size: u32,
    /// Longest a caller will wait for a token before giving up.
    pub max_wait: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 50.0,
            burst_size: 10,
            max_wait: Duration::from_secs(5),
        }
    }
}

impl RateLimitConfig {
    pub fn with_requests_per_second(mut self, rps: f64) -> Self {
        self.requests_per_second = rps;
        self
    }

    pub fn with_burst_size(mut self, burst: u32) -> Self {
        self.burst_size = burst.max(1);
        self
    }

    pub fn with_max_wait(mut self, wait: Duration) -> Self {
        self.max_wait = wait;
        self
    }

    fn enabled(&self) -> bool {
        self.requests_per_second > 0.0
    }
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Async token bucket; waiting happens outside the lock.
#[derive(Debug)]
pub struct TokenBucket {
    config: RateLimitConfig,
    bucket: Mutex<Bucket>,
    total_acquired: AtomicU64,
    total_waited: AtomicU64,
    total_rejected: AtomicU64,
}

impl TokenBucket {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            bucket: Mutex::new(Bucket {
                tokens: config.burst_size as f64,
                last_refill: Instant::now(),
            }),
            total_acquired: AtomicU64::new(0),
            total_waited: AtomicU64::new(0),
            total_rejected: AtomicU64::new(0),
        }
    }

    /// Take a token if one is available, otherwise report how long until one is
    fn reserve(&self) -> Result<(), Duration> {
        let mut bucket = self.bucket.lock().unwrap_or_else(PoisonError::into_inner);

        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.last_refill = now;
        bucket.tokens = (bucket.tokens + elapsed * self.config.requests_per_second)
            .min(self.config.burst_size as f64);

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            Ok(())
        } else {
            let needed = 1.0 - bucket.tokens;
            // Rates too small to represent wait longer than any caller would
            Err(Duration::try_from_secs_f64(needed / self.config.requests_per_second).unwrap_or(Duration::MAX))
        }
    }

    /// Wait for a token, up to `max_wait`.
    pub async fn acquire(&self) -> Result<(), StoreError> {
        if !self.config.enabled() {
            return Ok(());
        }

        let start = Instant::now();
        let mut waited = false;

        loop {
            match self.reserve() {
                Ok(()) => {
                    self.total_acquired.fetch_add(1, Ordering::Relaxed);
                    if waited {
                        self.total_waited.fetch_add(1, Ordering::Relaxed);
                    }
                    return Ok(());
                }
                Err(wait) => {
                    if start.elapsed().saturating_add(wait) > self.config.max_wait {
                        self.total_rejected.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!(wait_ms = wait.as_millis() as u64, "Rate limit wait exceeded");
                        return Err(StoreError::Throttled);
                    }
                    waited = true;
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    pub fn stats(&self) -> RateLimitStats {
        RateLimitStats {
            total_acquired: self.total_acquired.load(Ordering::Relaxed),
            total_waited: self.total_waited.load(Ordering::Relaxed),
            total_rejected: self.total_rejected.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RateLimitStats {
    pub total_acquired: u64,
    pub total_waited: u64,
    pub total_rejected: u64,
}
