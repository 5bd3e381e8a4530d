//! Circuit breaker guarding the catalog store.
//!
//! Consecutive failures past a threshold open the circuit; while open every
//! call is rejected without touching the store. Once the cooldown elapses a
//! single probe call is let through and its outcome decides whether the
//! circuit closes again or re-opens for another cooldown.

use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Configuration for circuit breaker behavior.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,
    /// How long the circuit stays open before a probe is allowed.
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown: Duration::from_secs(60),
        }
    }
}

impl CircuitBreakerConfig {
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold.max(1);
        self
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }
}

/// Externally visible circuit state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy)]
enum BreakerState {
    Closed { failures: u32 },
    Open { since: Instant },
    HalfOpen { probe_in_flight: bool },
}

/// Circuit breaker with exactly-one-probe half-open semantics.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    state: Mutex<BreakerState>,
    rejected: AtomicU64,
    times_opened: AtomicU64,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            state: Mutex::new(BreakerState::Closed { failures: 0 }),
            rejected: AtomicU64::new(0),
            times_opened: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Ask to make one store call.
    ///
    /// The returned permit must be settled with [`CallPermit::success`] or
    /// [`CallPermit::failure`]. A probe permit dropped unsettled (the call was
    /// cancelled) frees the probe slot for the next caller.
    pub fn try_acquire(&self) -> Result<CallPermit<'_>, StoreError> {
        let mut state = self.lock();
        match *state {
            BreakerState::Closed { .. } => Ok(CallPermit::new(self, false)),
            BreakerState::Open { since } => {
                let elapsed = since.elapsed();
                if elapsed >= self.config.cooldown {
                    *state = BreakerState::HalfOpen { probe_in_flight: true };
                    tracing::info!("Circuit half-open, sending probe call");
                    Ok(CallPermit::new(self, true))
                } else {
                    self.rejected.fetch_add(1, Ordering::Relaxed);
                    let remaining = self.config.cooldown - elapsed;
                    Err(StoreError::CircuitOpen {
                        remaining_ms: remaining.as_millis() as u64,
                    })
                }
            }
            BreakerState::HalfOpen { probe_in_flight: true } => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                Err(StoreError::CircuitOpen { remaining_ms: 0 })
            }
            BreakerState::HalfOpen { probe_in_flight: false } => {
                *state = BreakerState::HalfOpen { probe_in_flight: true };
                Ok(CallPermit::new(self, true))
            }
        }
    }

    fn on_success(&self, probe: bool) {
        let mut state = self.lock();
        match *state {
            BreakerState::HalfOpen { .. } if probe => {
                tracing::info!("Probe succeeded, circuit closed");
                *state = BreakerState::Closed { failures: 0 };
            }
            BreakerState::Closed { .. } => *state = BreakerState::Closed { failures: 0 },
            // a call admitted before the circuit opened says nothing about now
            _ => {}
        }
    }

    fn on_failure(&self, probe: bool) {
        let mut state = self.lock();
        match *state {
            BreakerState::HalfOpen { .. } if probe => {
                tracing::warn!("Probe failed, circuit re-opened");
                *state = BreakerState::Open { since: Instant::now() };
                self.times_opened.fetch_add(1, Ordering::Relaxed);
            }
            BreakerState::Closed { failures } => {
                let failures = failures + 1;
                if failures >= self.config.failure_threshold {
                    tracing::warn!(
                        failures,
                        cooldown_secs = self.config.cooldown.as_secs(),
                        "Failure threshold reached, circuit opened"
                    );
                    *state = BreakerState::Open { since: Instant::now() };
                    self.times_opened.fetch_add(1, Ordering::Relaxed);
                } else {
                    *state = BreakerState::Closed { failures };
                }
            }
            _ => {}
        }
    }

    fn on_abandoned(&self, probe: bool) {
        if !probe {
            return;
        }
        let mut state = self.lock();
        if let BreakerState::HalfOpen { .. } = *state {
            *state = BreakerState::HalfOpen { probe_in_flight: false };
        }
    }

    /// Current state. An open circuit whose cooldown has elapsed still reports
    /// `Open` until the next call turns it half-open.
    pub fn state(&self) -> CircuitState {
        match *self.lock() {
            BreakerState::Closed { .. } => CircuitState::Closed,
            BreakerState::Open { .. } => CircuitState::Open,
            BreakerState::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        match *self.lock() {
            BreakerState::Closed { failures } => failures,
            _ => self.config.failure_threshold,
        }
    }

    pub fn rejected_calls(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    pub fn times_opened(&self) -> u64 {
        self.times_opened.load(Ordering::Relaxed)
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

/// Admission for one store call through the breaker.
#[derive(Debug)]
#[must_use = "a permit must be settled with success() or failure()"]
pub struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    probe: bool,
    settled: bool,
}

impl<'a> CallPermit<'a> {
    fn new(breaker: &'a CircuitBreaker, probe: bool) -> Self {
        Self {
            breaker,
            probe,
            settled: false,
        }
    }

    pub fn is_probe(&self) -> bool {
        self.probe
    }

    pub fn success(mut self) {
        self.settled = true;
        self.breaker.on_success(self.probe);
    }

    pub fn failure(mut self) {
        self.settled = true;
        self.breaker.on_failure(self.probe);
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.on_abandoned(self.probe);
        }
    }
}
