// Resilience tests: guard disciplines and partial degradation against a misbehaving store

use async_trait::async_trait;
use recruit_match::core::{FitScorer, MatchPipeline, PipelineConfig};
use recruit_match::error::StoreError;
use recruit_match::models::{PreferenceSet, School, Tier, TierClassification};
use recruit_match::services::{
    CircuitBreakerConfig, CircuitState, GuardConfig, InMemoryStore, RateLimitConfig, ResourceGuard, RetryConfig,
    SchoolRepository, SchoolStore,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

/// Store wrapper that injects failures and latency per tier
struct FlakyStore {
    inner: InMemoryStore,
    /// Remaining failures per tier; `usize::MAX` fails forever
    failures: Mutex<BTreeMap<Tier, usize>>,
    error: StoreError,
    latency: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl FlakyStore {
    fn new(schools: Vec<School>, error: StoreError) -> Self {
        Self {
            inner: InMemoryStore::new(schools),
            failures: Mutex::new(BTreeMap::new()),
            error,
            latency: Duration::ZERO,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    fn failing(self, tier: Tier, times: usize) -> Self {
        self.failures.lock().unwrap().insert(tier, times);
        self
    }

    fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SchoolStore for FlakyStore {
    async fn fetch_tier(&self, tier: Tier) -> Result<Vec<School>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let should_fail = {
            let mut failures = self.failures.lock().unwrap();
            match failures.get_mut(&tier) {
                Some(remaining) if *remaining > 0 => {
                    if *remaining != usize::MAX {
                        *remaining -= 1;
                    }
                    true
                }
                _ => false,
            }
        };

        if should_fail {
            Err(self.error.clone())
        } else {
            self.inner.fetch_tier(tier).await
        }
    }

    async fn fetch_by_names(&self, names: &[String]) -> Result<Vec<School>, StoreError> {
        self.inner.fetch_by_names(names).await
    }

    async fn health(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "flaky"
    }
}

fn create_catalog() -> Vec<School> {
    let mut schools: Vec<School> = (0..8)
        .map(|i| {
            let mut school = School::new(format!("Mid {}", i), Tier::NonP4D1);
            school.school_state = Some("CA".into());
            school
        })
        .collect();
    schools.push(School::new("Power", Tier::Power4D1));
    schools.push(School::new("Small", Tier::NonD1));
    schools
}

fn create_guard(threshold: u32, attempts: u32) -> Arc<ResourceGuard> {
    Arc::new(ResourceGuard::new(GuardConfig {
        max_concurrent: 2,
        rate_limit: RateLimitConfig::default().with_requests_per_second(0.0),
        circuit_breaker: CircuitBreakerConfig::default()
            .with_failure_threshold(threshold)
            .with_cooldown(Duration::from_secs(30)),
        retry: RetryConfig::default()
            .with_max_attempts(attempts)
            .with_base_delay(Duration::from_millis(10))
            .with_jitter(false),
        call_timeout: Duration::from_secs(5),
    }))
}

fn middle_tier() -> TierClassification {
    TierClassification::from_probabilities(0.75, Some(0.35)).unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_transient_failure_is_retried() {
    let store = Arc::new(
        FlakyStore::new(create_catalog(), StoreError::Connection("reset".into())).failing(Tier::NonP4D1, 2),
    );
    let repository = SchoolRepository::uncached(store.clone(), create_guard(5, 3));

    let pool = assert_ok!(repository.fetch_tier(Tier::NonP4D1).await);
    assert_eq!(pool.len(), 8);
    assert_eq!(store.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_non_transient_failure_is_attempted_once() {
    let store = Arc::new(
        FlakyStore::new(create_catalog(), StoreError::Http { status: 404, message: "missing".into() })
            .failing(Tier::NonP4D1, usize::MAX),
    );
    let repository = SchoolRepository::uncached(store.clone(), create_guard(5, 3));

    let err = repository.fetch_tier(Tier::NonP4D1).await.unwrap_err();
    assert_eq!(err.code(), "store_unavailable");
    assert_eq!(store.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_open_circuit_fails_fast_then_admits_one_probe() {
    let store = Arc::new(
        FlakyStore::new(create_catalog(), StoreError::Decode("bad row".into()))
            .failing(Tier::NonP4D1, 3)
            .with_latency(Duration::from_millis(100)),
    );
    let guard = create_guard(3, 1);
    let repository = Arc::new(SchoolRepository::uncached(store.clone(), guard.clone()));

    for _ in 0..3 {
        assert_err!(repository.fetch_tier(Tier::NonP4D1).await);
    }
    assert_eq!(guard.circuit_state(), CircuitState::Open);

    // Rejected without reaching the store
    assert_err!(repository.fetch_tier(Tier::NonP4D1).await);
    assert_eq!(store.calls(), 3);

    tokio::time::advance(Duration::from_secs(31)).await;

    let probe = {
        let repository = repository.clone();
        tokio::spawn(async move { repository.fetch_tier(Tier::NonP4D1).await })
    };
    // Let the probe take its slot and start sleeping inside the store
    tokio::task::yield_now().await;
    tokio::task::yield_now().await;

    let concurrent = repository.fetch_tier(Tier::NonP4D1).await;
    assert!(concurrent.is_err(), "only one probe may run while half-open");

    let probed = probe.await.unwrap();
    assert_eq!(probed.unwrap().len(), 8);
    assert_eq!(store.calls(), 4);
    assert_eq!(guard.circuit_state(), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_concurrency_is_bounded() {
    let store = Arc::new(
        FlakyStore::new(create_catalog(), StoreError::Connection("unused".into()))
            .with_latency(Duration::from_millis(50)),
    );
    let repository = Arc::new(SchoolRepository::uncached(store.clone(), create_guard(5, 1)));

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..6 {
        let repository = repository.clone();
        tasks.spawn(async move { repository.fetch_tier(Tier::NonD1).await });
    }
    while let Some(result) = tasks.join_next().await {
        assert_ok!(result.unwrap());
    }

    assert_eq!(store.calls(), 6);
    assert!(store.peak_in_flight.load(Ordering::SeqCst) <= 2);
}

#[tokio::test(start_paused = true)]
async fn test_throttled_call_is_not_retried() {
    let store = Arc::new(FlakyStore::new(create_catalog(), StoreError::Connection("unused".into())));
    let guard = Arc::new(ResourceGuard::new(GuardConfig {
        rate_limit: RateLimitConfig::default()
            .with_requests_per_second(1.0)
            .with_burst_size(1)
            .with_max_wait(Duration::ZERO),
        ..GuardConfig::default()
    }));
    let repository = SchoolRepository::uncached(store.clone(), guard.clone());

    assert_ok!(repository.fetch_tier(Tier::NonD1).await);
    assert_err!(repository.fetch_tier(Tier::NonD1).await);
    assert_eq!(store.calls(), 1);
    assert_eq!(guard.circuit_state(), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_overlap_failure_degrades() {
    let store = Arc::new(
        FlakyStore::new(create_catalog(), StoreError::Decode("bad row".into())).failing(Tier::NonD1, usize::MAX),
    );
    let repository = Arc::new(SchoolRepository::uncached(store, create_guard(10, 1)));
    let pipeline = MatchPipeline::new(repository, PipelineConfig::default());
    let prefs = PreferenceSet::builder("CA").build().unwrap();

    let result = pipeline.find_matches(&prefs, &middle_tier(), 50).await.unwrap();
    assert!(result.degraded);
    assert_eq!(result.degradation.failed_tiers.len(), 1);
    assert_eq!(result.degradation.failed_tiers[0].tier, Tier::NonD1);
    assert_eq!(result.schools.len(), 9);
    assert!(result.schools.iter().all(|s| s.tier() != Tier::NonD1));

    let count = pipeline.count(&prefs, &middle_tier()).await.unwrap();
    assert_eq!(count, result.must_have_count);
}

#[tokio::test(start_paused = true)]
async fn test_primary_failure_is_store_unavailable() {
    let store = Arc::new(
        FlakyStore::new(create_catalog(), StoreError::Connection("down".into())).failing(Tier::NonP4D1, usize::MAX),
    );
    let repository = Arc::new(SchoolRepository::uncached(store, create_guard(10, 2)));
    let pipeline = MatchPipeline::new(repository, PipelineConfig::default());
    let prefs = PreferenceSet::builder("CA").build().unwrap();

    let err = pipeline.find_matches(&prefs, &middle_tier(), 10).await.unwrap_err();
    assert_eq!(err.code(), "store_unavailable");
}

/// Fit scorer that blows up on one named school
struct ExplodingFitScorer {
    target: &'static str,
}

impl FitScorer for ExplodingFitScorer {
    fn fit_percentile(&self, school: &School, _: &TierClassification) -> Option<f64> {
        if school.school_name == self.target {
            panic!("fit model crashed on {}", school.school_name);
        }
        Some(50.0)
    }
}

#[tokio::test]
async fn test_failed_scoring_batch_degrades() {
    // 12 primary schools score in batches of 5, 5 and 2
    let mut schools: Vec<School> = (0..12)
        .map(|i| School::new(format!("Mid {:02}", i), Tier::NonP4D1))
        .collect();
    schools.push(School::new("Power", Tier::Power4D1));
    let store = Arc::new(InMemoryStore::new(schools));
    let repository = Arc::new(SchoolRepository::uncached(store, create_guard(5, 1)));
    let pipeline = MatchPipeline::new(repository, PipelineConfig::default())
        .with_fit_scorer(Arc::new(ExplodingFitScorer { target: "Mid 07" }));
    let prefs = PreferenceSet::builder("CA").build().unwrap();

    let result = assert_ok!(pipeline.find_matches(&prefs, &middle_tier(), 50).await);
    assert!(result.degraded);
    assert_eq!(result.degradation.failed_batches, 1);
    assert_eq!(result.degradation.dropped_schools, 5);
    assert!(result.degradation.failed_tiers.is_empty());

    assert_eq!(result.schools.len(), 8);
    assert!(result.schools.iter().any(|s| s.name() == "Power"));
    for lost in 5..10 {
        let name = format!("Mid {:02}", lost);
        assert!(result.schools.iter().all(|s| s.name() != name), "{} was in the failed batch", name);
    }
    assert!(result.schools.iter().all(|s| s.fit_percentile == Some(50.0)));
}
