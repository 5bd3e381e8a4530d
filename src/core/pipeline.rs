use crate::config::PipelineSettings;
use crate::core::classifier::{classify, PreferencePartition};
use crate::core::filters::apply_hard_filters;
use crate::core::ranker::{rank, tier_alignment};
use crate::core::scorer::{FitScorer, MatchScorer};
use crate::core::tiers::{select_overlap, TierSelector, DEFAULT_MIN_OVERLAP};
use crate::error::FilterError;
use crate::models::{
    DegradationReport, FailedTier, FilterReport, FilteringResult, PreferenceName, PreferenceSet, School, ScoredSchool,
    Tier, TierClassification, TierPlan,
};
use crate::services::SchoolRepository;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Pipeline tuning knobs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Concurrent scoring batches
    pub workers: usize,
    pub default_limit: usize,
    pub max_limit: usize,
    pub min_overlap: usize,
    /// Scoring tasks yield to the scheduler after this many schools
    pub yield_every: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 10,
            default_limit: 50,
            max_limit: 200,
            min_overlap: DEFAULT_MIN_OVERLAP,
            yield_every: 5,
        }
    }
}

impl PipelineConfig {
    pub fn from_settings(settings: &PipelineSettings) -> Self {
        Self {
            workers: settings.workers.max(1),
            default_limit: settings.default_limit.max(1),
            max_limit: settings.max_limit.max(1),
            min_overlap: settings.min_overlap,
            yield_every: settings.yield_every.max(1),
        }
    }
}

/// Batch size for scoring `n` candidates across `workers` tasks.
///
/// Small pools run as one batch, medium pools in roughly three, large pools
/// spread over the workers in batches of 10 to 25.
pub fn batch_size(n: usize, workers: usize) -> usize {
    if n <= 10 {
        n.max(1)
    } else if n <= 50 {
        (n / 3).max(5)
    } else {
        (n / workers.max(1)).clamp(10, 25)
    }
}

/// Fetched and hard-filtered tier pools plus the plan built from them
struct Prepared {
    primary: Tier,
    partition: PreferencePartition,
    filtered: BTreeMap<Tier, Vec<School>>,
    reports: Vec<FilterReport>,
    total_candidates: usize,
    degradation: DegradationReport,
    plan: TierPlan,
}

impl Prepared {
    fn pool_sizes(&self) -> BTreeMap<Tier, usize> {
        self.filtered.iter().map(|(tier, pool)| (*tier, pool.len())).collect()
    }
}

/// One unit of scoring work
struct ScoringJob {
    tier: Tier,
    schools: Vec<School>,
}

/// Orchestrates retrieval, hard filtering, tier planning, scoring and ranking.
///
/// # Stages
/// 1. Validate the classification and partition the preferences
/// 2. Fetch the primary tier and its neighbours concurrently
/// 3. Run the five hard-filter stages over each pool
/// 4. Plan per-tier limits from the filtered primary pool
/// 5. Score selected pools in adaptive batches on a bounded worker set
/// 6. Keep the best overlap schools, then rank and truncate
pub struct MatchPipeline {
    repository: Arc<SchoolRepository>,
    scorer: Arc<MatchScorer>,
    fit_scorer: Option<Arc<dyn FitScorer>>,
    selector: TierSelector,
    workers: Arc<Semaphore>,
    config: PipelineConfig,
}

impl MatchPipeline {
    pub fn new(repository: Arc<SchoolRepository>, config: PipelineConfig) -> Self {
        Self {
            repository,
            scorer: Arc::new(MatchScorer::with_defaults()),
            fit_scorer: None,
            selector: TierSelector::new(config.min_overlap),
            workers: Arc::new(Semaphore::new(config.workers.max(1))),
            config,
        }
    }

    pub fn with_scorer(mut self, scorer: MatchScorer) -> Self {
        self.scorer = Arc::new(scorer);
        self
    }

    pub fn with_fit_scorer(mut self, fit_scorer: Arc<dyn FitScorer>) -> Self {
        self.fit_scorer = Some(fit_scorer);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn repository(&self) -> &Arc<SchoolRepository> {
        &self.repository
    }

    /// Number of schools that pass every must-have and fit the tier plan.
    /// Performs no scoring.
    pub async fn count(&self, preferences: &PreferenceSet, classification: &TierClassification) -> Result<usize, FilterError> {
        let prepared = self.prepare(preferences, classification).await?;
        let count = prepared.plan.selected_count(&prepared.pool_sizes());

        tracing::info!(
            primary = %prepared.primary,
            count,
            degraded = prepared.degradation.is_degraded(),
            "Counted must-have matches"
        );
        Ok(count)
    }

    /// Full pipeline: the best `limit` schools with match explanations
    pub async fn find_matches(
        &self,
        preferences: &PreferenceSet,
        classification: &TierClassification,
        limit: usize,
    ) -> Result<FilteringResult, FilterError> {
        if limit == 0 {
            return Err(FilterError::invalid("limit must be at least 1"));
        }

        let prepared = self.prepare(preferences, classification).await?;
        let must_have_count = prepared.plan.selected_count(&prepared.pool_sizes());
        let Prepared {
            primary,
            partition,
            mut filtered,
            reports,
            total_candidates,
            mut degradation,
            plan,
        } = prepared;

        if plan.is_empty() {
            tracing::info!(primary = %primary, total_candidates, "No schools survived the must-have filters");
            let mut result = FilteringResult::empty(primary, total_candidates);
            result.filter_reports = reports;
            result.degraded = degradation.is_degraded();
            result.degradation = degradation;
            return Ok(result);
        }

        let pools: Vec<(Tier, Vec<School>)> = plan
            .limits
            .keys()
            .filter_map(|tier| filtered.remove(tier).map(|pool| (*tier, pool)))
            .collect();

        let scored = self
            .score_pools(pools, preferences, &partition.optional, classification, &mut degradation)
            .await;

        let overlap_limits: BTreeMap<Tier, usize> = plan.overlap_tiers().collect();
        let mut selected = Vec::new();
        for (tier, mut schools) in scored {
            if let Some(&overlap_limit) = overlap_limits.get(&tier) {
                schools = select_overlap(schools, overlap_limit);
            }
            for school in schools.iter_mut() {
                school.tier_alignment = tier_alignment(classification, primary, tier);
            }
            selected.extend(schools);
        }

        rank(&mut selected);
        selected.truncate(limit);

        tracing::info!(
            primary = %primary,
            returned = selected.len(),
            must_have_count,
            total_candidates,
            degraded = degradation.is_degraded(),
            "Match pipeline complete"
        );

        Ok(FilteringResult {
            schools: selected,
            must_have_count,
            total_candidates,
            degraded: degradation.is_degraded(),
            degradation,
            filter_reports: reports,
            plan,
        })
    }

    async fn prepare(&self, preferences: &PreferenceSet, classification: &TierClassification) -> Result<Prepared, FilterError> {
        classification.validate()?;
        let partition = classify(preferences);
        let primary = classification.primary_tier();

        tracing::debug!(
            primary = %primary,
            mandatory = ?partition.mandatory,
            optional = ?partition.optional,
            "Preferences classified"
        );
        let unscored: Vec<PreferenceName> = partition
            .optional
            .iter()
            .copied()
            .filter(|name| !self.scorer.supports(*name))
            .collect();
        if !unscored.is_empty() {
            tracing::debug!(?unscored, "No comparator registered, preferences left unexplained");
        }

        let mut degradation = DegradationReport::default();
        let fetched = self.fetch_pools(primary, &mut degradation).await?;

        let mut filtered = BTreeMap::new();
        let mut reports = Vec::new();
        let mut total_candidates = 0;
        for (tier, pool) in fetched {
            total_candidates += pool.len();
            let (kept, tier_reports) = apply_hard_filters(&pool, preferences, &partition, tier);
            reports.extend(tier_reports);
            filtered.insert(tier, kept);
        }

        let primary_size = filtered.get(&primary).map(Vec::len).unwrap_or(0);
        let plan = self.selector.plan(classification, primary, primary_size);

        Ok(Prepared {
            primary,
            partition,
            filtered,
            reports,
            total_candidates,
            degradation,
            plan,
        })
    }

    /// Fetch the primary tier and its neighbours concurrently. A primary
    /// failure fails the call; a neighbour failure is recorded and skipped.
    async fn fetch_pools(
        &self,
        primary: Tier,
        degradation: &mut DegradationReport,
    ) -> Result<BTreeMap<Tier, Arc<Vec<School>>>, FilterError> {
        let mut tasks = JoinSet::new();
        for tier in TierPlan::tiers_to_fetch(primary) {
            let repository = self.repository.clone();
            tasks.spawn(async move { (tier, repository.fetch_tier(tier).await) });
        }

        let mut pools = BTreeMap::new();
        let mut primary_error = None;
        while let Some(joined) = tasks.join_next().await {
            let (tier, result) = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(error = %e, "Tier fetch task aborted");
                    primary_error.get_or_insert_with(|| FilterError::unavailable(format!("fetch task failed: {}", e)));
                    continue;
                }
            };

            match result {
                Ok(pool) => {
                    pools.insert(tier, pool);
                }
                Err(e) if tier == primary => {
                    primary_error = Some(e);
                }
                Err(e) => {
                    tracing::warn!(tier = %tier, error = %e, "Overlap tier unavailable, continuing without it");
                    degradation.failed_tiers.push(FailedTier {
                        tier,
                        error: e.to_string(),
                    });
                }
            }
        }
        degradation.failed_tiers.sort_by_key(|failed| failed.tier);

        if !pools.contains_key(&primary) {
            return Err(primary_error
                .unwrap_or_else(|| FilterError::unavailable(format!("primary tier {} could not be fetched", primary))));
        }
        Ok(pools)
    }

    /// Score every pool in adaptive batches. Batches run on a shared,
    /// bounded worker set; a batch whose task fails is dropped and recorded.
    /// Output keeps tier-ladder and catalog order.
    async fn score_pools(
        &self,
        pools: Vec<(Tier, Vec<School>)>,
        preferences: &PreferenceSet,
        optional: &[PreferenceName],
        classification: &TierClassification,
        degradation: &mut DegradationReport,
    ) -> Vec<(Tier, Vec<ScoredSchool>)> {
        let mut jobs: Vec<ScoringJob> = Vec::new();
        for (tier, pool) in pools {
            let size = batch_size(pool.len(), self.config.workers);
            tracing::debug!(tier = %tier, schools = pool.len(), batch_size = size, "Scoring tier");
            let mut pool = pool.into_iter().peekable();
            while pool.peek().is_some() {
                jobs.push(ScoringJob {
                    tier,
                    schools: pool.by_ref().take(size).collect(),
                });
            }
        }

        let preferences = Arc::new(preferences.clone());
        let optional: Arc<[PreferenceName]> = optional.into();
        let classification = Arc::new(classification.clone());
        let batch_lengths: Vec<(Tier, usize)> = jobs.iter().map(|job| (job.tier, job.schools.len())).collect();

        let mut tasks = JoinSet::new();
        for (index, job) in jobs.into_iter().enumerate() {
            let workers = self.workers.clone();
            let scorer = self.scorer.clone();
            let fit_scorer = self.fit_scorer.clone();
            let preferences = preferences.clone();
            let optional = optional.clone();
            let classification = classification.clone();
            let yield_every = self.config.yield_every.max(1);

            tasks.spawn(async move {
                let _permit = workers.acquire_owned().await.ok();
                let mut scored = Vec::with_capacity(job.schools.len());
                for (i, school) in job.schools.into_iter().enumerate() {
                    let fit = fit_scorer
                        .as_ref()
                        .and_then(|fit| fit.fit_percentile(&school, &classification));
                    let mut result = scorer.score(school, &preferences, &optional);
                    result.fit_percentile = fit;
                    scored.push(result);

                    if (i + 1) % yield_every == 0 {
                        tokio::task::yield_now().await;
                    }
                }
                (index, scored)
            });
        }

        let mut batches: Vec<Option<Vec<ScoredSchool>>> = vec![None; batch_lengths.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, scored)) => batches[index] = Some(scored),
                Err(e) => tracing::warn!(error = %e, "Scoring batch failed"),
            }
        }

        let mut by_tier: Vec<(Tier, Vec<ScoredSchool>)> = Vec::new();
        for ((tier, len), batch) in batch_lengths.into_iter().zip(batches) {
            let Some(scored) = batch else {
                degradation.failed_batches += 1;
                degradation.dropped_schools += len;
                continue;
            };
            match by_tier.last_mut() {
                Some((last, schools)) if *last == tier => schools.extend(scored),
                _ => by_tier.push((tier, scored)),
            }
        }

        if degradation.failed_batches > 0 {
            tracing::warn!(
                failed_batches = degradation.failed_batches,
                dropped_schools = degradation.dropped_schools,
                "Returning partial results"
            );
        }
        by_tier
    }
}
