use crate::models::{ScoredSchool, Tier, TierClassification, TierPlan};
use std::cmp::Reverse;

/// Default floor on overlap-tier limits so boundary cases are never starved
pub const DEFAULT_MIN_OVERLAP: usize = 3;

/// Decides which tiers to sample and how many schools each contributes.
///
/// The primary tier is sampled in full. Each neighbouring tier contributes
/// `max(min_overlap, floor(primary_pool_size * f))`, where `f` is the
/// probability mass pointing toward that neighbour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierSelector {
    min_overlap: usize,
}

impl TierSelector {
    pub fn new(min_overlap: usize) -> Self {
        Self { min_overlap }
    }

    pub fn min_overlap(&self) -> usize {
        self.min_overlap
    }

    /// Multiplier for borrowing from `overlap` when `primary` is the top prediction
    pub fn overlap_fraction(classification: &TierClassification, primary: Tier, overlap: Tier) -> f64 {
        let d1 = classification.d1_probability();
        let p4 = classification.p4_probability();

        let fraction = match (primary, overlap) {
            (Tier::Power4D1, Tier::NonP4D1) => 1.0 - p4,
            (Tier::NonP4D1, Tier::Power4D1) => p4,
            (Tier::NonP4D1, Tier::NonD1) => 1.0 - d1,
            (Tier::NonD1, Tier::NonP4D1) => d1,
            _ => 0.0,
        };
        fraction.clamp(0.0, 1.0)
    }

    /// Build the fetch plan from the size of the (filtered) primary pool.
    /// An empty primary pool yields an empty plan: no results, not an error.
    pub fn plan(&self, classification: &TierClassification, primary: Tier, primary_pool_size: usize) -> TierPlan {
        let mut plan = TierPlan::empty(primary);
        if primary_pool_size == 0 {
            tracing::debug!(tier = %primary, "Primary pool empty, nothing to plan");
            return plan;
        }

        plan.limits.insert(primary, primary_pool_size);
        for &overlap in primary.neighbours() {
            let fraction = Self::overlap_fraction(classification, primary, overlap);
            let scaled = (primary_pool_size as f64 * fraction).floor() as usize;
            plan.limits.insert(overlap, scaled.max(self.min_overlap));
        }

        tracing::debug!(primary = %primary, limits = ?plan.limits, "Tier plan computed");
        plan
    }
}

impl Default for TierSelector {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_OVERLAP)
    }
}

/// Keep the best `limit` schools of an overlap tier, preferring more optional
/// matches and then a better overall grade. Stable for equal keys.
pub fn select_overlap(mut pool: Vec<ScoredSchool>, limit: usize) -> Vec<ScoredSchool> {
    if pool.len() > limit {
        pool.sort_by_key(|s| (Reverse(s.match_count()), Reverse(s.school.quality())));
        pool.truncate(limit);
    }
    pool
}
