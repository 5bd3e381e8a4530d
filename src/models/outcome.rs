use crate::models::domain::{School, Tier};
use crate::models::preferences::{PreferenceCategory, PreferenceName};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// An optional preference the school satisfies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceMatch {
    pub preference: PreferenceName,
    pub category: PreferenceCategory,
    pub user_value: Value,
    pub school_value: Value,
    pub description: String,
}

/// An optional preference the school fails, with the reason
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceMiss {
    pub preference: PreferenceName,
    pub category: PreferenceCategory,
    pub user_value: Value,
    pub school_value: Value,
    pub reason: String,
}

/// Result of comparing one school against one optional preference
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    Match(PreferenceMatch),
    Miss(PreferenceMiss),
}

impl MatchOutcome {
    pub fn matched(
        preference: PreferenceName,
        user_value: impl Into<Value>,
        school_value: impl Into<Value>,
        description: impl Into<String>,
    ) -> Self {
        MatchOutcome::Match(PreferenceMatch {
            preference,
            category: preference.category(),
            user_value: user_value.into(),
            school_value: school_value.into(),
            description: description.into(),
        })
    }

    pub fn missed(
        preference: PreferenceName,
        user_value: impl Into<Value>,
        school_value: impl Into<Value>,
        reason: impl Into<String>,
    ) -> Self {
        MatchOutcome::Miss(PreferenceMiss {
            preference,
            category: preference.category(),
            user_value: user_value.into(),
            school_value: school_value.into(),
            reason: reason.into(),
        })
    }

    pub fn preference(&self) -> PreferenceName {
        match self {
            MatchOutcome::Match(m) => m.preference,
            MatchOutcome::Miss(m) => m.preference,
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, MatchOutcome::Match(_))
    }
}

/// A school plus its match explanations and ranking inputs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredSchool {
    pub school: School,
    pub matches: Vec<PreferenceMatch>,
    pub misses: Vec<PreferenceMiss>,
    /// 3 for the primary tier, 2 or 1 for an overlap tier, 0 otherwise
    pub tier_alignment: u8,
    /// Externally computed suitability percentile, when available
    pub fit_percentile: Option<f64>,
}

impl ScoredSchool {
    pub fn new(school: School) -> Self {
        Self {
            school,
            matches: Vec::new(),
            misses: Vec::new(),
            tier_alignment: 0,
            fit_percentile: None,
        }
    }

    pub fn record(&mut self, outcome: MatchOutcome) {
        match outcome {
            MatchOutcome::Match(m) => self.matches.push(m),
            MatchOutcome::Miss(m) => self.misses.push(m),
        }
    }

    pub fn match_count(&self) -> usize {
        self.matches.len()
    }

    pub fn name(&self) -> &str {
        &self.school.school_name
    }

    pub fn tier(&self) -> Tier {
        self.school.tier
    }
}

/// The five hard-filter stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterStage {
    Geographic,
    Financial,
    Academic,
    Athletic,
    Demographic,
}

impl FilterStage {
    pub const ORDER: [FilterStage; 5] = [
        FilterStage::Geographic,
        FilterStage::Financial,
        FilterStage::Academic,
        FilterStage::Athletic,
        FilterStage::Demographic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterStage::Geographic => "geographic",
            FilterStage::Financial => "financial",
            FilterStage::Academic => "academic",
            FilterStage::Athletic => "athletic",
            FilterStage::Demographic => "demographic",
        }
    }

    /// Preferences this stage enforces when they are must-haves
    pub fn preferences(&self) -> &'static [PreferenceName] {
        match self {
            FilterStage::Geographic => &[PreferenceName::PreferredStates, PreferenceName::PreferredRegions],
            FilterStage::Financial => &[PreferenceName::MaxBudget],
            FilterStage::Academic => &[
                PreferenceName::MinAcademicRating,
                PreferenceName::MinStudentSatisfactionRating,
                PreferenceName::AdmitRateFloor,
                PreferenceName::Sat,
                PreferenceName::Act,
            ],
            FilterStage::Athletic => &[PreferenceName::MinAthleticsRating],
            FilterStage::Demographic => &[
                PreferenceName::PreferredSchoolSize,
                PreferenceName::PartyScenePreference,
            ],
        }
    }
}

/// What one filter stage did to one tier's candidate list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterReport {
    pub stage: FilterStage,
    pub tier: Tier,
    pub applied: bool,
    pub removed: usize,
    pub remaining: usize,
    pub skip_reason: Option<String>,
}

/// Per-tier fetch limits chosen from the classifier probabilities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierPlan {
    pub primary: Tier,
    pub limits: BTreeMap<Tier, usize>,
}

impl TierPlan {
    pub fn empty(primary: Tier) -> Self {
        Self {
            primary,
            limits: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.limits.is_empty()
    }

    /// The primary tier followed by its neighbours
    pub fn tiers_to_fetch(primary: Tier) -> Vec<Tier> {
        std::iter::once(primary).chain(primary.neighbours().iter().copied()).collect()
    }

    pub fn limit(&self, tier: Tier) -> Option<usize> {
        self.limits.get(&tier).copied()
    }

    /// Overlap tiers only, ladder order
    pub fn overlap_tiers(&self) -> impl Iterator<Item = (Tier, usize)> + '_ {
        self.limits
            .iter()
            .filter(move |(tier, _)| **tier != self.primary)
            .map(|(tier, limit)| (*tier, *limit))
    }

    /// Number of schools the plan admits given each tier's filtered pool size
    pub fn selected_count(&self, pool_sizes: &BTreeMap<Tier, usize>) -> usize {
        self.limits
            .iter()
            .map(|(tier, limit)| pool_sizes.get(tier).copied().unwrap_or(0).min(*limit))
            .sum()
    }
}

/// Work the pipeline had to drop while still producing a result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DegradationReport {
    pub failed_tiers: Vec<FailedTier>,
    pub failed_batches: usize,
    pub dropped_schools: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedTier {
    pub tier: Tier,
    pub error: String,
}

impl DegradationReport {
    pub fn is_degraded(&self) -> bool {
        !self.failed_tiers.is_empty() || self.failed_batches > 0
    }
}

/// Final product of a match call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilteringResult {
    pub schools: Vec<ScoredSchool>,
    /// Schools that passed every must-have and were selected by the tier plan
    pub must_have_count: usize,
    /// Raw size of every tier pool fetched, before filtering
    pub total_candidates: usize,
    pub degraded: bool,
    pub degradation: DegradationReport,
    pub filter_reports: Vec<FilterReport>,
    pub plan: TierPlan,
}

impl FilteringResult {
    pub fn empty(primary: Tier, total_candidates: usize) -> Self {
        Self {
            schools: Vec::new(),
            must_have_count: 0,
            total_candidates,
            degraded: false,
            degradation: DegradationReport::default(),
            filter_reports: Vec::new(),
            plan: TierPlan::empty(primary),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_splits_matches_and_misses() {
        let mut scored = ScoredSchool::new(School::new("Test U", Tier::NonD1));
        scored.record(MatchOutcome::matched(PreferenceName::Sat, 1300, 1320, "SAT close"));
        scored.record(MatchOutcome::missed(PreferenceName::Act, 20, 30, "ACT far"));

        assert_eq!(scored.match_count(), 1);
        assert_eq!(scored.misses.len(), 1);
        assert_eq!(scored.matches[0].category, PreferenceCategory::AcademicFit);
    }

    #[test]
    fn test_plan_selected_count_caps_by_pool() {
        let mut plan = TierPlan::empty(Tier::NonP4D1);
        plan.limits.insert(Tier::NonP4D1, 40);
        plan.limits.insert(Tier::Power4D1, 10);
        plan.limits.insert(Tier::NonD1, 3);

        let pools = BTreeMap::from([(Tier::NonP4D1, 40), (Tier::Power4D1, 4), (Tier::NonD1, 25)]);
        assert_eq!(plan.selected_count(&pools), 40 + 4 + 3);
        assert_eq!(plan.overlap_tiers().count(), 2);
    }

    #[test]
    fn test_tiers_to_fetch_starts_with_primary() {
        assert_eq!(
            TierPlan::tiers_to_fetch(Tier::NonP4D1),
            vec![Tier::NonP4D1, Tier::Power4D1, Tier::NonD1]
        );
        assert_eq!(TierPlan::tiers_to_fetch(Tier::NonD1), vec![Tier::NonD1, Tier::NonP4D1]);
    }
}
