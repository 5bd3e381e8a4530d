use crate::core::comparators::{default_comparators, Comparator};
use crate::models::{MatchOutcome, PreferenceName, PreferenceSet, School, ScoredSchool, TierClassification};
use std::collections::BTreeMap;

/// Optional external suitability model, e.g. a playing-time estimator.
/// Returning `None` leaves the school's percentile unset.
pub trait FitScorer: Send + Sync {
    fn fit_percentile(&self, school: &School, classification: &TierClassification) -> Option<f64>;
}

/// Comparator registry keyed by preference name.
///
/// A preference with no registered comparator is silently skipped, so new
/// preference kinds can be added without touching the scoring loop.
pub struct MatchScorer {
    comparators: BTreeMap<PreferenceName, Box<dyn Comparator>>,
}

impl MatchScorer {
    /// Empty registry
    pub fn new() -> Self {
        Self {
            comparators: BTreeMap::new(),
        }
    }

    /// Registry with a comparator for every scoreable preference
    pub fn with_defaults() -> Self {
        default_comparators()
            .into_iter()
            .fold(Self::new(), |scorer, comparator| scorer.register(comparator))
    }

    /// Add or replace the comparator for its preference
    pub fn register(mut self, comparator: Box<dyn Comparator>) -> Self {
        self.comparators.insert(comparator.preference(), comparator);
        self
    }

    pub fn supports(&self, name: PreferenceName) -> bool {
        self.comparators.contains_key(&name)
    }

    /// Outcomes for every optional preference, in the given order
    pub fn outcomes(&self, school: &School, preferences: &PreferenceSet, optional: &[PreferenceName]) -> Vec<MatchOutcome> {
        optional
            .iter()
            .filter_map(|name| self.comparators.get(name))
            .filter_map(|comparator| comparator.compare(preferences, school))
            .collect()
    }

    pub fn score(&self, school: School, preferences: &PreferenceSet, optional: &[PreferenceName]) -> ScoredSchool {
        let outcomes = self.outcomes(&school, preferences, optional);
        let mut scored = ScoredSchool::new(school);
        for outcome in outcomes {
            scored.record(outcome);
        }
        scored
    }
}

impl Default for MatchScorer {
    fn default() -> Self {
        Self::with_defaults()
    }
}
