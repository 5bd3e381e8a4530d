use crate::error::FilterError;
use crate::models::domain::{Grade, PartyScene, Region, SizeCategory};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Every preference an applicant can declare.
///
/// Declaration order is the order optional preferences are evaluated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreferenceName {
    #[serde(rename = "user_state", alias = "home_state")]
    HomeState,
    PreferredStates,
    PreferredRegions,
    MaxBudget,
    MinAcademicRating,
    MinStudentSatisfactionRating,
    AdmitRateFloor,
    Sat,
    Act,
    MinAthleticsRating,
    PreferredSchoolSize,
    PartyScenePreference,
}

impl PreferenceName {
    pub const ALL: [PreferenceName; 12] = [
        PreferenceName::HomeState,
        PreferenceName::PreferredStates,
        PreferenceName::PreferredRegions,
        PreferenceName::MaxBudget,
        PreferenceName::MinAcademicRating,
        PreferenceName::MinStudentSatisfactionRating,
        PreferenceName::AdmitRateFloor,
        PreferenceName::Sat,
        PreferenceName::Act,
        PreferenceName::MinAthleticsRating,
        PreferenceName::PreferredSchoolSize,
        PreferenceName::PartyScenePreference,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PreferenceName::HomeState => "user_state",
            PreferenceName::PreferredStates => "preferred_states",
            PreferenceName::PreferredRegions => "preferred_regions",
            PreferenceName::MaxBudget => "max_budget",
            PreferenceName::MinAcademicRating => "min_academic_rating",
            PreferenceName::MinStudentSatisfactionRating => "min_student_satisfaction_rating",
            PreferenceName::AdmitRateFloor => "admit_rate_floor",
            PreferenceName::Sat => "sat",
            PreferenceName::Act => "act",
            PreferenceName::MinAthleticsRating => "min_athletics_rating",
            PreferenceName::PreferredSchoolSize => "preferred_school_size",
            PreferenceName::PartyScenePreference => "party_scene_preference",
        }
    }

    /// Explanation category shown alongside matches and misses
    pub fn category(&self) -> PreferenceCategory {
        match self {
            PreferenceName::HomeState
            | PreferenceName::PreferredStates
            | PreferenceName::PreferredRegions => PreferenceCategory::Geographic,
            PreferenceName::MaxBudget => PreferenceCategory::Financial,
            PreferenceName::MinAcademicRating
            | PreferenceName::MinStudentSatisfactionRating
            | PreferenceName::AdmitRateFloor
            | PreferenceName::Sat
            | PreferenceName::Act => PreferenceCategory::AcademicFit,
            PreferenceName::MinAthleticsRating => PreferenceCategory::AthleticPreferences,
            PreferenceName::PreferredSchoolSize | PreferenceName::PartyScenePreference => {
                PreferenceCategory::SchoolCharacteristics
            }
        }
    }
}

impl fmt::Display for PreferenceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PreferenceName {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed == "home_state" {
            return Ok(PreferenceName::HomeState);
        }
        PreferenceName::ALL
            .iter()
            .copied()
            .find(|name| name.as_str() == trimmed)
            .ok_or_else(|| FilterError::invalid(format!("unknown preference '{}'", trimmed)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreferenceCategory {
    Geographic,
    Financial,
    AcademicFit,
    SchoolCharacteristics,
    AthleticPreferences,
}

/// An applicant's declared preferences plus the names flagged as must-haves.
///
/// Immutable once built: construct through [`PreferenceSet::builder`], which
/// validates ranges and guarantees every must-have names a set preference.
/// Share across tasks behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreferenceSet {
    home_state: String,
    preferred_states: Vec<String>,
    preferred_regions: Vec<Region>,
    max_budget: Option<u32>,
    min_academic_rating: Option<Grade>,
    min_student_satisfaction_rating: Option<Grade>,
    admit_rate_floor: Option<f64>,
    sat: Option<u16>,
    act: Option<u8>,
    min_athletics_rating: Option<Grade>,
    preferred_school_size: Vec<SizeCategory>,
    party_scene_preference: Vec<PartyScene>,
    must_haves: BTreeSet<PreferenceName>,
}

impl PreferenceSet {
    pub fn builder(home_state: impl Into<String>) -> PreferenceSetBuilder {
        PreferenceSetBuilder::new(home_state)
    }

    /// Start a new builder seeded with these values, for deriving a variant
    pub fn to_builder(&self) -> PreferenceSetBuilder {
        PreferenceSetBuilder { inner: self.clone() }
    }

    pub fn home_state(&self) -> &str {
        &self.home_state
    }

    pub fn preferred_states(&self) -> &[String] {
        &self.preferred_states
    }

    pub fn preferred_regions(&self) -> &[Region] {
        &self.preferred_regions
    }

    pub fn max_budget(&self) -> Option<u32> {
        self.max_budget
    }

    pub fn min_academic_rating(&self) -> Option<Grade> {
        self.min_academic_rating
    }

    pub fn min_student_satisfaction_rating(&self) -> Option<Grade> {
        self.min_student_satisfaction_rating
    }

    /// Percent, `0..=100`
    pub fn admit_rate_floor(&self) -> Option<f64> {
        self.admit_rate_floor
    }

    pub fn sat(&self) -> Option<u16> {
        self.sat
    }

    pub fn act(&self) -> Option<u8> {
        self.act
    }

    pub fn min_athletics_rating(&self) -> Option<Grade> {
        self.min_athletics_rating
    }

    pub fn preferred_school_size(&self) -> &[SizeCategory] {
        &self.preferred_school_size
    }

    pub fn party_scene_preference(&self) -> &[PartyScene] {
        &self.party_scene_preference
    }

    pub fn must_haves(&self) -> &BTreeSet<PreferenceName> {
        &self.must_haves
    }

    pub fn is_must_have(&self, name: PreferenceName) -> bool {
        self.must_haves.contains(&name)
    }

    /// Whether a value is present. Empty lists count as unset.
    pub fn is_set(&self, name: PreferenceName) -> bool {
        match name {
            PreferenceName::HomeState => true,
            PreferenceName::PreferredStates => !self.preferred_states.is_empty(),
            PreferenceName::PreferredRegions => !self.preferred_regions.is_empty(),
            PreferenceName::MaxBudget => self.max_budget.is_some(),
            PreferenceName::MinAcademicRating => self.min_academic_rating.is_some(),
            PreferenceName::MinStudentSatisfactionRating => self.min_student_satisfaction_rating.is_some(),
            PreferenceName::AdmitRateFloor => self.admit_rate_floor.is_some(),
            PreferenceName::Sat => self.sat.is_some(),
            PreferenceName::Act => self.act.is_some(),
            PreferenceName::MinAthleticsRating => self.min_athletics_rating.is_some(),
            PreferenceName::PreferredSchoolSize => !self.preferred_school_size.is_empty(),
            PreferenceName::PartyScenePreference => !self.party_scene_preference.is_empty(),
        }
    }

    /// Names of every preference with a value, in evaluation order
    pub fn declared(&self) -> impl Iterator<Item = PreferenceName> + '_ {
        PreferenceName::ALL.into_iter().filter(|name| self.is_set(*name))
    }
}

/// Builder for [`PreferenceSet`]; `build` is the only validation point.
#[derive(Debug, Clone)]
pub struct PreferenceSetBuilder {
    inner: PreferenceSet,
}

impl PreferenceSetBuilder {
    pub fn new(home_state: impl Into<String>) -> Self {
        Self {
            inner: PreferenceSet {
                home_state: home_state.into(),
                preferred_states: Vec::new(),
                preferred_regions: Vec::new(),
                max_budget: None,
                min_academic_rating: None,
                min_student_satisfaction_rating: None,
                admit_rate_floor: None,
                sat: None,
                act: None,
                min_athletics_rating: None,
                preferred_school_size: Vec::new(),
                party_scene_preference: Vec::new(),
                must_haves: BTreeSet::new(),
            },
        }
    }

    pub fn preferred_states<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.preferred_states = states.into_iter().map(Into::into).collect();
        self
    }

    pub fn preferred_regions(mut self, regions: impl IntoIterator<Item = Region>) -> Self {
        self.inner.preferred_regions = regions.into_iter().collect();
        self
    }

    pub fn max_budget(mut self, budget: u32) -> Self {
        self.inner.max_budget = Some(budget);
        self
    }

    pub fn min_academic_rating(mut self, grade: Grade) -> Self {
        self.inner.min_academic_rating = Some(grade);
        self
    }

    pub fn min_student_satisfaction_rating(mut self, grade: Grade) -> Self {
        self.inner.min_student_satisfaction_rating = Some(grade);
        self
    }

    pub fn admit_rate_floor(mut self, percent: f64) -> Self {
        self.inner.admit_rate_floor = Some(percent);
        self
    }

    pub fn sat(mut self, score: u16) -> Self {
        self.inner.sat = Some(score);
        self
    }

    pub fn act(mut self, score: u8) -> Self {
        self.inner.act = Some(score);
        self
    }

    pub fn min_athletics_rating(mut self, grade: Grade) -> Self {
        self.inner.min_athletics_rating = Some(grade);
        self
    }

    pub fn preferred_school_size(mut self, sizes: impl IntoIterator<Item = SizeCategory>) -> Self {
        self.inner.preferred_school_size = sizes.into_iter().collect();
        self
    }

    pub fn party_scene_preference(mut self, scenes: impl IntoIterator<Item = PartyScene>) -> Self {
        self.inner.party_scene_preference = scenes.into_iter().collect();
        self
    }

    pub fn must_have(mut self, name: PreferenceName) -> Self {
        self.inner.must_haves.insert(name);
        self
    }

    pub fn must_haves(mut self, names: impl IntoIterator<Item = PreferenceName>) -> Self {
        self.inner.must_haves.extend(names);
        self
    }

    pub fn build(self) -> Result<PreferenceSet, FilterError> {
        let mut prefs = self.inner;

        prefs.home_state = normalize_state(&prefs.home_state)
            .ok_or_else(|| FilterError::invalid(format!("user_state '{}' must be a 2-letter state code", prefs.home_state)))?;

        prefs.preferred_states = prefs
            .preferred_states
            .iter()
            .map(|s| normalize_state(s).ok_or_else(|| FilterError::invalid(format!("preferred state '{}' must be a 2-letter state code", s))))
            .collect::<Result<Vec<_>, _>>()?;
        let mut seen = BTreeSet::new();
        prefs.preferred_states.retain(|s| seen.insert(s.clone()));

        if let Some(sat) = prefs.sat {
            if !(400..=1600).contains(&sat) {
                return Err(FilterError::invalid(format!("sat {} must be between 400 and 1600", sat)));
            }
        }
        if let Some(act) = prefs.act {
            if !(1..=36).contains(&act) {
                return Err(FilterError::invalid(format!("act {} must be between 1 and 36", act)));
            }
        }
        if let Some(floor) = prefs.admit_rate_floor {
            if !floor.is_finite() || !(0.0..=100.0).contains(&floor) {
                return Err(FilterError::invalid(format!("admit_rate_floor {} must be a percentage", floor)));
            }
        }

        if prefs.must_haves.contains(&PreferenceName::HomeState) {
            return Err(FilterError::invalid("home_state is context for tuition and cannot be a must-have"));
        }
        if let Some(unset) = prefs.must_haves.iter().find(|name| !prefs.is_set(**name)) {
            return Err(FilterError::invalid(format!("must-have preference '{}' has no value", unset)));
        }

        Ok(prefs)
    }
}

fn normalize_state(raw: &str) -> Option<String> {
    let state = raw.trim();
    if state.len() == 2 && state.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(state.to_ascii_uppercase())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_normalizes_states() {
        let prefs = PreferenceSet::builder(" ca ")
            .preferred_states(["tx", "Ca"])
            .build()
            .unwrap();
        assert_eq!(prefs.home_state(), "CA");
        assert_eq!(prefs.preferred_states(), &["TX".to_string(), "CA".to_string()]);
    }

    #[test]
    fn test_home_state_required() {
        let err = PreferenceSet::builder("California").build().unwrap_err();
        assert!(matches!(err, FilterError::InvalidInput(_)));
        assert!(PreferenceSet::builder("").build().is_err());
    }

    #[test]
    fn test_must_have_requires_value() {
        let err = PreferenceSet::builder("CA")
            .must_have(PreferenceName::MaxBudget)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("max_budget"));

        let ok = PreferenceSet::builder("CA")
            .max_budget(30_000)
            .must_have(PreferenceName::MaxBudget)
            .build()
            .unwrap();
        assert!(ok.is_must_have(PreferenceName::MaxBudget));
    }

    #[test]
    fn test_home_state_cannot_be_must_have() {
        let err = PreferenceSet::builder("CA")
            .must_have(PreferenceName::HomeState)
            .build()
            .unwrap_err();
        assert!(matches!(err, FilterError::InvalidInput(_)));
        assert!(err.to_string().contains("home_state"));
    }

    #[test]
    fn test_empty_list_is_unset() {
        let err = PreferenceSet::builder("CA")
            .preferred_states(Vec::<String>::new())
            .must_have(PreferenceName::PreferredStates)
            .build();
        assert!(err.is_err());
    }

    #[test]
    fn test_score_ranges() {
        assert!(PreferenceSet::builder("CA").sat(1700).build().is_err());
        assert!(PreferenceSet::builder("CA").act(0).build().is_err());
        assert!(PreferenceSet::builder("CA").admit_rate_floor(120.0).build().is_err());
        assert!(PreferenceSet::builder("CA").sat(1350).act(30).admit_rate_floor(20.0).build().is_ok());
    }

    #[test]
    fn test_declared_skips_unset() {
        let prefs = PreferenceSet::builder("CA").sat(1300).build().unwrap();
        let declared: Vec<_> = prefs.declared().collect();
        assert_eq!(declared, vec![PreferenceName::HomeState, PreferenceName::Sat]);
    }

    #[test]
    fn test_preference_name_parsing() {
        assert_eq!("max_budget".parse::<PreferenceName>().unwrap(), PreferenceName::MaxBudget);
        assert_eq!("home_state".parse::<PreferenceName>().unwrap(), PreferenceName::HomeState);
        assert!("intended_major".parse::<PreferenceName>().is_err());
    }
}
