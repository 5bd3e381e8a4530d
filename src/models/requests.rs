use crate::core::ranker::{SortKey, SortOrder};
use crate::error::FilterError;
use crate::models::classification::TierClassification;
use crate::models::domain::{Grade, PartyScene, Region, SizeCategory};
use crate::models::preferences::{PreferenceName, PreferenceSet};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Applicant preferences as posted by the client
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PreferencesPayload {
    #[validate(length(equal = 2))]
    #[serde(alias = "home_state")]
    pub user_state: String,
    #[serde(default)]
    pub preferred_states: Vec<String>,
    #[serde(default)]
    pub preferred_regions: Vec<Region>,
    #[serde(default)]
    pub preferred_school_size: Vec<SizeCategory>,
    #[serde(default)]
    pub max_budget: Option<u32>,
    #[serde(default)]
    pub min_academic_rating: Option<Grade>,
    #[serde(default)]
    pub min_athletics_rating: Option<Grade>,
    #[serde(default)]
    pub min_student_satisfaction_rating: Option<Grade>,
    #[serde(default)]
    pub party_scene_preference: Vec<PartyScene>,
    #[validate(range(min = 400, max = 1600))]
    #[serde(default)]
    pub sat: Option<u16>,
    #[validate(range(min = 1, max = 36))]
    #[serde(default)]
    pub act: Option<u8>,
    #[validate(range(min = 0.0, max = 100.0))]
    #[serde(default)]
    pub admit_rate_floor: Option<f64>,
    #[serde(default)]
    pub must_have_preferences: Vec<String>,
}

impl TryFrom<&PreferencesPayload> for PreferenceSet {
    type Error = FilterError;

    fn try_from(payload: &PreferencesPayload) -> Result<Self, Self::Error> {
        let must_haves = payload
            .must_have_preferences
            .iter()
            .map(|name| name.parse::<PreferenceName>())
            .collect::<Result<Vec<_>, _>>()?;

        let mut builder = PreferenceSet::builder(payload.user_state.clone())
            .preferred_states(payload.preferred_states.iter().cloned())
            .preferred_regions(payload.preferred_regions.iter().copied())
            .preferred_school_size(payload.preferred_school_size.iter().copied())
            .party_scene_preference(payload.party_scene_preference.iter().copied())
            .must_haves(must_haves);

        if let Some(budget) = payload.max_budget {
            builder = builder.max_budget(budget);
        }
        if let Some(grade) = payload.min_academic_rating {
            builder = builder.min_academic_rating(grade);
        }
        if let Some(grade) = payload.min_athletics_rating {
            builder = builder.min_athletics_rating(grade);
        }
        if let Some(grade) = payload.min_student_satisfaction_rating {
            builder = builder.min_student_satisfaction_rating(grade);
        }
        if let Some(sat) = payload.sat {
            builder = builder.sat(sat);
        }
        if let Some(act) = payload.act {
            builder = builder.act(act);
        }
        if let Some(floor) = payload.admit_rate_floor {
            builder = builder.admit_rate_floor(floor);
        }

        builder.build()
    }
}

/// Request for the fast must-have count
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CountRequest {
    #[validate(nested)]
    pub user_preferences: PreferencesPayload,
    pub ml_results: TierClassification,
}

/// Request for the full scored match
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MatchRequest {
    #[validate(nested)]
    pub user_preferences: PreferencesPayload,
    pub ml_results: TierClassification,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub sort_by: Option<SortKey>,
    #[serde(default)]
    pub sort_order: SortOrder,
}

/// Request to fetch specific schools by name
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LookupRequest {
    #[validate(length(min = 1, max = 200))]
    pub school_names: Vec<String>,
}
