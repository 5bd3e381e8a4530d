// Model exports
pub mod classification;
pub mod domain;
pub mod outcome;
pub mod preferences;
pub mod requests;
pub mod responses;

pub use classification::{Confidence, D1Result, P4Result, TierClassification};
pub use domain::{grade_value, Grade, PartyScene, Region, School, SizeCategory, Tier};
pub use outcome::{
    DegradationReport, FailedTier, FilterReport, FilterStage, FilteringResult, MatchOutcome, PreferenceMatch,
    PreferenceMiss, ScoredSchool, TierPlan,
};
pub use preferences::{PreferenceCategory, PreferenceName, PreferenceSet, PreferenceSetBuilder};
pub use requests::{CountRequest, LookupRequest, MatchRequest, PreferencesPayload};
pub use responses::{CountResponse, ErrorResponse, HealthResponse, LookupResponse, MatchResponse, MatchSummary};
