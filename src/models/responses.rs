use crate::models::domain::{School, Tier};
use crate::models::outcome::{DegradationReport, FilterReport, ScoredSchool, TierPlan};
use crate::models::preferences::PreferenceName;
use crate::services::guard::GuardStats;
use serde::Serialize;

/// Response for the match endpoint
#[derive(Debug, Clone, Serialize)]
pub struct MatchResponse {
    pub request_id: String,
    pub schools: Vec<ScoredSchool>,
    pub summary: MatchSummary,
    pub degradation: DegradationReport,
    pub filter_reports: Vec<FilterReport>,
    pub tier_plan: TierPlan,
    pub processing_time_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchSummary {
    pub total_schools_returned: usize,
    pub must_have_count: usize,
    pub total_schools_considered: usize,
    pub primary_tier: Tier,
    pub must_have_preferences: Vec<PreferenceName>,
    pub nice_to_have_preferences: Vec<PreferenceName>,
    pub degraded: bool,
}

/// Response for the count endpoint
#[derive(Debug, Clone, Serialize)]
pub struct CountResponse {
    pub request_id: String,
    pub count: usize,
    pub primary_tier: Tier,
    pub must_have_preferences: Vec<PreferenceName>,
    pub processing_time_ms: u64,
}

/// Response for the lookup endpoint
#[derive(Debug, Clone, Serialize)]
pub struct LookupResponse {
    pub schools: Vec<School>,
    pub missing: Vec<String>,
}

/// Health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub store_healthy: bool,
    pub guard: GuardStats,
}

/// Error response
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
