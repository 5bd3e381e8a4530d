//! Recruit Match - two-tier school filtering and matching for athlete recruiting
//!
//! Given an applicant's college preferences and a pre-computed athletic tier
//! classification, this library hard-filters a school catalog on the
//! must-have preferences, samples neighbouring tiers, and ranks the result
//! with per-preference match explanations.

pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{MatchPipeline, MatchScorer, PipelineConfig};
pub use error::{FilterError, StoreError};
pub use models::{FilteringResult, PreferenceName, PreferenceSet, School, ScoredSchool, Tier, TierClassification};
pub use services::{InMemoryStore, ResourceGuard, SchoolRepository, SchoolStore};
