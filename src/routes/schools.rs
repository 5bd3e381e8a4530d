use crate::core::{classify, resort, MatchPipeline};
use crate::error::FilterError;
use crate::models::{
    CountRequest, CountResponse, ErrorResponse, HealthResponse, LookupRequest, LookupResponse, MatchRequest,
    MatchResponse, MatchSummary, PreferenceSet,
};
use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;
use std::time::Instant;
use validator::Validate;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<MatchPipeline>,
}

/// Configure all school-matching routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/schools/count", web::post().to(count_schools))
        .route("/schools/match", web::post().to(match_schools))
        .route("/schools/lookup", web::post().to(lookup_schools));
}

fn validation_failed(errors: validator::ValidationErrors) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: "Validation failed".to_string(),
        message: errors.to_string(),
        status_code: 400,
    })
}

fn filter_error_response(err: &FilterError) -> HttpResponse {
    let body = |status_code| ErrorResponse {
        error: err.code().to_string(),
        message: err.to_string(),
        status_code,
    };
    match err {
        FilterError::InvalidInput(_) => HttpResponse::BadRequest().json(body(400)),
        FilterError::StoreUnavailable(_) => HttpResponse::ServiceUnavailable().json(body(503)),
    }
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let repository = state.pipeline.repository();
    let store_healthy = repository.health().await;

    let status = if store_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
        store_healthy,
        guard: repository.guard().stats(),
    })
}

/// Must-have count endpoint
///
/// POST /api/v1/schools/count
async fn count_schools(state: web::Data<AppState>, req: web::Json<CountRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for count request: field_errors={:?}", errors);
        return validation_failed(errors);
    }

    let started = Instant::now();
    let request_id = uuid::Uuid::new_v4().to_string();

    let preferences = match PreferenceSet::try_from(&req.user_preferences) {
        Ok(prefs) => prefs,
        Err(e) => return filter_error_response(&e),
    };

    tracing::info!(request_id = %request_id, home_state = preferences.home_state(), "Counting must-have matches");

    match state.pipeline.count(&preferences, &req.ml_results).await {
        Ok(count) => HttpResponse::Ok().json(CountResponse {
            request_id,
            count,
            primary_tier: req.ml_results.primary_tier(),
            must_have_preferences: preferences.must_haves().iter().copied().collect(),
            processing_time_ms: started.elapsed().as_millis() as u64,
        }),
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Count failed");
            filter_error_response(&e)
        }
    }
}

/// Full match endpoint
///
/// POST /api/v1/schools/match
///
/// Request body:
/// ```json
/// {
///   "user_preferences": {"user_state": "CA", "max_budget": 35000, "must_have_preferences": ["max_budget"]},
///   "ml_results": {"d1_results": {"d1_probability": 0.75, "d1_prediction": true}},
///   "limit": 25
/// }
/// ```
async fn match_schools(state: web::Data<AppState>, req: web::Json<MatchRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for match request: field_errors={:?}", errors);
        return validation_failed(errors);
    }

    let started = Instant::now();
    let request_id = uuid::Uuid::new_v4().to_string();
    let config = state.pipeline.config();
    // An explicit 0 is passed through and rejected by the pipeline
    let limit = req.limit.unwrap_or(config.default_limit).min(config.max_limit);

    let preferences = match PreferenceSet::try_from(&req.user_preferences) {
        Ok(prefs) => prefs,
        Err(e) => return filter_error_response(&e),
    };

    tracing::info!(request_id = %request_id, home_state = preferences.home_state(), limit, "Finding school matches");

    let mut result = match state.pipeline.find_matches(&preferences, &req.ml_results, limit).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Match failed");
            return filter_error_response(&e);
        }
    };

    if let Some(key) = req.sort_by {
        resort(&mut result.schools, key, req.sort_order);
    }

    let partition = classify(&preferences);
    let summary = MatchSummary {
        total_schools_returned: result.schools.len(),
        must_have_count: result.must_have_count,
        total_schools_considered: result.total_candidates,
        primary_tier: result.plan.primary,
        must_have_preferences: partition.mandatory.iter().copied().collect(),
        nice_to_have_preferences: partition.optional.clone(),
        degraded: result.degraded,
    };

    if result.degraded {
        tracing::warn!(request_id = %request_id, degradation = ?result.degradation, "Serving degraded match result");
    }

    HttpResponse::Ok().json(MatchResponse {
        request_id,
        schools: result.schools,
        summary,
        degradation: result.degradation,
        filter_reports: result.filter_reports,
        tier_plan: result.plan,
        processing_time_ms: started.elapsed().as_millis() as u64,
    })
}

/// Lookup schools by exact name
///
/// POST /api/v1/schools/lookup
async fn lookup_schools(state: web::Data<AppState>, req: web::Json<LookupRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_failed(errors);
    }

    match state.pipeline.repository().fetch_by_names(&req.school_names).await {
        Ok(schools) => {
            let missing = req
                .school_names
                .iter()
                .filter(|name| !schools.iter().any(|s| &s.school_name == *name))
                .cloned()
                .collect();
            HttpResponse::Ok().json(LookupResponse { schools, missing })
        }
        Err(e) => filter_error_response(&e),
    }
}
