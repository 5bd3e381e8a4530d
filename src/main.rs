use actix_cors::Cors;
use actix_web::{web, App, HttpServer, HttpResponse, middleware, error, http::StatusCode};
use recruit_match::config::{Settings, StoreKind};
use recruit_match::core::{MatchPipeline, PipelineConfig};
use recruit_match::routes::{self, schools::AppState};
use recruit_match::services::{GuardConfig, InMemoryStore, ResourceGuard, RestSchoolStore, SchoolRepository, SchoolStore, TierCache};
use std::sync::Arc;
use tracing::{info, error};
use tracing_subscriber::EnvFilter;

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

fn init_logging(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

fn build_store(settings: &Settings) -> std::io::Result<Arc<dyn SchoolStore>> {
    let store: Arc<dyn SchoolStore> = match settings.store.kind {
        StoreKind::File => Arc::new(
            InMemoryStore::from_json_file(&settings.store.catalog_path)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?,
        ),
        StoreKind::Rest => Arc::new(
            RestSchoolStore::from_settings(&settings.store)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?,
        ),
    };
    Ok(store)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
        }
    };

    init_logging(&settings.logging.level, &settings.logging.format);
    info!("Starting Recruit Match service...");

    let store = build_store(&settings).map_err(|e| {
        error!("Failed to initialize school store: {}", e);
        e
    })?;
    info!("School store initialized ({})", store.kind());

    let guard_config = GuardConfig::from_settings(&settings.guard);
    let guard = Arc::new(ResourceGuard::new(guard_config));
    info!(
        "Resource guard initialized (max concurrent: {}, failure threshold: {})",
        guard_config.max_concurrent, guard_config.circuit_breaker.failure_threshold
    );

    let cache = TierCache::new(settings.cache.max_entries, settings.cache.ttl_secs);
    if cache.is_enabled() {
        info!("Tier cache enabled (ttl: {}s)", settings.cache.ttl_secs);
    } else {
        info!("Tier cache disabled");
    }
    let repository = Arc::new(SchoolRepository::new(store, guard, cache));

    let pipeline_config = PipelineConfig::from_settings(&settings.pipeline);
    info!("Match pipeline initialized: {:?}", pipeline_config);
    let pipeline = Arc::new(MatchPipeline::new(repository, pipeline_config));

    let app_state = AppState { pipeline };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
