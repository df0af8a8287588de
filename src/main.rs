use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use studybuddy_match::config::{CacheSettings, LoggingSettings, Settings};
use studybuddy_match::routes::{self, matches::AppState};
use studybuddy_match::services::{CacheManager, MatchService, PostgresStore};
use studybuddy_match::{Matcher, ScoringWeights};

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
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST)).json(self)
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

/// Handle path parameter errors
pub fn handle_path_error(err: error::PathError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_path".to_string(),
        message: format!("Invalid path: {}", err),
        status_code: 400,
    }
    .into()
}

/// `RUST_LOG` wins over the configured level
fn init_tracing(logging: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if logging.format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

/// Build the candidate-pool cache, or `None` when caching is off
async fn build_pool_cache(settings: &CacheSettings) -> Option<Arc<CacheManager>> {
    if !settings.enabled {
        return None;
    }

    let ttl = settings.ttl_secs.unwrap_or(30);
    let l1_size = settings.l1_cache_size.unwrap_or(16);

    let cache = match &settings.redis_url {
        Some(url) => match CacheManager::new(url, l1_size, ttl).await {
            Ok(cache) => cache,
            Err(e) => {
                warn!("Failed to connect to Redis ({}), caching in-process only", e);
                CacheManager::local_only(l1_size, ttl)
            }
        },
        None => CacheManager::local_only(l1_size, ttl),
    };

    info!("Candidate pool cache enabled (L1: {} entries, TTL: {}s)", l1_size, ttl);
    Some(Arc::new(cache))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e)
    })?;

    init_tracing(&settings.logging);

    info!("Starting StudyBuddy matching service...");

    let store = PostgresStore::from_settings(
        &settings.database.url,
        settings.database.max_connections,
        settings.database.min_connections,
        settings.database.acquire_timeout_secs,
        settings.database.idle_timeout_secs,
    )
    .await
    .map_err(|e| {
        error!("Failed to connect to PostgreSQL: {}", e);
        std::io::Error::new(std::io::ErrorKind::ConnectionRefused, e)
    })?;

    info!("PostgreSQL store initialized, migrations applied");

    let weights = ScoringWeights::from(&settings.scoring.weights);
    let matcher = Matcher::new(weights);
    info!("Matcher initialized with weights: {:?}", weights);

    let quota = settings.quota.policy();
    info!(
        "Swipe quota: {} free / {} premium per day",
        quota.free_daily_limit, quota.premium_daily_limit
    );

    let mut service = MatchService::new(Arc::new(store), matcher, quota);
    if let Some(cache) = build_pool_cache(&settings.cache).await {
        service = service.with_pool_cache(cache);
    }

    let app_state = AppState {
        service: Arc::new(service),
        default_limit: settings.matching.default_limit,
        max_limit: settings.matching.max_limit,
    };

    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::PathConfig::default().error_handler(handle_path_error))
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
