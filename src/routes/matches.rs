use actix_web::{http::StatusCode, web, HttpResponse, Responder};
use std::sync::Arc;
use validator::Validate;

use crate::core::MatchError;
use crate::models::{
    AckResponse, BlockRequest, ErrorResponse, FindCandidatesRequest, FindCandidatesResponse, HealthResponse,
    InteractionRequest, MatchesResponse, SwipeCountRequest, SwipeCountResponse, SwipeDecisionRequest,
    SwipeDecisionResponse,
};
use crate::services::MatchService;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<MatchService>,
    pub default_limit: u16,
    pub max_limit: u16,
}

/// Configure all match-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/matches/candidates", web::post().to(find_candidates))
        .route("/matches/{user_id}", web::get().to(list_matches))
        .route("/likes", web::post().to(record_like))
        .route("/declines", web::post().to(record_decline))
        .route("/blocks", web::post().to(record_block))
        .route("/swipes", web::post().to(update_swipe_count))
        .route("/swipes/decide", web::post().to(swipe))
        .route("/swipes/{user_id}", web::get().to(swipe_status));
}

/// Map an operation failure to its HTTP response
fn error_response(err: &MatchError) -> HttpResponse {
    let (status, error) = match err {
        MatchError::NotFound(_) => (StatusCode::NOT_FOUND, "Not found"),
        MatchError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "Invalid input"),
        MatchError::LimitExceeded { .. } => (StatusCode::TOO_MANY_REQUESTS, "Swipe limit reached"),
        MatchError::TransientStore(_) => (StatusCode::SERVICE_UNAVAILABLE, "Store unavailable, try again"),
    };

    HttpResponse::build(status).json(ErrorResponse {
        error: error.to_string(),
        message: err.to_string(),
        status_code: status.as_u16(),
    })
}

fn validation_error(errors: validator::ValidationErrors) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: "Validation failed".to_string(),
        message: errors.to_string(),
        status_code: 400,
    })
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let store_healthy = state.service.health_check().await;

    let status = if store_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Rank candidates endpoint
///
/// POST /api/v1/matches/candidates
///
/// Request body:
/// ```json
/// { "userId": "string", "limit": 20 }
/// ```
async fn find_candidates(
    state: web::Data<AppState>,
    req: web::Json<FindCandidatesRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    let limit = req.limit.unwrap_or(state.default_limit).min(state.max_limit) as usize;

    tracing::info!("Finding candidates for user: {}, limit: {}", req.user_id, limit);

    match state.service.get_potential_matches(&req.user_id, limit).await {
        Ok(candidates) => HttpResponse::Ok().json(FindCandidatesResponse {
            total_results: candidates.len(),
            candidates,
        }),
        Err(e) => {
            tracing::error!("Failed to rank candidates for {}: {}", req.user_id, e);
            error_response(&e)
        }
    }
}

/// GET /api/v1/matches/{user_id}
async fn list_matches(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let user_id = path.into_inner();

    match state.service.list_matches(&user_id).await {
        Ok(matches) => HttpResponse::Ok().json(MatchesResponse {
            count: matches.len(),
            user_id,
            matches,
        }),
        Err(e) => error_response(&e),
    }
}

/// Record like endpoint
///
/// POST /api/v1/likes
///
/// Request body:
/// ```json
/// { "fromUserId": "string", "toUserId": "string" }
/// ```
///
/// Responds with `{ "isMatch": bool, "matchId": "string"? }`.
async fn record_like(state: web::Data<AppState>, req: web::Json<InteractionRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    match state.service.record_like(&req.from_user_id, &req.to_user_id).await {
        Ok(outcome) => HttpResponse::Ok().json(outcome),
        Err(e) => error_response(&e),
    }
}

/// POST /api/v1/declines
async fn record_decline(state: web::Data<AppState>, req: web::Json<InteractionRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    match state.service.record_decline(&req.from_user_id, &req.to_user_id).await {
        Ok(()) => HttpResponse::Ok().json(AckResponse { success: true }),
        Err(e) => {
            tracing::error!("Failed to record decline {} -> {}: {}", req.from_user_id, req.to_user_id, e);
            error_response(&e)
        }
    }
}

/// POST /api/v1/blocks
async fn record_block(state: web::Data<AppState>, req: web::Json<BlockRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    match state.service.record_block(&req.blocker_id, &req.blocked_id).await {
        Ok(()) => HttpResponse::Ok().json(AckResponse { success: true }),
        Err(e) => error_response(&e),
    }
}

/// POST /api/v1/swipes
async fn update_swipe_count(state: web::Data<AppState>, req: web::Json<SwipeCountRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    match state.service.update_swipe_count(&req.user_id).await {
        Ok(tally) => HttpResponse::Ok().json(SwipeCountResponse {
            count: tally.count,
            limit: tally.limit,
            remaining: tally.remaining(),
        }),
        Err(e) => error_response(&e),
    }
}

/// Quota-checked swipe endpoint
///
/// POST /api/v1/swipes/decide
///
/// Request body:
/// ```json
/// { "fromUserId": "string", "toUserId": "string", "action": "like|decline" }
/// ```
async fn swipe(state: web::Data<AppState>, req: web::Json<SwipeDecisionRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    match state.service.swipe(&req.from_user_id, &req.to_user_id, req.action).await {
        Ok(outcome) => HttpResponse::Ok().json(SwipeDecisionResponse {
            swipes: SwipeCountResponse {
                count: outcome.tally.count,
                limit: outcome.tally.limit,
                remaining: outcome.tally.remaining(),
            },
            like: outcome.like,
        }),
        Err(e) => error_response(&e),
    }
}

/// GET /api/v1/swipes/{user_id}
async fn swipe_status(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let user_id = path.into_inner();

    match state.service.swipe_status(&user_id).await {
        Ok(status) => HttpResponse::Ok().json(SwipeCountResponse {
            count: status.used,
            limit: status.limit,
            remaining: status.remaining,
        }),
        Err(e) => error_response(&e),
    }
}
