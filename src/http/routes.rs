//! HTTP route definitions

use std::path::PathBuf;

use axum::{
    extract::{Extension, Path, State},
    http::{header, Method, StatusCode},
    middleware,
    response::{IntoResponse, Json},
    routing::{delete, get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::app::AppState;
use crate::engine::types::{ActionPayload, DetectionEvent, PlayerState, Verdict};
use crate::http::middleware::{require_admin, require_auth, AuthenticatedCaller};
use crate::rules::RulesError;
use crate::store::ReviewFlag;
use crate::util::time::{started_at, uptime_secs};

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // CORS configuration - support multiple origins (comma-separated in CLIENT_ORIGIN)
    let allowed_origins: Vec<header::HeaderValue> = state
        .config
        .client_origin
        .split(',')
        .filter_map(|s| s.trim().parse::<header::HeaderValue>().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true);

    // Public routes (no auth required)
    let public_routes = Router::new().route("/health", get(health_handler));

    // Game servers submitting actions
    let protected_routes = Router::new()
        .route("/actions/validate", post(validate_handler))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    // Operators
    let admin_routes = Router::new()
        .route("/admin/rules/reload", post(reload_rules_handler))
        .route("/admin/flagged", get(flagged_handler))
        .route("/admin/players/:user_id/detections", get(detections_handler))
        .route("/admin/players/:user_id/flags", delete(clear_flags_handler))
        .layer(middleware::from_fn_with_state(state.clone(), require_admin));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(admin_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    started_at: Option<DateTime<Utc>>,
    uptime_secs: u64,
    active_hardware_bans: usize,
    rate_limited_players: usize,
    flagged_players: usize,
    persistence: bool,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let now = Utc::now();

    Json(HealthResponse {
        status: "ok",
        started_at: started_at(),
        uptime_secs: uptime_secs(),
        active_hardware_bans: state.ban_cache.active_hardware_bans(now),
        rate_limited_players: state.action_limiter.tracked(),
        flagged_players: state.detection_log.flagged_count(now),
        persistence: state.supabase.is_some(),
    })
}

// ============================================================================
// Action validation
// ============================================================================

#[derive(Deserialize)]
struct ValidateRequest {
    current: PlayerState,
    #[serde(default)]
    previous: Option<PlayerState>,
    #[serde(default)]
    action_type: String,
    #[serde(default)]
    payload: ActionPayload,
}

async fn validate_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedCaller>,
    Json(req): Json<ValidateRequest>,
) -> Result<Json<Verdict>, AppError> {
    if !state.action_limiter.check(&req.current.user_id) {
        warn!(
            user_id = %req.current.user_id,
            caller = %caller.subject,
            "Action rate limit exceeded"
        );
        return Err(AppError::RateLimited);
    }

    let verdict = state.engine.evaluate(
        &req.current,
        req.previous.as_ref(),
        &req.action_type,
        &req.payload,
    );

    Ok(Json(verdict))
}

// ============================================================================
// Admin endpoints
// ============================================================================

#[derive(Serialize)]
struct ReloadResponse {
    status: &'static str,
    blocked_sources: usize,
    signatures: usize,
}

async fn reload_rules_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedCaller>,
) -> Result<Json<ReloadResponse>, AppError> {
    let path: PathBuf = state
        .config
        .rules_path
        .clone()
        .ok_or_else(|| AppError::BadRequest("No rule file configured".to_string()))?;

    let handle = state.engine.rules().clone();
    let rules = tokio::task::spawn_blocking(move || handle.reload_from(&path))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    info!(caller = %caller.subject, "Rule reload requested");

    Ok(Json(ReloadResponse {
        status: "reloaded",
        blocked_sources: rules.matcher.blocked_len(),
        signatures: rules.matcher.signatures().len(),
    }))
}

async fn flagged_handler(State(state): State<AppState>) -> Json<Vec<ReviewFlag>> {
    Json(state.detection_log.flagged(Utc::now()))
}

async fn detections_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Json<Vec<DetectionEvent>> {
    Json(state.detection_log.history(&user_id))
}

#[derive(Serialize)]
struct ClearResponse {
    cleared: bool,
}

async fn clear_flags_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedCaller>,
    Path(user_id): Path<String>,
) -> Result<Json<ClearResponse>, AppError> {
    if !state.detection_log.clear(&user_id) {
        return Err(AppError::NotFound(format!("No detections for {}", user_id)));
    }

    info!(user_id = %user_id, caller = %caller.subject, "Review flag cleared");

    Ok(Json(ClearResponse { cleared: true }))
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Too many requests")]
    RateLimited,

    #[error(transparent)]
    Rules(#[from] RulesError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, self.to_string()),
            AppError::Rules(e) => (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
