//! HTTP route definitions

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::app::AppState;
use crate::game::MatchError;
use crate::store::users::{LeaderboardEntry, UserRecord, LEADERBOARD_SIZE};
use crate::store::StoreError;
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.client_origin);

    let api_routes = Router::new()
        .route("/login", post(login_handler))
        .route("/report-result", post(report_result_handler))
        .route("/leaderboard", get(leaderboard_handler));

    Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .route("/reset", post(reset_handler))
        .nest("/api", api_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// CORS from a comma-separated origin list; `*` allows any origin
fn cors_layer(client_origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    if client_origin.trim() == "*" {
        return cors.allow_origin(Any);
    }

    let allowed_origins: Vec<header::HeaderValue> = client_origin
        .split(',')
        .filter_map(|s| s.trim().parse::<header::HeaderValue>().ok())
        .collect();
    cors.allow_origin(allowed_origins)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    active_matches: usize,
    active_players: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        active_matches: state.match_registry.active_matches(),
        active_players: state.match_registry.total_players(),
    })
}

// ============================================================================
// Account endpoints
// ============================================================================

#[derive(Debug, Deserialize)]
struct LoginRequest {
    #[serde(default)]
    username: String,
}

async fn login_handler(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<UserRecord>, AppError> {
    let Json(req) = body.map_err(|_| AppError::BadRequest("Username required".to_string()))?;
    let username = req.username.trim();
    if username.is_empty() {
        return Err(AppError::BadRequest("Username required".to_string()));
    }

    let user = state.user_store.get_or_create_user(username).await?;
    Ok(Json(user))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum MatchResult {
    Win,
    Loss,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportResultRequest {
    user_id: i64,
    result: MatchResult,
}

#[derive(Serialize)]
struct SuccessResponse {
    success: bool,
}

async fn report_result_handler(
    State(state): State<AppState>,
    body: Result<Json<ReportResultRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, AppError> {
    let Json(req) = body.map_err(|_| AppError::BadRequest("Missing data".to_string()))?;

    state
        .user_store
        .record_result(req.user_id, req.result == MatchResult::Win)
        .await?;

    Ok(Json(SuccessResponse { success: true }))
}

async fn leaderboard_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<LeaderboardEntry>>, AppError> {
    let rows = state.user_store.top_players(LEADERBOARD_SIZE).await?;
    Ok(Json(rows))
}

// ============================================================================
// Debug endpoint
// ============================================================================

async fn reset_handler(State(state): State<AppState>) -> Result<&'static str, AppError> {
    info!(match_id = %state.lobby.id, "Manual game reset triggered");
    state.lobby.reset().await?;
    Ok("Game Reset")
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

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UserNotFound(id) => AppError::NotFound(format!("User {id}")),
            other => {
                warn!(error = %other, "Store request failed");
                AppError::Internal("Database error".to_string())
            }
        }
    }
}

impl From<MatchError> for AppError {
    fn from(err: MatchError) -> Self {
        AppError::Unavailable(err.to_string())
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let message = match &self {
            AppError::BadRequest(msg)
            | AppError::NotFound(msg)
            | AppError::Unavailable(msg)
            | AppError::Internal(msg) => msg.clone(),
        };

        let body = serde_json::json!({
            "error": message
        });

        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn report_request_uses_camel_case() {
        let req: ReportResultRequest =
            serde_json::from_str(r#"{"userId":12,"result":"win"}"#).unwrap();
        assert_eq!(req.user_id, 12);
        assert_eq!(req.result, MatchResult::Win);

        let bad = serde_json::from_str::<ReportResultRequest>(r#"{"userId":12,"result":"draw"}"#);
        tokio_test::assert_err!(bad);
        let missing = serde_json::from_str::<ReportResultRequest>(r#"{"result":"loss"}"#);
        tokio_test::assert_err!(missing);
    }

    #[test]
    fn login_request_tolerates_missing_username() {
        let req: LoginRequest = serde_json::from_str("{}").unwrap();
        assert!(req.username.is_empty());
    }

    #[test]
    fn store_errors_map_to_status_codes() {
        assert_eq!(
            AppError::from(StoreError::UserNotFound(3)).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(StoreError::NoRowReturned).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::from(MatchError::Closed(Uuid::nil())).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn error_response_carries_status() {
        let response = AppError::BadRequest("Username required".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
