//! REST API server for the MoneyFlow assistant
//!
//! Exposes the chat orchestrator and the analytics series via HTTP.
//! Authentication lives in the outer CRUD application; this surface
//! trusts the caller-supplied user identity.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::aggregator::{FinancialAggregator, DEFAULT_WINDOW_DAYS};
use crate::analytics::AnalyticsService;
use crate::chat::ChatOrchestrator;
use crate::models::TransactionKind;

/// Caller-supplied lookback bounds
const MIN_WINDOW_DAYS: u32 = 1;
const MAX_WINDOW_DAYS: u32 = 365;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub user_id: Option<String>,
    pub message: String,
    pub days: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ClearHistoryRequest {
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub user_id: Option<String>,
    pub days: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct MonthlyQuery {
    pub user_id: Option<String>,
    pub months: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct TrendQuery {
    pub user_id: Option<String>,
    pub days: Option<u32>,
    #[serde(rename = "type")]
    pub kind: Option<TransactionKind>,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<ChatOrchestrator>,
    pub aggregator: FinancialAggregator,
    pub analytics: AnalyticsService,
}

/// =============================
/// Helpers — User Identity
/// =============================

fn stable_uuid_from_string(input: &str) -> uuid::Uuid {
    use sha2::{Digest, Sha256};

    let hash = Sha256::digest(input.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hash[..16]);

    // Set UUID version (4) and variant (RFC4122) bits.
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    uuid::Uuid::from_bytes(bytes)
}

fn parse_or_stable_uuid(value: Option<&str>, fallback_seed: &str) -> uuid::Uuid {
    match value {
        Some(v) if !v.trim().is_empty() => {
            uuid::Uuid::parse_str(v).unwrap_or_else(|_| stable_uuid_from_string(v))
        }
        _ => stable_uuid_from_string(fallback_seed),
    }
}

fn validate_days(days: u32) -> Result<u32, (StatusCode, Json<ApiResponse>)> {
    if !(MIN_WINDOW_DAYS..=MAX_WINDOW_DAYS).contains(&days) {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(format!(
                "Days parameter must be between {} and {}",
                MIN_WINDOW_DAYS, MAX_WINDOW_DAYS
            ))),
        ));
    }
    Ok(days)
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Chat Endpoints
/// =============================

async fn chat_handler(
    State(state): State<ApiState>,
    Json(req): Json<ChatRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    let user_id = parse_or_stable_uuid(req.user_id.as_deref(), "anonymous-user");
    let days = match validate_days(req.days.unwrap_or(DEFAULT_WINDOW_DAYS)) {
        Ok(days) => days,
        Err(rejection) => return rejection,
    };

    info!(%user_id, days, "Received chat request");

    let outcome = state.orchestrator.chat(user_id, &req.message, days).await;

    // The orchestrator never fails hard: even success=false carries a
    // user-facing reply, so the transport status stays 200.
    (StatusCode::OK, Json(ApiResponse::success(outcome)))
}

async fn clear_history_handler(
    State(state): State<ApiState>,
    Json(req): Json<ClearHistoryRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    let user_id = parse_or_stable_uuid(req.user_id.as_deref(), "anonymous-user");

    state.orchestrator.sessions().clear(user_id).await;
    info!(%user_id, "Cleared conversation history");

    (
        StatusCode::OK,
        Json(ApiResponse::success(serde_json::json!({ "cleared": true }))),
    )
}

/// =============================
/// Analytics Endpoints
/// =============================

async fn summary_handler(
    State(state): State<ApiState>,
    Query(query): Query<SummaryQuery>,
) -> (StatusCode, Json<ApiResponse>) {
    let user_id = parse_or_stable_uuid(query.user_id.as_deref(), "anonymous-user");
    let days = match validate_days(query.days.unwrap_or(DEFAULT_WINDOW_DAYS)) {
        Ok(days) => days,
        Err(rejection) => return rejection,
    };

    match state.aggregator.window(user_id, days).await {
        Ok(window) => (StatusCode::OK, Json(ApiResponse::success(window))),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(format!("Summary failed: {}", e))),
        ),
    }
}

async fn monthly_handler(
    State(state): State<ApiState>,
    Query(query): Query<MonthlyQuery>,
) -> (StatusCode, Json<ApiResponse>) {
    let user_id = parse_or_stable_uuid(query.user_id.as_deref(), "anonymous-user");
    let months = query.months.unwrap_or(6).clamp(1, 24);

    match state.analytics.monthly_comparison(user_id, months).await {
        Ok(comparison) => (StatusCode::OK, Json(ApiResponse::success(comparison))),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(format!("Monthly comparison failed: {}", e))),
        ),
    }
}

async fn trend_handler(
    State(state): State<ApiState>,
    Query(query): Query<TrendQuery>,
) -> (StatusCode, Json<ApiResponse>) {
    let user_id = parse_or_stable_uuid(query.user_id.as_deref(), "anonymous-user");
    let days = match validate_days(query.days.unwrap_or(DEFAULT_WINDOW_DAYS)) {
        Ok(days) => days,
        Err(rejection) => return rejection,
    };

    match state.analytics.daily_trend(user_id, days, query.kind).await {
        Ok(trend) => (StatusCode::OK, Json(ApiResponse::success(trend))),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(format!("Trend query failed: {}", e))),
        ),
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/chat", post(chat_handler))
        .route("/api/chat/clear", post(clear_history_handler))
        .route("/api/analytics/summary", get(summary_handler))
        .route("/api/analytics/monthly", get(monthly_handler))
        .route("/api/analytics/trend", get(trend_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    state: ApiState,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stable_uuid_is_deterministic() {
        let a = stable_uuid_from_string("user-42");
        let b = stable_uuid_from_string("user-42");
        let c = stable_uuid_from_string("user-43");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.get_version_num(), 4);
    }

    #[test]
    fn test_parse_or_stable_uuid_accepts_real_uuids() {
        let real = uuid::Uuid::new_v4();
        assert_eq!(parse_or_stable_uuid(Some(&real.to_string()), "seed"), real);

        let fallback = parse_or_stable_uuid(None, "seed");
        assert_eq!(fallback, stable_uuid_from_string("seed"));

        let blank = parse_or_stable_uuid(Some("   "), "seed");
        assert_eq!(blank, fallback);
    }

    #[test]
    fn test_days_validation_bounds() {
        assert!(validate_days(0).is_err());
        assert!(validate_days(1).is_ok());
        assert!(validate_days(365).is_ok());
        assert!(validate_days(366).is_err());
    }
}
