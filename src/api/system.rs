//! System API endpoints.
//!
//! Status, health probes and access to the persisted security event log.
//! These handlers talk to [`crate::db::Store`] directly; there is no
//! business logic to delegate.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{
    ApiError, ApiResponse, AppState, SecurityEventDto, SecurityEventsResponse, SystemStatus,
};

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    pub severity: Option<String>,
    pub kind: Option<String>,
}

const fn default_page() -> u64 {
    1
}

const fn default_page_size() -> u64 {
    50
}

#[derive(Debug, Serialize)]
pub struct HealthLiveResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthReadinessChecks {
    pub database: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthReadyResponse {
    pub ready: bool,
    pub checks: HealthReadinessChecks,
}

/// Returns overall system status.
///
/// # Endpoint
/// `GET /api/system/status`
///
/// Reports version, uptime, the number of registered accounts and
/// whether the database answers.
pub async fn get_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<SystemStatus>>, ApiError> {
    let total_accounts = state.store().count_accounts().await?;
    let database_ok = state.store().ping().await.is_ok();

    let status = SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime: state.start_time.elapsed().as_secs(),
        total_accounts,
        database_ok,
    };

    Ok(Json(ApiResponse::success(status)))
}

/// `GET /api/system/health/live`
///
/// Lightweight liveness probe to indicate the API process is running.
pub async fn health_live() -> impl IntoResponse {
    Json(ApiResponse::success(HealthLiveResponse { status: "alive" }))
}

/// `GET /api/system/health/ready`
///
/// Readiness probe that checks database connectivity.
pub async fn health_ready(State(state): State<Arc<AppState>>) -> Response {
    let db_ready = state.store().ping().await.is_ok();

    let ready = db_ready;
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ApiResponse::success(HealthReadyResponse {
            ready,
            checks: HealthReadinessChecks { database: db_ready },
        })),
    )
        .into_response()
}

/// Returns a page of persisted security events, newest first.
///
/// # Endpoint
/// `GET /api/system/events`
pub async fn get_security_events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<ApiResponse<SecurityEventsResponse>>, ApiError> {
    let (events, total_pages) = state
        .store()
        .get_security_events(
            query.page,
            query.page_size,
            query.severity.as_deref(),
            query.kind.as_deref(),
        )
        .await?;

    let dtos: Vec<SecurityEventDto> = events.into_iter().map(SecurityEventDto::from).collect();

    Ok(Json(ApiResponse::success(SecurityEventsResponse {
        events: dtos,
        total_pages,
    })))
}
