//! REST API endpoints for the enviro service.
//!
//! This module provides the HTTP surface over the store, the window engine,
//! the device link, and the simulator.
//!
//! # Concurrency and Lock Acquisition
//!
//! Handlers hold the `store` lock only for the duration of one store
//! operation; updates are therefore atomic with respect to concurrent reads.
//! When multiple locks are needed, acquire `config` before `store` before
//! `link.machine` to prevent deadlocks.
//!
//! # Error Handling
//!
//! All endpoints return structured JSON errors via [`AppError`]. Validation
//! failures carry the complete list of violated fields in `details`, not
//! just the first; unknown field or range tokens return 400 with the valid
//! values listed in the message.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use enviro_core::{LinkStatus, ValidationError};
use enviro_store::{DISPLAY_BUDGET, StoreStats, WindowResult, downsample};
use enviro_types::{Reading, ReadingPatch, SensorField, TimeRange, now_ms};

use crate::link;
use crate::simulator;
use crate::state::AppState;

/// Default number of readings returned by the history endpoint.
const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Create the API router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        // Health
        .route("/api/health", get(health))
        // Readings
        .route("/api/sensors", get(get_current).post(post_reading))
        .route("/api/sensors/history", get(get_history))
        .route("/api/sensors/chart/{field}", get(get_chart))
        .route("/api/sensors/clear", post(post_clear))
        .route("/api/sensors/reset", post(post_reset))
        .route("/api/sensors/{field}", get(get_field))
        // Device link
        .route("/api/link/status", get(link_status))
        .route("/api/link/connect", post(link_connect))
        .route("/api/link/disconnect", post(link_disconnect))
        .route("/api/link/publish", post(link_publish))
        // Simulator
        .route("/api/simulator/start", post(simulator_start))
        .route("/api/simulator/stop", post(simulator_stop))
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: i64,
    /// Store counters.
    pub store: StoreStats,
    /// Device-link status projection.
    pub link: LinkStatus,
}

/// Health check endpoint.
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let store = state.store.lock().await.stats();
    let link = state.link.machine.lock().await.status();
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: now_ms(),
        store,
        link,
    })
}

/// Current reading endpoint.
async fn get_current(State(state): State<Arc<AppState>>) -> Json<Reading> {
    Json(state.store.lock().await.snapshot())
}

/// One field of the current reading.
#[derive(Debug, Serialize)]
pub struct FieldValueResponse {
    pub field: SensorField,
    pub value: f64,
    pub timestamp: i64,
    pub unit: &'static str,
}

/// Single-field endpoint.
async fn get_field(
    State(state): State<Arc<AppState>>,
    Path(field): Path<String>,
) -> Result<Json<FieldValueResponse>, AppError> {
    let field: SensorField = field.parse().map_err(AppError::bad_request)?;
    let reading = state.store.lock().await.snapshot();
    Ok(Json(FieldValueResponse {
        field,
        value: reading.get(field),
        timestamp: reading.timestamp,
        unit: field.unit(),
    }))
}

/// Write endpoint: validate, merge, broadcast.
async fn post_reading(
    State(state): State<Arc<AppState>>,
    Json(patch): Json<ReadingPatch>,
) -> Result<Json<Reading>, AppError> {
    let reading = state
        .apply_update(&patch)
        .await
        .map_err(AppError::Validation)?;
    Ok(Json(reading))
}

#[derive(Debug, Deserialize)]
struct HistoryParams {
    limit: Option<usize>,
}

/// History response.
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub count: usize,
    pub readings: Vec<Reading>,
}

/// Recent-history endpoint, oldest first.
async fn get_history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoryParams>,
) -> Json<HistoryResponse> {
    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    let readings = state.store.lock().await.recent_history(limit);
    Json(HistoryResponse {
        count: readings.len(),
        readings,
    })
}

#[derive(Debug, Deserialize)]
struct ChartParams {
    range: Option<String>,
}

/// Chart-data endpoint: windowed query plus stride downsampling.
async fn get_chart(
    State(state): State<Arc<AppState>>,
    Path(field): Path<String>,
    Query(params): Query<ChartParams>,
) -> Result<Json<WindowResult>, AppError> {
    let field: SensorField = field.parse().map_err(AppError::bad_request)?;
    let range = match params.range.as_deref() {
        None => TimeRange::OneHour,
        Some(token) => token.parse().map_err(AppError::bad_request)?,
    };

    let result = state.store.lock().await.query(range, Some(field));
    Ok(Json(downsample(result, DISPLAY_BUDGET)))
}

/// Acknowledgement for state-changing endpoints without a payload.
#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub message: &'static str,
}

/// Clear-history endpoint. The current reading is untouched.
async fn post_clear(State(state): State<Arc<AppState>>) -> Json<AckResponse> {
    state.store.lock().await.clear();
    Json(AckResponse {
        message: "history cleared",
    })
}

/// Reset endpoint: restore the startup reading and clear history.
async fn post_reset(State(state): State<Arc<AppState>>) -> Json<AckResponse> {
    state.store.lock().await.reset();
    Json(AckResponse {
        message: "store reset",
    })
}

/// Device-link status endpoint.
async fn link_status(State(state): State<Arc<AppState>>) -> Json<LinkStatus> {
    Json(link::status(&state).await)
}

/// Device-link connect endpoint.
///
/// Always returns the resulting status projection; incomplete credentials
/// surface as `state: "failed"` rather than an error, and the connection is
/// skipped.
async fn link_connect(State(state): State<Arc<AppState>>) -> Json<LinkStatus> {
    Json(link::connect(&state).await)
}

/// Device-link disconnect endpoint.
async fn link_disconnect(State(state): State<Arc<AppState>>) -> Json<LinkStatus> {
    Json(link::disconnect(&state).await)
}

/// Publish the current reading to the cloud.
async fn link_publish(State(state): State<Arc<AppState>>) -> Result<Json<Reading>, AppError> {
    let reading = link::publish_current(&state).await?;
    Ok(Json(reading))
}

/// Simulator status.
#[derive(Debug, Serialize)]
pub struct SimulatorResponse {
    pub running: bool,
}

/// Simulator start endpoint.
async fn simulator_start(State(state): State<Arc<AppState>>) -> Json<SimulatorResponse> {
    simulator::start(Arc::clone(&state));
    Json(SimulatorResponse { running: true })
}

/// Simulator stop endpoint.
async fn simulator_stop(State(state): State<Arc<AppState>>) -> Json<SimulatorResponse> {
    simulator::stop(&state);
    Json(SimulatorResponse { running: false })
}

/// API errors.
#[derive(Debug)]
pub enum AppError {
    /// Unknown field/range token or otherwise malformed request.
    BadRequest(String),
    /// One or more fields violated their range; carries every violation.
    Validation(Vec<ValidationError>),
    /// Operation requires an active device link.
    NotConnected,
    /// Unexpected failure.
    Internal(String),
}

impl AppError {
    fn bad_request(e: impl std::fmt::Display) -> Self {
        AppError::BadRequest(e.to_string())
    }
}

impl From<enviro_core::Error> for AppError {
    fn from(e: enviro_core::Error) -> Self {
        match e {
            enviro_core::Error::NotConnected => AppError::NotConnected,
            enviro_core::Error::ConfigIncomplete(msg) => AppError::BadRequest(msg),
            enviro_core::Error::Link(msg) => AppError::Internal(msg),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match self {
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "error": msg }),
            ),
            AppError::Validation(errors) => {
                let details: Vec<String> = errors.iter().map(ToString::to_string).collect();
                (
                    StatusCode::BAD_REQUEST,
                    serde_json::json!({ "error": "validation failed", "details": details }),
                )
            }
            AppError::NotConnected => (
                StatusCode::CONFLICT,
                serde_json::json!({ "error": "device link is not connected" }),
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "error": msg }),
            ),
        };

        (status, Json(body)).into_response()
    }
}
