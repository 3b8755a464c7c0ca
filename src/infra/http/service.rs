//! Thin service routes: event intake, manual flush, health.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::info;

use crate::application::events::ContentEvent;

use super::error::ApiError;
use super::HttpState;

/// Adapter endpoint for host event systems: one content-change notification
/// per request, applied to the scheduler.
pub async fn ingest_event(
    State(state): State<HttpState>,
    Json(event): Json<ContentEvent>,
) -> Response {
    state.scheduler.apply(&event).await;
    StatusCode::ACCEPTED.into_response()
}

#[derive(Debug, Serialize)]
pub struct FlushResponse {
    pub version: String,
    pub secrets_flushed: u64,
}

/// Manual global flush: bump the HTML version token (staling every entry at
/// once) and drop all outstanding render secrets.
pub async fn flush(State(state): State<HttpState>) -> Result<Json<FlushResponse>, ApiError> {
    let version = state.html_version.bump().await.map_err(ApiError::storage)?;
    let secrets_flushed = state.secrets.flush().await.map_err(ApiError::storage)?;

    info!(secrets_flushed, "HTML version bumped; all entries stale");

    Ok(Json(FlushResponse {
        version,
        secrets_flushed,
    }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub async fn health(State(state): State<HttpState>) -> Result<Json<HealthResponse>, ApiError> {
    state
        .html_version
        .current()
        .await
        .map_err(ApiError::storage)?;

    Ok(Json(HealthResponse { status: "ok" }))
}
