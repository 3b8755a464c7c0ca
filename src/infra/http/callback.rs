//! The render write-back endpoint.
//!
//! Accepts `{type, id, html, version, secret}` from the remote renderer.
//! Checks run in a documented, fixed order: secret authentication first
//! (401), then version validation against the current HTML token (400),
//! then key canonicalization (400), then the upsert (500 on storage
//! failure). The entry is stamped with the *provided* version, a provenance
//! mark telling future readers which generation the HTML was built against.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use metrics::counter;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::application::error::PrerenderError;
use crate::application::templates::RawId;
use crate::domain::entry::EntryRecord;

use super::error::ApiError;
use super::HttpState;

#[derive(Debug, Clone, Deserialize)]
pub struct SaveItemRequest {
    #[serde(rename = "type")]
    pub template: String,
    pub id: String,
    pub html: String,
    pub version: String,
    pub secret: String,
}

#[derive(Debug, Serialize)]
pub struct EntryResponse {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub object_id: i64,
    pub html: String,
    pub version: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated: OffsetDateTime,
}

impl From<EntryRecord> for EntryResponse {
    fn from(record: EntryRecord) -> Self {
        Self {
            id: record.id,
            kind: record.kind,
            object_id: record.object_id,
            html: record.html,
            version: record.version,
            created: record.created,
            updated: record.updated,
        }
    }
}

pub async fn save_item(
    State(state): State<HttpState>,
    Json(request): Json<SaveItemRequest>,
) -> Result<Response, ApiError> {
    state
        .secrets
        .authorize(&request.template, &request.id, &request.secret)
        .await
        .map_err(|err| match err {
            PrerenderError::Storage(storage) => ApiError::storage(storage),
            other => {
                counter!("specchio_callback_rejected_total").increment(1);
                warn!(
                    template = %request.template,
                    id = %request.id,
                    error = %other,
                    "render callback failed authorization"
                );
                ApiError::unauthorized()
            }
        })?;

    let current = state
        .html_version
        .current()
        .await
        .map_err(ApiError::storage)?;
    if current.as_deref() != Some(request.version.as_str()) {
        counter!("specchio_callback_rejected_total").increment(1);
        return Err(ApiError::stale_version());
    }

    let raw = RawId::from(request.id.as_str());
    let (record, created) = state
        .prerender
        .commit(&request.template, &raw, &request.html, &request.version)
        .await
        .map_err(|err| match err {
            PrerenderError::Storage(storage) => ApiError::storage(storage),
            other => {
                counter!("specchio_callback_rejected_total").increment(1);
                ApiError::bad_request(other.to_string())
            }
        })?;

    // The secret authorized exactly this write-back; consume it so a replay
    // fails authorization.
    if let Err(err) = state.secrets.delete(&request.template, &request.id).await {
        warn!(
            template = %request.template,
            id = %request.id,
            error = %err,
            "failed to consume render secret"
        );
    }

    counter!("specchio_callback_accepted_total").increment(1);
    info!(
        template = %request.template,
        id = %request.id,
        created,
        "render callback committed"
    );

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((status, Json(EntryResponse::from(record))).into_response())
}
