//! HTTP surface: the render write-back endpoint plus the thin service
//! routes (event intake, manual flush, health).

mod callback;
mod error;
mod service;

pub use callback::{EntryResponse, SaveItemRequest};
pub use error::{ApiError, codes};

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::application::prerender::PrerenderService;
use crate::application::scheduler::Scheduler;
use crate::cache::{SecretsManager, VersionCounter};

/// Path of the render write-back endpoint, joined onto the public base URL
/// to produce the `return_url` carried in dispatch payloads.
pub const CALLBACK_PATH: &str = "/specchio/v1/prerender";

#[derive(Clone)]
pub struct HttpState {
    pub prerender: Arc<PrerenderService>,
    pub scheduler: Arc<Scheduler>,
    pub secrets: Arc<SecretsManager>,
    pub html_version: Arc<VersionCounter>,
}

pub fn router(state: HttpState) -> Router {
    Router::new()
        .route(CALLBACK_PATH, post(callback::save_item))
        .route("/specchio/v1/events", post(service::ingest_event))
        .route("/specchio/v1/flush", post(service::flush))
        .route("/specchio/v1/health", get(service::health))
        .with_state(state)
}
