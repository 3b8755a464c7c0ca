//! The render dispatcher.
//!
//! Composes the render-job payload (URL, one-time secret, callback URL,
//! version stamp) and hands it to the invocation transport. Fire-and-forget:
//! the dispatcher waits for the transport to accept the call, never for the
//! render itself, and schedules no retries.

use std::sync::Arc;

use async_trait::async_trait;
use metrics::counter;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::application::content::ContentSource;
use crate::application::error::PrerenderError;
use crate::application::queue::RenderJob;
use crate::application::templates::TemplateRegistry;
use crate::cache::{SecretsManager, VersionCounter};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("render endpoint rejected invocation with status {status}")]
    Rejected { status: u16 },
    #[error("render invocation failed: {0}")]
    Request(String),
}

/// The asynchronous remote-render invocation. Implementations only confirm
/// that the call was accepted; results come back through the callback
/// endpoint minutes later, on an unrelated connection.
#[async_trait]
pub trait RenderTransport: Send + Sync {
    async fn send(&self, payload: &RenderPayload) -> Result<(), TransportError>;
}

/// The outbound render-job payload, as consumed by the remote renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderPayload {
    #[serde(rename = "type")]
    pub template: String,
    pub id: String,
    /// Page URL decorated with the cache-buster parameter, so the renderer's
    /// own fetch bypasses any front-end cache.
    pub url: String,
    /// Name of the global variable the page uses to detect a prerender pass.
    pub variable: String,
    /// DOM selector whose rendered markup is extracted and posted back.
    pub selector: String,
    pub return_url: String,
    pub secret: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DispatchSettings {
    /// Absolute URL of the write-back endpoint.
    pub return_url: Url,
    pub selector: String,
    pub variable: String,
    /// Query-parameter name appended to every dispatched page URL.
    pub cache_buster: String,
}

pub struct RenderDispatcher {
    registry: Arc<TemplateRegistry>,
    content: Arc<dyn ContentSource>,
    secrets: Arc<SecretsManager>,
    html_version: Arc<VersionCounter>,
    transport: Arc<dyn RenderTransport>,
    settings: DispatchSettings,
}

impl RenderDispatcher {
    pub fn new(
        registry: Arc<TemplateRegistry>,
        content: Arc<dyn ContentSource>,
        secrets: Arc<SecretsManager>,
        html_version: Arc<VersionCounter>,
        transport: Arc<dyn RenderTransport>,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            registry,
            content,
            secrets,
            html_version,
            transport,
            settings,
        }
    }

    /// Resolves the job to a public URL, issues a one-time secret and fires
    /// the remote call.
    ///
    /// A job whose URL no longer resolves (content deleted moments after
    /// scheduling) is dropped silently; that is an expected steady-state
    /// condition, not an error. Secret-issuance and transport failures
    /// propagate to the caller and are never retried here.
    pub async fn invoke(&self, job: &RenderJob) -> Result<(), PrerenderError> {
        let template = self.registry.find(&job.template).ok_or_else(|| {
            PrerenderError::validation(format!("template `{}` is not implemented", job.template))
        })?;

        let Some(mut url) = template.link(self.content.as_ref(), &job.id).await else {
            counter!("specchio_render_dispatch_dropped_total").increment(1);
            debug!(
                template = %job.template,
                id = %job.id,
                "no public URL for render target; dropping job"
            );
            return Ok(());
        };

        url.query_pairs_mut()
            .append_pair(&self.settings.cache_buster, "1");

        let id = job.id.to_string();
        let secret = self.secrets.init(&job.template, &id).await?;
        let version = self.html_version.current().await?.unwrap_or_default();

        let payload = RenderPayload {
            template: job.template.clone(),
            id,
            url: url.into(),
            variable: self.settings.variable.clone(),
            selector: self.settings.selector.clone(),
            return_url: self.settings.return_url.to_string(),
            secret,
            version,
            args: job.extra.clone(),
        };

        self.transport.send(&payload).await?;

        counter!("specchio_render_dispatch_total").increment(1);
        info!(
            template = %job.template,
            id = %payload.id,
            url = %payload.url,
            "render dispatched"
        );

        Ok(())
    }
}
