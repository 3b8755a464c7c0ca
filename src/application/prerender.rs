//! The prerender read/commit service.
//!
//! `html_for` is what a host integrates into its page pipeline: serve the
//! cached HTML when fresh, otherwise schedule a re-render and serve nothing.
//! `commit` is the write-back path used by the callback handler.

use std::sync::Arc;

use time::OffsetDateTime;
use tracing::warn;

use crate::application::content::ContentSource;
use crate::application::error::PrerenderError;
use crate::application::scheduler::Scheduler;
use crate::application::templates::{RawId, RequestContext, TemplateRegistry};
use crate::cache::{EntryStore, VersionCounter};
use crate::domain::entry::EntryRecord;

pub struct PrerenderService {
    entries: Arc<EntryStore>,
    registry: Arc<TemplateRegistry>,
    content: Arc<dyn ContentSource>,
    html_version: Arc<VersionCounter>,
    scheduler: Arc<Scheduler>,
}

impl PrerenderService {
    pub fn new(
        entries: Arc<EntryStore>,
        registry: Arc<TemplateRegistry>,
        content: Arc<dyn ContentSource>,
        html_version: Arc<VersionCounter>,
        scheduler: Arc<Scheduler>,
    ) -> Self {
        Self {
            entries,
            registry,
            content,
            html_version,
            scheduler,
        }
    }

    /// Cached HTML for the current request, or empty when nothing fresh is
    /// available.
    ///
    /// A stale or absent entry triggers a de-duplicated re-render. The
    /// renderer's own fetch (detected via the cache-buster parameter) always
    /// reads empty, so the render sees the live page.
    pub async fn html_for(&self, ctx: &RequestContext) -> Result<String, PrerenderError> {
        if ctx.renderer_fetch {
            return Ok(String::new());
        }

        let Some((template, raw)) = self.registry.queried(ctx) else {
            return Ok(String::new());
        };

        let (kind, object_id) = template.type_id_pair(self.content.as_ref(), &raw).await?;
        let current = self.html_version.current().await?;

        if let Some(entry) = self.entries.get(&kind, object_id).await?
            && entry.is_fresh(current.as_deref(), OffsetDateTime::now_utc())
        {
            return Ok(entry.html);
        }

        if let Err(err) = self.scheduler.schedule(template.name(), raw, Vec::new()).await {
            warn!(kind = %kind, object_id, error = %err, "failed to schedule stale re-render");
        }

        Ok(String::new())
    }

    /// Commits a renderer write-back, stamping the entry with the version
    /// the HTML was generated against. Returns the stored record and whether
    /// it was newly created.
    pub async fn commit(
        &self,
        template: &str,
        id: &RawId,
        html: &str,
        version: &str,
    ) -> Result<(EntryRecord, bool), PrerenderError> {
        let (kind, object_id) = self
            .registry
            .canonicalize(template, id, self.content.as_ref())
            .await?;

        let created = self.entries.get(&kind, object_id).await?.is_none();
        let record = self.entries.save(html, version, &kind, object_id).await?;

        Ok((record, created))
    }
}
