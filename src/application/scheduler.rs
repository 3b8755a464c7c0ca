//! The invalidation scheduler.
//!
//! Reacts to content-change events, determines every dependent cached page,
//! and enqueues de-duplicated render jobs. Scheduling clears the entry row
//! first, so readers see a cache miss while the render is in flight.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::application::content::ContentSource;
use crate::application::error::PrerenderError;
use crate::application::events::{ContentEvent, PostChange, PostStatus};
use crate::application::queue::{RenderJob, RenderQueue};
use crate::application::templates::{RawId, TemplateRegistry};
use crate::cache::EntryStore;
use crate::domain::template::{DateId, TemplateKind};
use url::Url;

/// Cascade-suppression hook: `(dependent template, source object id,
/// dependent id) -> proceed?`. Defaults to true for every dependent.
pub type ShouldUpdateFn = dyn Fn(&str, i64, &RawId) -> bool + Send + Sync;

pub struct SchedulerPolicy {
    /// The post type whose entries feed year/month/day archives.
    pub chronological_post_type: String,
    hooks: HashMap<String, Arc<ShouldUpdateFn>>,
}

impl Default for SchedulerPolicy {
    fn default() -> Self {
        Self {
            chronological_post_type: "post".to_string(),
            hooks: HashMap::new(),
        }
    }
}

impl SchedulerPolicy {
    pub fn with_chronological_post_type(post_type: impl Into<String>) -> Self {
        Self {
            chronological_post_type: post_type.into(),
            ..Default::default()
        }
    }

    /// Registers a suppression hook for one dependent template kind.
    pub fn set_should_update(&mut self, dependent: impl Into<String>, hook: Arc<ShouldUpdateFn>) {
        self.hooks.insert(dependent.into(), hook);
    }

    pub fn should_update(&self, dependent: &str, source_id: i64, dependent_id: &RawId) -> bool {
        self.hooks
            .get(dependent)
            .map(|hook| hook(dependent, source_id, dependent_id))
            .unwrap_or(true)
    }
}

pub struct Scheduler {
    entries: Arc<EntryStore>,
    registry: Arc<TemplateRegistry>,
    content: Arc<dyn ContentSource>,
    queue: Arc<RenderQueue>,
    policy: SchedulerPolicy,
}

impl Scheduler {
    pub fn new(
        entries: Arc<EntryStore>,
        registry: Arc<TemplateRegistry>,
        content: Arc<dyn ContentSource>,
        queue: Arc<RenderQueue>,
        policy: SchedulerPolicy,
    ) -> Self {
        Self {
            entries,
            registry,
            content,
            queue,
            policy,
        }
    }

    /// Adapter entry point for host event systems.
    pub async fn apply(&self, event: &ContentEvent) {
        match event {
            ContentEvent::PostStatusChanged {
                post, new_status, ..
            } => self.update_post(post, *new_status).await,
            ContentEvent::PostDeleted { post } => self.delete_post(post).await,
            ContentEvent::TermSaved {
                term_id, public, ..
            } => self.update_term(*term_id, *public).await,
            ContentEvent::TermDeleted { term_id, public } => {
                self.delete_term(*term_id, *public).await
            }
        }
    }

    /// A post was saved. Autosaves and revisions are not real content and
    /// never schedule; any transition away from published deletes instead.
    pub async fn update_post(&self, post: &PostChange, new_status: PostStatus) {
        if post.autosave || post.revision {
            return;
        }

        if !new_status.is_published() {
            self.delete_post(post).await;
            return;
        }

        self.schedule_post(post.post_id).await;
        self.update_post_related(post).await;
    }

    /// A post was removed. Its entry goes away and every dependent listing
    /// re-renders, since removal changes archives too.
    pub async fn delete_post(&self, post: &PostChange) {
        if let Err(err) = self
            .entries
            .delete(TemplateKind::Post.as_str(), post.post_id)
            .await
        {
            warn!(post_id = post.post_id, error = %err, "failed to delete post entry");
        }

        self.update_post_related(post).await;
    }

    pub async fn update_term(&self, term_id: i64, public: bool) {
        if !public {
            return;
        }

        self.schedule_term(term_id).await;
        self.update_term_related(term_id).await;
    }

    pub async fn delete_term(&self, term_id: i64, public: bool) {
        if !public {
            return;
        }

        if let Err(err) = self
            .entries
            .delete(TemplateKind::Term.as_str(), term_id)
            .await
        {
            warn!(term_id, error = %err, "failed to delete term entry");
        }

        self.update_term_related(term_id).await;
    }

    /// Fan-out from a single post change: frontpage, the author page, the
    /// post-type archive (unless it resolves to the site root), date
    /// archives for the chronological post type, and every public term the
    /// post belongs to. Each target is gated by the suppression hooks.
    async fn update_post_related(&self, post: &PostChange) {
        let source = post.post_id;

        if self
            .policy
            .should_update(TemplateKind::Frontpage.as_str(), source, &RawId::Int(0))
        {
            self.schedule_frontpage().await;
        }

        if self.policy.should_update(
            TemplateKind::Author.as_str(),
            source,
            &RawId::Int(post.author_id),
        ) {
            self.schedule_author(post.author_id).await;
        }

        if let Some(archive) = self.content.post_type_archive_url(&post.post_type).await {
            let home = self.content.home_url().await;
            if !same_location(&archive, &home)
                && self.policy.should_update(
                    TemplateKind::PostTypeArchive.as_str(),
                    source,
                    &RawId::from(post.post_type.as_str()),
                )
            {
                self.schedule_post_type_archive(&post.post_type).await;
            }
        }

        if post.post_type == self.policy.chronological_post_type
            && let Some(date) = post.published_on
        {
            let day = DateId::of_day(date.year(), date.month() as u8, date.day());
            if self.policy.should_update(
                TemplateKind::DateArchive.as_str(),
                source,
                &RawId::from(day.compact()),
            ) {
                self.schedule_date_archive(DateId::of_year(day.year)).await;
                self.schedule_date_archive(DateId::of_month(day.year, date.month() as u8))
                    .await;
                self.schedule_date_archive(day).await;
            }
        }

        for term in &post.terms {
            if !term.public {
                continue;
            }
            if self.policy.should_update(
                TemplateKind::Term.as_str(),
                source,
                &RawId::Int(term.term_id),
            ) {
                self.schedule_term(term.term_id).await;
            }
        }
    }

    /// Term changes invalidate the frontpage only, by default.
    async fn update_term_related(&self, term_id: i64) {
        if self
            .policy
            .should_update(TemplateKind::Frontpage.as_str(), term_id, &RawId::Int(0))
        {
            self.schedule_frontpage().await;
        }
    }

    pub async fn schedule_post(&self, post_id: i64) {
        self.schedule_logged(TemplateKind::Post.as_str(), RawId::Int(post_id))
            .await;
    }

    pub async fn schedule_term(&self, term_id: i64) {
        self.schedule_logged(TemplateKind::Term.as_str(), RawId::Int(term_id))
            .await;
    }

    pub async fn schedule_author(&self, author_id: i64) {
        self.schedule_logged(TemplateKind::Author.as_str(), RawId::Int(author_id))
            .await;
    }

    pub async fn schedule_frontpage(&self) {
        self.schedule_logged(TemplateKind::Frontpage.as_str(), RawId::Int(0))
            .await;
    }

    pub async fn schedule_post_type_archive(&self, post_type: &str) {
        self.schedule_logged(TemplateKind::PostTypeArchive.as_str(), RawId::from(post_type))
            .await;
    }

    pub async fn schedule_date_archive(&self, date: DateId) {
        self.schedule_logged(TemplateKind::DateArchive.as_str(), RawId::from(date.compact()))
            .await;
    }

    /// Cascade legs log failures and carry on; one broken leg must not stop
    /// the rest of the fan-out.
    async fn schedule_logged(&self, template: &str, id: RawId) {
        if let Err(err) = self.schedule(template, id.clone(), Vec::new()).await {
            warn!(template, id = %id, error = %err, "failed to schedule render");
        }
    }

    /// Canonicalizes the key, clears the cached entry and enqueues a render
    /// job unless an identical one is already pending. Returns whether a new
    /// job was enqueued.
    pub async fn schedule(
        &self,
        template: &str,
        id: RawId,
        extra: Vec<String>,
    ) -> Result<bool, PrerenderError> {
        let (kind, object_id) = self
            .registry
            .canonicalize(template, &id, self.content.as_ref())
            .await?;

        let job = RenderJob {
            template: template.to_string(),
            id,
            extra,
        };

        if self.queue.is_scheduled(&job) {
            debug!(template, kind = %kind, object_id, "render already pending; skipping");
            return Ok(false);
        }

        self.entries.clear(&kind, object_id).await?;

        Ok(self.queue.push(job))
    }
}

/// Trailing-slash-insensitive URL comparison; an archive living at the site
/// root is not a distinct page.
fn same_location(a: &Url, b: &Url) -> bool {
    a.as_str().trim_end_matches('/') == b.as_str().trim_end_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_defaults_to_updating() {
        let policy = SchedulerPolicy::default();
        assert!(policy.should_update("frontpage", 7, &RawId::Int(0)));
    }

    #[test]
    fn policy_hook_can_suppress() {
        let mut policy = SchedulerPolicy::default();
        policy.set_should_update("date_archive", Arc::new(|_, _, _| false));

        assert!(!policy.should_update("date_archive", 7, &RawId::from("20240315")));
        assert!(policy.should_update("frontpage", 7, &RawId::Int(0)));
    }

    #[test]
    fn same_location_ignores_trailing_slash() {
        let a = Url::parse("https://example.test/").expect("url");
        let b = Url::parse("https://example.test").expect("url");
        let c = Url::parse("https://example.test/products/").expect("url");

        assert!(same_location(&a, &b));
        assert!(!same_location(&a, &c));
    }
}
