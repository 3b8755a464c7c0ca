//! The host content source.
//!
//! Permalink and object lookups the cache engine cannot answer on its own.
//! The host CMS (or a configured sidecar adapter, see
//! [`crate::infra::content`]) implements this trait.

use async_trait::async_trait;
use url::Url;

use crate::domain::template::DateId;

#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn home_url(&self) -> Url;

    /// `None` when the post is unknown or no longer public.
    async fn post_url(&self, post_id: i64) -> Option<Url>;

    async fn author_url(&self, author_id: i64) -> Option<Url>;

    async fn term_url(&self, term_id: i64) -> Option<Url>;

    /// `None` when the post type is unknown or has no archive page at all.
    /// An archive that resolves to the site root counts as "no distinct
    /// archive" and is filtered by the scheduler.
    async fn post_type_archive_url(&self, post_type: &str) -> Option<Url>;

    async fn date_archive_url(&self, date: &DateId) -> Option<Url>;

    async fn post_type_exists(&self, post_type: &str) -> bool;
}
