use async_trait::async_trait;
use url::Url;

use crate::application::content::ContentSource;
use crate::application::error::PrerenderError;
use crate::domain::template::{TemplateKey, TemplateKind};

use super::{RawId, RequestContext, Template};

/// A post-type archive listing.
///
/// The post type is a textual subtype folded into the storage type string;
/// the object id stays 0 since the subtype already disambiguates.
pub struct PostTypeArchiveTemplate;

#[async_trait]
impl Template for PostTypeArchiveTemplate {
    fn name(&self) -> &'static str {
        TemplateKind::PostTypeArchive.as_str()
    }

    fn is_queried(&self, ctx: &RequestContext) -> bool {
        ctx.post_type_archive.is_some()
    }

    fn queried_id(&self, ctx: &RequestContext) -> Option<RawId> {
        ctx.post_type_archive.clone().map(RawId::Text)
    }

    async fn type_id_pair(
        &self,
        content: &dyn ContentSource,
        id: &RawId,
    ) -> Result<(String, i64), PrerenderError> {
        let post_type = id.to_string();
        if !content.post_type_exists(&post_type).await {
            return Err(PrerenderError::validation(format!(
                "unknown post type `{post_type}`"
            )));
        }

        let key = TemplateKey::with_subtype(self.name(), post_type);
        Ok((key.storage_type(), 0))
    }

    async fn link(&self, content: &dyn ContentSource, id: &RawId) -> Option<Url> {
        content.post_type_archive_url(&id.to_string()).await
    }
}
