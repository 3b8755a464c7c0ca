use async_trait::async_trait;
use url::Url;

use crate::application::content::ContentSource;
use crate::domain::template::TemplateKind;

use super::{RawId, RequestContext, Template};

/// A single post or page, keyed by its numeric id.
pub struct PostTemplate;

#[async_trait]
impl Template for PostTemplate {
    fn name(&self) -> &'static str {
        TemplateKind::Post.as_str()
    }

    fn is_queried(&self, ctx: &RequestContext) -> bool {
        ctx.post_id.is_some()
    }

    fn queried_id(&self, ctx: &RequestContext) -> Option<RawId> {
        ctx.post_id.map(RawId::Int)
    }

    async fn link(&self, content: &dyn ContentSource, id: &RawId) -> Option<Url> {
        content.post_url(id.as_int()?).await
    }
}
