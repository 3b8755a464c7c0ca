use async_trait::async_trait;
use url::Url;

use crate::application::content::ContentSource;
use crate::domain::template::TemplateKind;

use super::{RawId, RequestContext, Template};

/// An author listing page, keyed by the author's numeric id.
pub struct AuthorTemplate;

#[async_trait]
impl Template for AuthorTemplate {
    fn name(&self) -> &'static str {
        TemplateKind::Author.as_str()
    }

    fn is_queried(&self, ctx: &RequestContext) -> bool {
        ctx.author_id.is_some()
    }

    fn queried_id(&self, ctx: &RequestContext) -> Option<RawId> {
        ctx.author_id.map(RawId::Int)
    }

    async fn link(&self, content: &dyn ContentSource, id: &RawId) -> Option<Url> {
        content.author_url(id.as_int()?).await
    }
}
