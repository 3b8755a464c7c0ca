use async_trait::async_trait;
use url::Url;

use crate::application::content::ContentSource;
use crate::domain::template::TemplateKind;

use super::{RawId, RequestContext, Template};

/// A taxonomy term listing, keyed by the term's numeric id.
pub struct TermTemplate;

#[async_trait]
impl Template for TermTemplate {
    fn name(&self) -> &'static str {
        TemplateKind::Term.as_str()
    }

    fn is_queried(&self, ctx: &RequestContext) -> bool {
        ctx.term_id.is_some()
    }

    fn queried_id(&self, ctx: &RequestContext) -> Option<RawId> {
        ctx.term_id.map(RawId::Int)
    }

    async fn link(&self, content: &dyn ContentSource, id: &RawId) -> Option<Url> {
        content.term_url(id.as_int()?).await
    }
}
