use async_trait::async_trait;
use url::Url;

use crate::application::content::ContentSource;
use crate::application::error::PrerenderError;
use crate::domain::template::TemplateKind;

use super::{RawId, RequestContext, Template};

/// The site frontpage. There is exactly one; its object id is always 0.
pub struct FrontpageTemplate;

#[async_trait]
impl Template for FrontpageTemplate {
    fn name(&self) -> &'static str {
        TemplateKind::Frontpage.as_str()
    }

    fn is_queried(&self, ctx: &RequestContext) -> bool {
        ctx.frontpage
    }

    fn queried_id(&self, _ctx: &RequestContext) -> Option<RawId> {
        Some(RawId::Int(0))
    }

    async fn type_id_pair(
        &self,
        _content: &dyn ContentSource,
        _id: &RawId,
    ) -> Result<(String, i64), PrerenderError> {
        Ok((self.name().to_string(), 0))
    }

    async fn link(&self, content: &dyn ContentSource, _id: &RawId) -> Option<Url> {
        Some(content.home_url().await)
    }
}
