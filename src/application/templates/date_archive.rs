use async_trait::async_trait;
use url::Url;

use crate::application::content::ContentSource;
use crate::application::error::PrerenderError;
use crate::domain::template::{DateId, TemplateKey, TemplateKind};

use super::{RawId, RequestContext, Template};

/// Year, month and day archives.
///
/// The compact date is folded into the storage type string and mirrored into
/// the object id, so distinct dates never share a key.
pub struct DateArchiveTemplate;

#[async_trait]
impl Template for DateArchiveTemplate {
    fn name(&self) -> &'static str {
        TemplateKind::DateArchive.as_str()
    }

    fn is_queried(&self, ctx: &RequestContext) -> bool {
        ctx.date_archive.is_some()
    }

    fn queried_id(&self, ctx: &RequestContext) -> Option<RawId> {
        ctx.date_archive.map(|date| RawId::Text(date.compact()))
    }

    async fn type_id_pair(
        &self,
        _content: &dyn ContentSource,
        id: &RawId,
    ) -> Result<(String, i64), PrerenderError> {
        let date = DateId::parse(&id.to_string())?;
        let key = TemplateKey::with_subtype(self.name(), date.compact());
        Ok((key.storage_type(), date.object_id()))
    }

    async fn link(&self, content: &dyn ContentSource, id: &RawId) -> Option<Url> {
        let date = DateId::parse(&id.to_string()).ok()?;
        content.date_archive_url(&date).await
    }
}
