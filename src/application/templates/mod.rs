//! Template registry: polymorphic resolvers, one per content type.
//!
//! Each template maps a queried object to a stable `(type, object_id)` key
//! and back to a canonical public URL. Matching against a request walks a
//! fixed priority list; first match wins. Custom templates registered by
//! name extend the set without touching the built-ins.

mod author;
mod date_archive;
mod frontpage;
mod post;
mod post_type_archive;
mod term;

pub use author::AuthorTemplate;
pub use date_archive::DateArchiveTemplate;
pub use frontpage::FrontpageTemplate;
pub use post::PostTemplate;
pub use post_type_archive::PostTypeArchiveTemplate;
pub use term::TermTemplate;

use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::application::content::ContentSource;
use crate::application::error::PrerenderError;
use crate::domain::template::DateId;

/// A raw object identifier as supplied by the host or the render callback.
///
/// Numeric for posts/terms/authors; textual for post types and compact
/// dates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Int(i64),
    Text(String),
}

impl RawId {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            Self::Text(value) => value.parse().ok(),
        }
    }
}

impl Display for RawId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl From<i64> for RawId {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for RawId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for RawId {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// What the currently-rendering request resolved to, filled by the host.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub frontpage: bool,
    pub post_id: Option<i64>,
    pub term_id: Option<i64>,
    pub author_id: Option<i64>,
    pub post_type_archive: Option<String>,
    pub date_archive: Option<DateId>,
    /// True when the request carries the renderer's own cache-buster
    /// parameter; such a fetch must never be served cached HTML.
    pub renderer_fetch: bool,
}

#[async_trait]
pub trait Template: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the current request matches this template. Mutual exclusion
    /// across templates comes from the registry's check order.
    fn is_queried(&self, ctx: &RequestContext) -> bool;

    /// The natural identifier of the queried object, when this template
    /// matches.
    fn queried_id(&self, ctx: &RequestContext) -> Option<RawId>;

    /// Canonical `(storage type, object id)` pair for a raw identifier.
    ///
    /// The default maps a numeric id onto the plain template name, which
    /// covers every non-parametrised template.
    async fn type_id_pair(
        &self,
        _content: &dyn ContentSource,
        id: &RawId,
    ) -> Result<(String, i64), PrerenderError> {
        let object_id = id.as_int().ok_or_else(|| {
            PrerenderError::validation(format!(
                "`{id}` is not a numeric {} identifier",
                self.name()
            ))
        })?;
        Ok((self.name().to_string(), object_id))
    }

    /// Reverse-maps an id back to its canonical public URL. `None` is a hard
    /// failure signal that short-circuits any render dispatch.
    async fn link(&self, content: &dyn ContentSource, id: &RawId) -> Option<Url>;
}

pub struct TemplateRegistry {
    ordered: Vec<Arc<dyn Template>>,
    custom: HashMap<String, Arc<dyn Template>>,
}

impl TemplateRegistry {
    /// Registry with the built-in templates in their fixed priority order:
    /// frontpage > post-type-archive > term > post > author > date-archive.
    pub fn with_builtins() -> Self {
        Self {
            ordered: vec![
                Arc::new(FrontpageTemplate),
                Arc::new(PostTypeArchiveTemplate),
                Arc::new(TermTemplate),
                Arc::new(PostTemplate),
                Arc::new(AuthorTemplate),
                Arc::new(DateArchiveTemplate),
            ],
            custom: HashMap::new(),
        }
    }

    /// Registers a custom template, resolvable by name for scheduling and
    /// callbacks. Custom templates do not participate in request matching.
    pub fn register_custom(&mut self, template: Arc<dyn Template>) {
        self.custom.insert(template.name().to_string(), template);
    }

    pub fn find(&self, name: &str) -> Option<Arc<dyn Template>> {
        self.ordered
            .iter()
            .find(|template| template.name() == name)
            .or_else(|| self.custom.get(name))
            .cloned()
    }

    /// The first template matching the request, with its queried id.
    pub fn queried(&self, ctx: &RequestContext) -> Option<(Arc<dyn Template>, RawId)> {
        for template in &self.ordered {
            if template.is_queried(ctx) {
                let id = template.queried_id(ctx)?;
                return Some((template.clone(), id));
            }
        }
        None
    }

    /// Single canonicalization point shared by the scheduler and the
    /// callback handler. Unknown names are a validation error.
    pub async fn canonicalize(
        &self,
        name: &str,
        id: &RawId,
        content: &dyn ContentSource,
    ) -> Result<(String, i64), PrerenderError> {
        let template = self.find(name).ok_or_else(|| {
            PrerenderError::validation(format!("template `{name}` is not implemented"))
        })?;
        template.type_id_pair(content, id).await
    }
}
