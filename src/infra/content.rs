//! Pattern-based content source for sidecar deployments.
//!
//! When specchio runs beside a host CMS rather than inside it, public URLs
//! are derived from configured path patterns instead of live permalink
//! lookups. Placeholders: `{id}` for object ids, `{year}`/`{month}`/`{day}`
//! for date archives.

use async_trait::async_trait;
use url::Url;

use crate::application::content::ContentSource;
use crate::config::SiteSettings;
use crate::domain::template::DateId;

pub struct ConfiguredContent {
    site: SiteSettings,
}

impl ConfiguredContent {
    pub fn new(site: SiteSettings) -> Self {
        Self { site }
    }

    fn resolve(&self, path: &str) -> Option<Url> {
        self.site.home_url.join(path).ok()
    }
}

#[async_trait]
impl ContentSource for ConfiguredContent {
    async fn home_url(&self) -> Url {
        self.site.home_url.clone()
    }

    async fn post_url(&self, post_id: i64) -> Option<Url> {
        self.resolve(&self.site.post_path.replace("{id}", &post_id.to_string()))
    }

    async fn author_url(&self, author_id: i64) -> Option<Url> {
        self.resolve(&self.site.author_path.replace("{id}", &author_id.to_string()))
    }

    async fn term_url(&self, term_id: i64) -> Option<Url> {
        self.resolve(&self.site.term_path.replace("{id}", &term_id.to_string()))
    }

    async fn post_type_archive_url(&self, post_type: &str) -> Option<Url> {
        let post_type = self
            .site
            .post_types
            .iter()
            .find(|candidate| candidate.name == post_type)?;
        self.resolve(post_type.archive_path.as_deref()?)
    }

    async fn date_archive_url(&self, date: &DateId) -> Option<Url> {
        let pattern = match (date.month, date.day) {
            (Some(_), Some(_)) => &self.site.day_path,
            (Some(_), None) => &self.site.month_path,
            _ => &self.site.year_path,
        };

        let mut path = pattern.replace("{year}", &format!("{:04}", date.year));
        if let Some(month) = date.month {
            path = path.replace("{month}", &format!("{month:02}"));
        }
        if let Some(day) = date.day {
            path = path.replace("{day}", &format!("{day:02}"));
        }

        self.resolve(&path)
    }

    async fn post_type_exists(&self, post_type: &str) -> bool {
        self.site
            .post_types
            .iter()
            .any(|candidate| candidate.name == post_type)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::PostTypeSettings;

    use super::*;

    fn site() -> SiteSettings {
        SiteSettings {
            home_url: Url::parse("https://example.test/").expect("home url"),
            post_path: "?p={id}".to_string(),
            author_path: "author/{id}/".to_string(),
            term_path: "term/{id}/".to_string(),
            year_path: "{year}/".to_string(),
            month_path: "{year}/{month}/".to_string(),
            day_path: "{year}/{month}/{day}/".to_string(),
            post_types: vec![
                PostTypeSettings {
                    name: "post".to_string(),
                    archive_path: None,
                },
                PostTypeSettings {
                    name: "product".to_string(),
                    archive_path: Some("products/".to_string()),
                },
            ],
        }
    }

    #[tokio::test]
    async fn substitutes_object_ids() {
        let content = ConfiguredContent::new(site());

        let post = content.post_url(7).await.expect("post url");
        assert_eq!(post.as_str(), "https://example.test/?p=7");

        let author = content.author_url(3).await.expect("author url");
        assert_eq!(author.as_str(), "https://example.test/author/3/");
    }

    #[tokio::test]
    async fn archive_url_requires_configured_path() {
        let content = ConfiguredContent::new(site());

        assert!(content.post_type_archive_url("post").await.is_none());
        assert_eq!(
            content
                .post_type_archive_url("product")
                .await
                .expect("archive url")
                .as_str(),
            "https://example.test/products/"
        );
        assert!(content.post_type_archive_url("gadget").await.is_none());
    }

    #[tokio::test]
    async fn date_archives_pad_month_and_day() {
        let content = ConfiguredContent::new(site());

        let day = content
            .date_archive_url(&DateId::of_day(2024, 3, 5))
            .await
            .expect("day url");
        assert_eq!(day.as_str(), "https://example.test/2024/03/05/");

        let year = content
            .date_archive_url(&DateId::of_year(2024))
            .await
            .expect("year url");
        assert_eq!(year.as_str(), "https://example.test/2024/");
    }
}
