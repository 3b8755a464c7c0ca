//! Version counters.
//!
//! A counter holds one opaque token per logical namespace. Bumping writes a
//! fresh token, which invalidates every entry stamped with the old one at
//! once without rewriting rows. Two named instances exist: one gating the
//! storage schema generation, one gating HTML validity.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{OptionsRepo, RepoError};

pub const DB_VERSION_OPTION: &str = "specchio_db_version";
pub const HTML_VERSION_OPTION: &str = "specchio_html_version";

pub struct VersionCounter {
    options: Arc<dyn OptionsRepo>,
    option: &'static str,
}

impl VersionCounter {
    pub fn new(options: Arc<dyn OptionsRepo>, option: &'static str) -> Self {
        Self { options, option }
    }

    /// The counter gating the storage schema generation.
    pub fn db(options: Arc<dyn OptionsRepo>) -> Self {
        Self::new(options, DB_VERSION_OPTION)
    }

    /// The counter gating HTML validity.
    pub fn html(options: Arc<dyn OptionsRepo>) -> Self {
        Self::new(options, HTML_VERSION_OPTION)
    }

    pub async fn current(&self) -> Result<Option<String>, RepoError> {
        self.options.get_option(self.option).await
    }

    /// Persists a fresh token, invalidating everything stamped with the old
    /// one.
    pub async fn bump(&self) -> Result<String, RepoError> {
        let token = Self::generate();
        self.options.set_option(self.option, &token).await?;
        Ok(token)
    }

    /// Bumps only when no token exists yet.
    pub async fn init(&self) -> Result<String, RepoError> {
        match self.current().await? {
            Some(token) => Ok(token),
            None => self.bump().await,
        }
    }

    pub fn generate() -> String {
        let mut hasher = Sha256::new();
        hasher.update(
            OffsetDateTime::now_utc()
                .unix_timestamp_nanos()
                .to_be_bytes(),
        );
        hasher.update(Uuid::new_v4().as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_are_hex_and_unique() {
        let first = VersionCounter::generate();
        let second = VersionCounter::generate();

        assert_eq!(first.len(), 64);
        assert!(first.bytes().all(|b| b.is_ascii_hexdigit()));
        assert_ne!(first, second);
    }
}
