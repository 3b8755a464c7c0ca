//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::domain::entry::EntryRecord;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Durable storage for prerender entries, one row per `(type, object_id)`.
#[async_trait]
pub trait EntriesRepo: Send + Sync {
    async fn find(&self, kind: &str, object_id: i64) -> Result<Option<EntryRecord>, RepoError>;

    /// Single-statement upsert: insert when absent, otherwise replace
    /// html/version and touch `updated`. Last writer wins.
    async fn upsert(
        &self,
        html: &str,
        version: &str,
        kind: &str,
        object_id: i64,
    ) -> Result<EntryRecord, RepoError>;

    /// Removes the row, reporting whether one existed.
    async fn delete(&self, kind: &str, object_id: i64) -> Result<bool, RepoError>;
}

/// Durable storage for one-time render secrets.
///
/// Secrets are written straight to the durable store, never through a
/// volatile cache layer, so their expiry is reliable.
#[async_trait]
pub trait SecretsRepo: Send + Sync {
    /// Stores a secret hash, replacing any prior secret for the same key.
    async fn put(
        &self,
        template: &str,
        id: &str,
        hash: &[u8],
        expires: OffsetDateTime,
    ) -> Result<(), RepoError>;

    /// Returns the stored hash when present and unexpired at `now`.
    async fn find(
        &self,
        template: &str,
        id: &str,
        now: OffsetDateTime,
    ) -> Result<Option<Vec<u8>>, RepoError>;

    async fn delete(&self, template: &str, id: &str) -> Result<bool, RepoError>;

    /// Garbage-collects expired rows, returning how many were removed.
    async fn delete_expired(&self, now: OffsetDateTime) -> Result<u64, RepoError>;

    async fn delete_all(&self) -> Result<u64, RepoError>;
}

/// Named singleton values: version tokens and similar process-wide state.
#[async_trait]
pub trait OptionsRepo: Send + Sync {
    async fn get_option(&self, name: &str) -> Result<Option<String>, RepoError>;

    async fn set_option(&self, name: &str, value: &str) -> Result<(), RepoError>;
}
