//! The entry store: a read-through cache over the durable entry table.
//!
//! Reads are fronted by an in-process LRU keyed on `(type, object_id)`;
//! every write path invalidates the cached key before returning, so a
//! subsequent read observes the durable row.

use std::num::NonZeroUsize;
use std::sync::{Arc, RwLock};

use lru::LruCache;
use metrics::counter;

use crate::application::repos::{EntriesRepo, RepoError};
use crate::domain::entry::EntryRecord;

use super::lock::rw_write;

const SOURCE: &str = "cache::store";

pub struct EntryStore {
    repo: Arc<dyn EntriesRepo>,
    read_cache: RwLock<LruCache<(String, i64), EntryRecord>>,
}

impl EntryStore {
    pub fn new(repo: Arc<dyn EntriesRepo>, read_cache_capacity: NonZeroUsize) -> Self {
        Self {
            repo,
            read_cache: RwLock::new(LruCache::new(read_cache_capacity)),
        }
    }

    /// Read-through lookup. `None` when no row exists.
    pub async fn get(&self, kind: &str, object_id: i64) -> Result<Option<EntryRecord>, RepoError> {
        let key = (kind.to_string(), object_id);

        if let Some(hit) = rw_write(&self.read_cache, SOURCE, "get").get(&key).cloned() {
            counter!("specchio_entry_cache_hit_total").increment(1);
            return Ok(Some(hit));
        }
        counter!("specchio_entry_cache_miss_total").increment(1);

        let row = self.repo.find(kind, object_id).await?;
        if let Some(row) = &row {
            rw_write(&self.read_cache, SOURCE, "get.populate").put(key, row.clone());
        }

        Ok(row)
    }

    /// Upsert: insert when absent, otherwise replace html/version in place.
    pub async fn save(
        &self,
        html: &str,
        version: &str,
        kind: &str,
        object_id: i64,
    ) -> Result<EntryRecord, RepoError> {
        let record = self.repo.upsert(html, version, kind, object_id).await?;
        self.invalidate(kind, object_id);
        Ok(record)
    }

    /// Removes the row, reporting whether one existed.
    pub async fn delete(&self, kind: &str, object_id: i64) -> Result<bool, RepoError> {
        let existed = self.repo.delete(kind, object_id).await?;
        self.invalidate(kind, object_id);
        Ok(existed)
    }

    /// Empties the row without deleting it. The emptied row reads back with
    /// no html and no version, so it can never be served as fresh. Absent
    /// keys stay absent: rows only come into existence on a successful
    /// write-back.
    pub async fn clear(&self, kind: &str, object_id: i64) -> Result<Option<EntryRecord>, RepoError> {
        if self.get(kind, object_id).await?.is_none() {
            return Ok(None);
        }
        self.save("", "", kind, object_id).await.map(Some)
    }

    fn invalidate(&self, kind: &str, object_id: i64) {
        rw_write(&self.read_cache, SOURCE, "invalidate").pop(&(kind.to_string(), object_id));
    }
}
