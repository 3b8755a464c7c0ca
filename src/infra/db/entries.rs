use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    application::repos::{EntriesRepo, RepoError},
    domain::entry::EntryRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct EntryRow {
    id: i64,
    #[sqlx(rename = "type")]
    kind: String,
    object_id: i64,
    html: String,
    version: String,
    created: OffsetDateTime,
    updated: OffsetDateTime,
}

impl From<EntryRow> for EntryRecord {
    fn from(row: EntryRow) -> Self {
        Self {
            id: row.id,
            kind: row.kind,
            object_id: row.object_id,
            html: row.html,
            version: row.version,
            created: row.created,
            updated: row.updated,
        }
    }
}

#[async_trait]
impl EntriesRepo for PostgresRepositories {
    async fn find(&self, kind: &str, object_id: i64) -> Result<Option<EntryRecord>, RepoError> {
        let sql = format!(
            "SELECT id, type, object_id, html, version, created, updated \
             FROM {} WHERE type = $1 AND object_id = $2",
            self.entries_table()
        );

        let row = sqlx::query_as::<_, EntryRow>(&sql)
            .bind(kind)
            .bind(object_id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(EntryRecord::from))
    }

    async fn upsert(
        &self,
        html: &str,
        version: &str,
        kind: &str,
        object_id: i64,
    ) -> Result<EntryRecord, RepoError> {
        let sql = format!(
            "INSERT INTO {} (type, object_id, html, version, created, updated) \
             VALUES ($1, $2, $3, $4, now(), now()) \
             ON CONFLICT (type, object_id) DO UPDATE \
             SET html = EXCLUDED.html, version = EXCLUDED.version, updated = now() \
             RETURNING id, type, object_id, html, version, created, updated",
            self.entries_table()
        );

        let row = sqlx::query_as::<_, EntryRow>(&sql)
            .bind(kind)
            .bind(object_id)
            .bind(html)
            .bind(version)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(EntryRecord::from(row))
    }

    async fn delete(&self, kind: &str, object_id: i64) -> Result<bool, RepoError> {
        let sql = format!(
            "DELETE FROM {} WHERE type = $1 AND object_id = $2",
            self.entries_table()
        );

        let result = sqlx::query(&sql)
            .bind(kind)
            .bind(object_id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}
