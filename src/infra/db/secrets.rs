use async_trait::async_trait;
use time::OffsetDateTime;

use crate::application::repos::{RepoError, SecretsRepo};

use super::{PostgresRepositories, map_sqlx_error};

#[async_trait]
impl SecretsRepo for PostgresRepositories {
    async fn put(
        &self,
        template: &str,
        id: &str,
        hash: &[u8],
        expires: OffsetDateTime,
    ) -> Result<(), RepoError> {
        sqlx::query(
            "INSERT INTO specchio_secrets (template, id, hash, expires) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (template, id) DO UPDATE \
             SET hash = EXCLUDED.hash, expires = EXCLUDED.expires",
        )
        .bind(template)
        .bind(id)
        .bind(hash)
        .bind(expires)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn find(
        &self,
        template: &str,
        id: &str,
        now: OffsetDateTime,
    ) -> Result<Option<Vec<u8>>, RepoError> {
        sqlx::query_scalar::<_, Vec<u8>>(
            "SELECT hash FROM specchio_secrets \
             WHERE template = $1 AND id = $2 AND expires > $3",
        )
        .bind(template)
        .bind(id)
        .bind(now)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn delete(&self, template: &str, id: &str) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM specchio_secrets WHERE template = $1 AND id = $2")
            .bind(template)
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_expired(&self, now: OffsetDateTime) -> Result<u64, RepoError> {
        let result = sqlx::query("DELETE FROM specchio_secrets WHERE expires <= $1")
            .bind(now)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn delete_all(&self) -> Result<u64, RepoError> {
        let result = sqlx::query("DELETE FROM specchio_secrets")
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }
}
