use async_trait::async_trait;

use crate::application::repos::{OptionsRepo, RepoError};

use super::{PostgresRepositories, map_sqlx_error};

#[async_trait]
impl OptionsRepo for PostgresRepositories {
    async fn get_option(&self, name: &str) -> Result<Option<String>, RepoError> {
        sqlx::query_scalar::<_, String>("SELECT value FROM specchio_options WHERE name = $1")
            .bind(name)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)
    }

    async fn set_option(&self, name: &str, value: &str) -> Result<(), RepoError> {
        sqlx::query(
            "INSERT INTO specchio_options (name, value) VALUES ($1, $2) \
             ON CONFLICT (name) DO UPDATE SET value = EXCLUDED.value",
        )
        .bind(name)
        .bind(value)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }
}
