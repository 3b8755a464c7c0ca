//! Postgres-backed repository implementations.

mod entries;
mod options;
mod secrets;

use std::sync::Arc;

use sqlx::{
    postgres::{PgPool, PgPoolOptions},
    query,
};

use crate::application::repos::RepoError;

pub(crate) fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    RepoError::from_persistence(err)
}

#[derive(Clone)]
pub struct PostgresRepositories {
    pool: Arc<PgPool>,
    entries_table: String,
}

impl PostgresRepositories {
    pub fn new(pool: PgPool, entries_table: impl Into<String>) -> Self {
        Self {
            pool: Arc::new(pool),
            entries_table: entries_table.into(),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub(crate) fn entries_table(&self) -> &str {
        &self.entries_table
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        query("SELECT 1").execute(self.pool()).await.map(|_| ())
    }
}
