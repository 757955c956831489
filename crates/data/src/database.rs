use affiliate_core::{BackingStore, DatabaseConfig};
use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::repositories::Repositories;

pub struct DatabaseClient {
    pool: PgPool,
}

impl DatabaseClient {
    /// Creates a new database client connected to the specified `PostgreSQL` database.
    ///
    /// # Errors
    /// Returns an error if the database connection cannot be established.
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("Failed to connect to PostgreSQL")?;
        Ok(Self { pool })
    }

    /// Creates a client from the `[database]` configuration section.
    ///
    /// # Errors
    /// Returns an error if the database connection cannot be established.
    pub async fn from_config(config: &DatabaseConfig) -> Result<Self> {
        tracing::info!(max_connections = config.max_connections, "Connecting to database");
        Self::new(&config.url, config.max_connections).await
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    #[must_use]
    pub fn repositories(&self) -> Repositories {
        Repositories::new(self.pool.clone())
    }

    /// Engine-facing handles backed by this pool.
    #[must_use]
    pub fn backing_store(&self) -> BackingStore {
        self.repositories().backing_store()
    }

    /// Issues a trivial query to confirm the pool can reach the server.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
