// /////////////////////////////////////////////////////////////////////////////
// Object Vault
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! SQLite schema bootstrap and pool construction for the Metadata Store
//! (§4.5), following the teacher's `infrastructure::repositories::schema`
//! create-then-migrate pattern plus the spec's startup retry policy.

use std::time::Duration;

use sqlx::migrate::MigrateDatabase;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Sqlite, SqlitePool};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct MetadataStoreConfig {
    pub database_url: String,
    pub min_connections: u32,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub startup_retry_attempts: u32,
    pub startup_retry_delay: Duration,
    pub reset_schema: bool,
}

impl Default for MetadataStoreConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://objectvault.db".into(),
            min_connections: 5,
            max_connections: 20,
            acquire_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(5 * 60),
            startup_retry_attempts: 5,
            startup_retry_delay: Duration::from_secs(2),
            reset_schema: false,
        }
    }
}

/// Connects with the configured pool parameters, retrying on failure up
/// to `startup_retry_attempts` times with a fixed delay, so the service
/// tolerates a not-yet-ready database on startup.
pub async fn connect_with_retry(config: &MetadataStoreConfig) -> Result<SqlitePool, sqlx::Error> {
    if !Sqlite::database_exists(&config.database_url).await.unwrap_or(false) {
        debug!(url = %config.database_url, "database does not exist, creating");
        Sqlite::create_database(&config.database_url).await?;
    }

    let mut attempt = 0;
    loop {
        attempt += 1;
        match SqlitePoolOptions::new()
            .min_connections(config.min_connections)
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(config.idle_timeout)
            .connect(&config.database_url)
            .await
        {
            Ok(pool) => {
                if config.reset_schema {
                    warn!("reset_schema set, dropping existing tables before migrating");
                    sqlx::query("DROP TABLE IF EXISTS chunks").execute(&pool).await?;
                    sqlx::query("DROP TABLE IF EXISTS files").execute(&pool).await?;
                    sqlx::query("DROP TABLE IF EXISTS audit_log").execute(&pool).await?;
                }
                sqlx::migrate!("./migrations").run(&pool).await?;
                info!("metadata store schema is up to date");
                return Ok(pool);
            }
            Err(e) if attempt < config.startup_retry_attempts => {
                warn!(attempt, error = %e, "metadata store not ready, retrying");
                tokio::time::sleep(config.startup_retry_delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
