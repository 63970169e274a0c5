use std::str::FromStr;
use std::time::Duration;

use backon::{BackoffBuilder, ConstantBuilder};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::{
    config::DatabaseConfig,
    error::{AppError, Result},
};

/// Snapshot of the pool for the health endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseStatus {
    pub is_connected: bool,
    pub pool_size: u32,
    pub idle: usize,
}

/// Owns the connection pool for the lifetime of the process. Created by the
/// entry point and closed on shutdown.
#[derive(Clone)]
pub struct DatabaseManager {
    pool: SqlitePool,
}

impl DatabaseManager {
    /// Connects with a bounded number of retries spaced by the configured
    /// interval. The database file is created when missing.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| AppError::Database(format!("Invalid database url: {}", e)))?
            .create_if_missing(true)
            .foreign_keys(true);

        let retries = ConstantBuilder::default()
            .with_delay(Duration::from_secs(config.retry_interval_secs))
            .with_max_times(config.connect_retries as usize)
            .build();

        let mut last_error = None;

        for (attempt, delay) in std::iter::once(Duration::ZERO).chain(retries).enumerate() {
            if attempt > 0 {
                tokio::time::sleep(delay).await;
            }

            match SqlitePoolOptions::new()
                .max_connections(config.max_connections)
                .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
                .connect_with(options.clone())
                .await
            {
                Ok(pool) => {
                    tracing::info!(attempt = attempt + 1, "Connected to database");
                    return Ok(Self { pool });
                }
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries = config.connect_retries,
                        error = %e,
                        "Database connection failed"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(AppError::Database(format!(
            "Could not connect after {} attempts: {}",
            config.connect_retries + 1,
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )))
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::Database(format!("Migration failed: {}", e)))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn status(&self) -> DatabaseStatus {
        DatabaseStatus {
            is_connected: !self.pool.is_closed(),
            pool_size: self.pool.size(),
            idle: self.pool.num_idle(),
        }
    }

    /// Round-trips a trivial query.
    pub async fn ping(&self) -> bool {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }

    pub async fn close(&self) {
        if !self.pool.is_closed() {
            self.pool.close().await;
            tracing::info!("Database connections closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_config() -> DatabaseConfig {
        DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            connect_retries: 0,
            retry_interval_secs: 0,
            acquire_timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn test_connect_migrate_and_close() {
        let db = DatabaseManager::connect(&memory_config()).await.unwrap();
        db.migrate().await.unwrap();

        assert!(db.ping().await);
        assert!(db.status().is_connected);

        db.close().await;
        assert!(!db.status().is_connected);
        assert!(!db.ping().await);
    }

    #[tokio::test]
    async fn test_invalid_url_is_rejected() {
        let config = DatabaseConfig { url: "postgres://nope".to_string(), ..memory_config() };
        assert!(DatabaseManager::connect(&config).await.is_err());
    }
}
