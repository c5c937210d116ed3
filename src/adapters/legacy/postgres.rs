//! PostgreSQL reader for the legacy billing database

use super::query::LegacyQuery;
use super::traits::LegacyStore;
use crate::config::LegacyConfig;
use crate::domain::{LegacyRecord, LegacyStoreError, MigrationError, Result};
use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod, Runtime};
use secrecy::ExposeSecret;
use std::time::Duration;
use tokio_postgres::NoTls;

/// Pooled read-only client for the legacy schema
pub struct PostgresLegacyStore {
    pool: Pool,
    database: String,
}

impl PostgresLegacyStore {
    /// Create a new legacy store from the validated settings payload
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be built.
    pub fn new(config: &LegacyConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.connection_timeout_seconds);

        let mut pg_config = tokio_postgres::Config::new();
        pg_config
            .host(&config.host)
            .port(config.port)
            .dbname(&config.database)
            .user(&config.user)
            .password(config.password.expose_secret().as_bytes())
            .application_name("billing-migrator")
            .connect_timeout(timeout);

        let manager = Manager::from_config(
            pg_config,
            NoTls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );

        let pool = Pool::builder(manager)
            .max_size(config.max_connections)
            .runtime(Runtime::Tokio1)
            .wait_timeout(Some(timeout))
            .create_timeout(Some(timeout))
            .build()
            .map_err(|e| {
                LegacyStoreError::ConnectionFailed(format!(
                    "Failed to create connection pool: {}",
                    e
                ))
            })?;

        Ok(Self {
            pool,
            database: config.database.clone(),
        })
    }

    async fn connection(&self) -> Result<deadpool_postgres::Object> {
        self.pool.get().await.map_err(|e| {
            MigrationError::from(LegacyStoreError::ConnectionFailed(format!(
                "Failed to get connection from pool: {}",
                e
            )))
        })
    }
}

#[async_trait]
impl LegacyStore for PostgresLegacyStore {
    async fn fetch(&self, query: LegacyQuery) -> Result<Vec<LegacyRecord>> {
        let client = self.connection().await?;
        let statement = query.statement();

        let rows = client.query(statement.as_str(), &[]).await.map_err(|e| {
            LegacyStoreError::QueryFailed {
                query: query.name().to_string(),
                message: e.to_string(),
            }
        })?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let value: serde_json::Value = row.try_get(0).map_err(|e| {
                LegacyStoreError::InvalidRow(format!("{}: {}", query.name(), e))
            })?;
            records.push(LegacyRecord::from(value));
        }

        tracing::debug!(query = %query, rows = records.len(), "Fetched legacy rows");
        Ok(records)
    }

    async fn test_connection(&self) -> Result<()> {
        let client = self.connection().await?;
        client.query_one("SELECT 1", &[]).await.map_err(|e| {
            LegacyStoreError::ConnectionFailed(format!("Connection test failed: {}", e))
        })?;
        tracing::info!(database = %self.database, "Legacy connection test successful");
        Ok(())
    }

    fn name(&self) -> &str {
        "postgresql-legacy"
    }
}
