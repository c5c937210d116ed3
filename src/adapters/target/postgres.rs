//! PostgreSQL writer for the target billing schema
//!
//! Rows are exchanged as JSON: inserts and filters go through
//! `json_populate_record` against the table's own row type and reads come
//! back through `to_jsonb`, so no per-column type mapping is needed here.
//! A single dedicated connection is used so a transaction spans every
//! statement issued between `begin` and `commit`.

use super::traits::TargetStore;
use crate::config::TargetConfig;
use crate::domain::{MigrationError, Result, TargetId, TargetRow, TargetStoreError};
use async_trait::async_trait;
use secrecy::ExposeSecret;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio_postgres::error::SqlState;
use tokio_postgres::{Client, NoTls};

pub struct PostgresTargetStore {
    client: Client,
    in_transaction: AtomicBool,
}

impl PostgresTargetStore {
    /// Connect to the target database
    ///
    /// # Errors
    ///
    /// Returns an error if the connection string is invalid or the connection fails.
    pub async fn connect(config: &TargetConfig) -> Result<Self> {
        let mut pg_config: tokio_postgres::Config = config
            .connection_string
            .expose_secret()
            .as_ref()
            .parse()
            .map_err(|e| {
                MigrationError::Configuration(format!(
                    "Invalid target connection string: {}",
                    e
                ))
            })?;
        pg_config
            .application_name("billing-migrator")
            .connect_timeout(Duration::from_secs(config.connection_timeout_seconds));

        let (client, connection) = pg_config
            .connect(NoTls)
            .await
            .map_err(|e| TargetStoreError::ConnectionFailed(e.to_string()))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(error = %e, "Target connection closed with error");
            }
        });

        client
            .batch_execute(&format!(
                "SET statement_timeout = {}",
                config.statement_timeout_seconds * 1000
            ))
            .await
            .map_err(|e| {
                TargetStoreError::ConnectionFailed(format!(
                    "Failed to set statement timeout: {}",
                    e
                ))
            })?;

        tracing::info!("Target connection established");

        Ok(Self {
            client,
            in_transaction: AtomicBool::new(false),
        })
    }

    /// Create the target tables when they do not exist yet
    pub async fn ensure_schema(&self) -> Result<()> {
        let schema_sql = include_str!("../../../migrations/001_target_schema.sql");
        self.client
            .batch_execute(schema_sql)
            .await
            .map_err(|e| TargetStoreError::QueryFailed {
                table: "schema".to_string(),
                message: e.to_string(),
            })?;
        tracing::info!("Target schema ensured");
        Ok(())
    }

    async fn transaction_command(&self, command: &str) -> Result<()> {
        self.client
            .batch_execute(command)
            .await
            .map_err(|e| TargetStoreError::TransactionFailed(format!("{command}: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl TargetStore for PostgresTargetStore {
    async fn insert(&self, table: &str, row: &TargetRow) -> Result<TargetId> {
        let table_ident = quote_identifier(table)?;
        let columns = quoted_columns(row)?;

        let sql = if columns.is_empty() {
            format!("INSERT INTO {table_ident} DEFAULT VALUES RETURNING id")
        } else {
            let list = columns.join(", ");
            format!(
                "INSERT INTO {table_ident} ({list}) \
                 SELECT {list} FROM json_populate_record(NULL::{table_ident}, $1::json) \
                 RETURNING id"
            )
        };

        let payload = row.to_json();
        let result = if columns.is_empty() {
            self.client.query_one(sql.as_str(), &[]).await
        } else {
            self.client.query_one(sql.as_str(), &[&payload]).await
        };

        let inserted = result.map_err(|e| {
            write_error(table, e, |table, message| TargetStoreError::InsertFailed {
                table,
                message,
            })
        })?;

        let id: i64 = inserted.try_get(0).map_err(|e| TargetStoreError::InsertFailed {
            table: table.to_string(),
            message: format!("missing generated id: {e}"),
        })?;
        Ok(TargetId::new(id))
    }

    async fn update(&self, table: &str, values: &TargetRow, filter: &TargetRow) -> Result<u64> {
        if values.is_empty() {
            return Ok(0);
        }
        let table_ident = quote_identifier(table)?;
        let assignments = quoted_columns(values)?
            .into_iter()
            .map(|column| format!("{column} = v.{column}"))
            .collect::<Vec<_>>()
            .join(", ");
        let predicate = filter_predicate("t", "f", filter)?;

        let sql = format!(
            "UPDATE {table_ident} AS t SET {assignments} \
             FROM json_populate_record(NULL::{table_ident}, $1::json) v, \
             json_populate_record(NULL::{table_ident}, $2::json) f \
             WHERE {predicate}"
        );

        let values_json = values.to_json();
        let filter_json = filter.to_json();
        self.client
            .execute(sql.as_str(), &[&values_json, &filter_json])
            .await
            .map_err(|e| {
                write_error(table, e, |table, message| TargetStoreError::UpdateFailed {
                    table,
                    message,
                })
            })
    }

    async fn select(&self, table: &str, filter: &TargetRow) -> Result<Vec<TargetRow>> {
        let table_ident = quote_identifier(table)?;
        let predicate = filter_predicate("t", "f", filter)?;
        let sql = format!(
            "SELECT to_jsonb(t) FROM {table_ident} t, \
             json_populate_record(NULL::{table_ident}, $1::json) f \
             WHERE {predicate} ORDER BY t.id"
        );

        let filter_json = filter.to_json();
        let rows = self
            .client
            .query(sql.as_str(), &[&filter_json])
            .await
            .map_err(|e| TargetStoreError::QueryFailed {
                table: table.to_string(),
                message: e.to_string(),
            })?;

        rows.iter()
            .map(|row| {
                row.try_get::<_, serde_json::Value>(0)
                    .map(TargetRow::from)
                    .map_err(|e| {
                        MigrationError::from(TargetStoreError::QueryFailed {
                            table: table.to_string(),
                            message: e.to_string(),
                        })
                    })
            })
            .collect()
    }

    async fn begin(&self) -> Result<()> {
        if self.in_transaction.swap(true, Ordering::SeqCst) {
            return Err(TargetStoreError::TransactionFailed(
                "a transaction is already open".to_string(),
            )
            .into());
        }
        if let Err(e) = self.transaction_command("BEGIN").await {
            self.in_transaction.store(false, Ordering::SeqCst);
            return Err(e);
        }
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        self.in_transaction.store(false, Ordering::SeqCst);
        self.transaction_command("COMMIT").await
    }

    async fn rollback(&self) -> Result<()> {
        self.in_transaction.store(false, Ordering::SeqCst);
        self.transaction_command("ROLLBACK").await
    }

    fn name(&self) -> &str {
        "postgresql-target"
    }
}

/// Maps unique violations to `Conflict`, everything else through `fallback`
fn write_error(
    table: &str,
    error: tokio_postgres::Error,
    fallback: impl FnOnce(String, String) -> TargetStoreError,
) -> MigrationError {
    if let Some(db_error) = error.as_db_error() {
        if *db_error.code() == SqlState::UNIQUE_VIOLATION {
            return TargetStoreError::Conflict {
                table: db_error.table().unwrap_or(table).to_string(),
                column: db_error.constraint().unwrap_or("unique").to_string(),
                value: db_error.detail().unwrap_or_default().to_string(),
            }
            .into();
        }
    }
    fallback(table.to_string(), error.to_string()).into()
}

fn filter_predicate(row_alias: &str, filter_alias: &str, filter: &TargetRow) -> Result<String> {
    let columns = quoted_columns(filter)?;
    if columns.is_empty() {
        return Ok("TRUE".to_string());
    }
    Ok(columns
        .iter()
        .map(|column| format!("{row_alias}.{column} IS NOT DISTINCT FROM {filter_alias}.{column}"))
        .collect::<Vec<_>>()
        .join(" AND "))
}

fn quoted_columns(row: &TargetRow) -> Result<Vec<String>> {
    row.columns().map(|c| quote_identifier(c)).collect()
}

/// Table and column names are restricted to lowercase snake case
fn quote_identifier(name: &str) -> Result<String> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if !valid_start || !valid_rest {
        return Err(TargetStoreError::InvalidIdentifier(name.to_string()).into());
    }
    Ok(format!("\"{name}\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("invoice_lines").unwrap(), "\"invoice_lines\"");
        assert!(quote_identifier("users; DROP TABLE users").is_err());
        assert!(quote_identifier("1abc").is_err());
        assert!(quote_identifier("").is_err());
    }

    #[test]
    fn test_filter_predicate() {
        let filter = TargetRow::new().with("invoice_id", 3).with("transaction_id", 9);
        let predicate = filter_predicate("t", "f", &filter).unwrap();
        assert_eq!(
            predicate,
            "t.\"invoice_id\" IS NOT DISTINCT FROM f.\"invoice_id\" AND \
             t.\"transaction_id\" IS NOT DISTINCT FROM f.\"transaction_id\""
        );
        assert_eq!(filter_predicate("t", "f", &TargetRow::new()).unwrap(), "TRUE");
    }
}
