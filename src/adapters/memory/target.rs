//! In-memory target store
//!
//! Used for dry runs and tests. Generated ids are per-table sequences
//! starting at 1, unique keys are enforced like the real schema, and
//! transactions are implemented with a snapshot taken on `begin`.

use crate::adapters::target::TargetStore;
use crate::domain::{Result, TargetId, TargetRow, TargetStoreError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, Default)]
struct Tables {
    rows: BTreeMap<String, Vec<TargetRow>>,
    sequences: BTreeMap<String, i64>,
}

#[derive(Debug, Default)]
struct State {
    tables: Tables,
    snapshot: Option<Tables>,
}

/// Unique keys mirrored from `migrations/001_target_schema.sql`
const DEFAULT_UNIQUE_KEYS: &[(&str, &[&str])] = &[
    ("users", &["username"]),
    ("currencies", &["code", "company_id"]),
    ("transaction_applied", &["transaction_id", "invoice_id"]),
    ("company_settings", &["key", "company_id"]),
    ("client_settings", &["client_id", "key"]),
    ("modules", &["class", "company_id"]),
];

pub struct MemoryTargetStore {
    state: Mutex<State>,
    unique_keys: Vec<(String, Vec<String>)>,
}

impl MemoryTargetStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            unique_keys: DEFAULT_UNIQUE_KEYS
                .iter()
                .map(|(table, columns)| {
                    (
                        table.to_string(),
                        columns.iter().map(|c| c.to_string()).collect(),
                    )
                })
                .collect(),
        }
    }

    /// Enforce an extra unique key on `table`
    pub fn with_unique_key(mut self, table: &str, columns: &[&str]) -> Self {
        self.unique_keys.push((
            table.to_string(),
            columns.iter().map(|c| c.to_string()).collect(),
        ));
        self
    }

    /// All rows of a table in insertion order
    pub fn rows(&self, table: &str) -> Vec<TargetRow> {
        self.lock()
            .tables
            .rows
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// Row counts per table, for dry-run reports
    pub fn table_counts(&self) -> BTreeMap<String, usize> {
        self.lock()
            .tables
            .rows
            .iter()
            .map(|(table, rows)| (table.clone(), rows.len()))
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A poisoned lock only means a panicking test thread; the data is still usable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_unique(&self, tables: &Tables, table: &str, row: &TargetRow) -> Result<()> {
        let existing = match tables.rows.get(table) {
            Some(rows) => rows,
            None => return Ok(()),
        };

        for (_, columns) in self.unique_keys.iter().filter(|(t, _)| t == table) {
            let key: Vec<&Value> = columns
                .iter()
                .map(|c| row.get(c).unwrap_or(&Value::Null))
                .collect();
            if key.iter().any(|v| v.is_null()) {
                continue;
            }
            let clash = existing.iter().any(|other| {
                columns
                    .iter()
                    .zip(&key)
                    .all(|(column, value)| other.get(column) == Some(*value))
            });
            if clash {
                return Err(TargetStoreError::Conflict {
                    table: table.to_string(),
                    column: columns.join(","),
                    value: key
                        .iter()
                        .map(|v| v.to_string())
                        .collect::<Vec<_>>()
                        .join(","),
                }
                .into());
            }
        }
        Ok(())
    }
}

impl Default for MemoryTargetStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TargetStore for MemoryTargetStore {
    async fn insert(&self, table: &str, row: &TargetRow) -> Result<TargetId> {
        let mut state = self.lock();
        self.check_unique(&state.tables, table, row)?;

        let sequence = state.tables.sequences.entry(table.to_string()).or_insert(0);
        *sequence += 1;
        let id = *sequence;

        let mut stored = row.clone();
        stored.set("id", id);
        state
            .tables
            .rows
            .entry(table.to_string())
            .or_default()
            .push(stored);

        Ok(TargetId::new(id))
    }

    async fn update(&self, table: &str, values: &TargetRow, filter: &TargetRow) -> Result<u64> {
        let mut state = self.lock();
        let mut affected = 0;
        if let Some(rows) = state.tables.rows.get_mut(table) {
            for row in rows.iter_mut().filter(|row| row.matches(filter)) {
                for (column, value) in values.fields() {
                    row.set(column.clone(), value.clone());
                }
                affected += 1;
            }
        }
        Ok(affected)
    }

    async fn select(&self, table: &str, filter: &TargetRow) -> Result<Vec<TargetRow>> {
        let state = self.lock();
        Ok(state
            .tables
            .rows
            .get(table)
            .map(|rows| rows.iter().filter(|r| r.matches(filter)).cloned().collect())
            .unwrap_or_default())
    }

    async fn begin(&self) -> Result<()> {
        let mut state = self.lock();
        if state.snapshot.is_some() {
            return Err(TargetStoreError::TransactionFailed(
                "a transaction is already open".to_string(),
            )
            .into());
        }
        state.snapshot = Some(state.tables.clone());
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        let mut state = self.lock();
        if state.snapshot.take().is_none() {
            return Err(TargetStoreError::TransactionFailed("no open transaction".to_string()).into());
        }
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        let mut state = self.lock();
        match state.snapshot.take() {
            Some(snapshot) => {
                state.tables = snapshot;
                Ok(())
            }
            None => {
                Err(TargetStoreError::TransactionFailed("no open transaction".to_string()).into())
            }
        }
    }

    fn name(&self) -> &str {
        "memory-target"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_assigns_sequential_ids() {
        let store = MemoryTargetStore::new();
        let first = store
            .insert("taxes", &TargetRow::new().with("name", "VAT"))
            .await
            .unwrap();
        let second = store
            .insert("taxes", &TargetRow::new().with("name", "GST"))
            .await
            .unwrap();
        assert_eq!(first, TargetId::new(1));
        assert_eq!(second, TargetId::new(2));
        assert_eq!(store.rows("taxes")[1].text("name"), "GST");
    }

    #[tokio::test]
    async fn test_unique_username_conflicts() {
        let store = MemoryTargetStore::new();
        let row = TargetRow::new().with("username", "a@example.com");
        store.insert("users", &row).await.unwrap();

        let err = store.insert("users", &row).await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(store.rows("users").len(), 1);
    }

    #[tokio::test]
    async fn test_rollback_restores_snapshot() {
        let store = MemoryTargetStore::new();
        store
            .insert("staff", &TargetRow::new().with("first_name", "Kept"))
            .await
            .unwrap();

        store.begin().await.unwrap();
        store
            .insert("staff", &TargetRow::new().with("first_name", "Dropped"))
            .await
            .unwrap();
        store.rollback().await.unwrap();

        let rows = store.rows("staff");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].text("first_name"), "Kept");

        // the sequence is restored too
        let id = store
            .insert("staff", &TargetRow::new().with("first_name", "Next"))
            .await
            .unwrap();
        assert_eq!(id, TargetId::new(2));
    }

    #[tokio::test]
    async fn test_nested_begin_rejected() {
        let store = MemoryTargetStore::new();
        store.begin().await.unwrap();
        assert!(store.begin().await.is_err());
        store.commit().await.unwrap();
        assert!(store.commit().await.is_err());
    }

    #[tokio::test]
    async fn test_update_and_select_with_filter() {
        let store = MemoryTargetStore::new();
        store
            .insert("invoices", &TargetRow::new().with("client_id", 1).with("paid", 0.0))
            .await
            .unwrap();
        store
            .insert("invoices", &TargetRow::new().with("client_id", 2).with("paid", 0.0))
            .await
            .unwrap();

        let affected = store
            .update(
                "invoices",
                &TargetRow::new().with("paid", 10.5),
                &TargetRow::new().with("client_id", 2),
            )
            .await
            .unwrap();
        assert_eq!(affected, 1);

        let rows = store
            .select("invoices", &TargetRow::new().with("client_id", 2))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].float("paid"), 10.5);
        assert_eq!(store.select("invoices", &TargetRow::new()).await.unwrap().len(), 2);
    }
}
