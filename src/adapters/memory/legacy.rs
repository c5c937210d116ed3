//! In-memory legacy store for tests

use crate::adapters::legacy::{LegacyQuery, LegacyStore};
use crate::domain::{LegacyRecord, LegacyStoreError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Legacy dataset held as pre-ordered result sets
///
/// ```
/// use billing_migrator::adapters::legacy::LegacyQuery;
/// use billing_migrator::adapters::memory::MemoryLegacyStore;
/// use serde_json::json;
///
/// let store = MemoryLegacyStore::new()
///     .with_rows(LegacyQuery::Currencies, vec![json!({"code": "USD"})]);
/// ```
#[derive(Debug, Default, Clone)]
pub struct MemoryLegacyStore {
    result_sets: HashMap<LegacyQuery, Vec<LegacyRecord>>,
    failing: HashSet<LegacyQuery>,
}

impl MemoryLegacyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the rows returned for a query, in the order given
    pub fn with_rows(mut self, query: LegacyQuery, rows: Vec<Value>) -> Self {
        self.result_sets
            .insert(query, rows.into_iter().map(LegacyRecord::from).collect());
        self
    }

    /// Makes a query fail with a query error
    pub fn failing_on(mut self, query: LegacyQuery) -> Self {
        self.failing.insert(query);
        self
    }
}

#[async_trait]
impl LegacyStore for MemoryLegacyStore {
    async fn fetch(&self, query: LegacyQuery) -> Result<Vec<LegacyRecord>> {
        if self.failing.contains(&query) {
            return Err(LegacyStoreError::QueryFailed {
                query: query.name().to_string(),
                message: "simulated failure".to_string(),
            }
            .into());
        }
        Ok(self.result_sets.get(&query).cloned().unwrap_or_default())
    }

    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "memory-legacy"
    }
}
