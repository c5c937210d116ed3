//! Legacy store abstraction

use super::query::LegacyQuery;
use crate::domain::{LegacyRecord, Result};
use async_trait::async_trait;

/// Read-only access to the legacy billing dataset
///
/// Implementations return every row of the requested result set in the
/// query's declared order.
#[async_trait]
pub trait LegacyStore: Send + Sync {
    /// Fetch one fixed result set
    ///
    /// # Errors
    ///
    /// Returns a legacy store error if the query cannot be executed.
    async fn fetch(&self, query: LegacyQuery) -> Result<Vec<LegacyRecord>>;

    /// Test the connection to the legacy database
    async fn test_connection(&self) -> Result<()>;

    /// Human readable store name for logs
    fn name(&self) -> &str;
}
