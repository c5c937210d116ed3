//! Target store abstraction

use crate::domain::{Result, TargetId, TargetRow};
use async_trait::async_trait;

/// Write access to the target billing schema
///
/// Every table carries a generated `id` column. A unique violation is
/// reported as `TargetStoreError::Conflict` so callers can branch on it.
#[async_trait]
pub trait TargetStore: Send + Sync {
    /// Insert one row and return its generated id
    async fn insert(&self, table: &str, row: &TargetRow) -> Result<TargetId>;

    /// Set `values` on every row matching `filter`, returning the affected count
    async fn update(&self, table: &str, values: &TargetRow, filter: &TargetRow) -> Result<u64>;

    /// Rows matching `filter` (all rows for an empty filter), ordered by id
    async fn select(&self, table: &str, filter: &TargetRow) -> Result<Vec<TargetRow>>;

    /// Open a transaction; nested transactions are not supported
    async fn begin(&self) -> Result<()>;

    async fn commit(&self) -> Result<()>;

    async fn rollback(&self) -> Result<()>;

    /// Human readable store name for logs
    fn name(&self) -> &str;
}
