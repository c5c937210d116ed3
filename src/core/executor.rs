//! Transactional execution of multi-insert units

use crate::adapters::target::TargetStore;
use crate::domain::Result;
use std::future::Future;
use std::sync::Arc;

/// Wraps a unit of work in begin/commit/rollback on the target store
///
/// Only the wrapped unit is rolled back on failure; anything committed
/// before it stays.
#[derive(Clone)]
pub struct TransactionalExecutor {
    target: Arc<dyn TargetStore>,
}

impl TransactionalExecutor {
    pub fn new(target: Arc<dyn TargetStore>) -> Self {
        Self { target }
    }

    /// Run `work` atomically
    ///
    /// # Errors
    ///
    /// Returns the unit's error after rolling it back, or a transaction
    /// error if begin/commit fail.
    pub async fn atomically<T, F>(&self, work: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.target.begin().await?;

        match work.await {
            Ok(value) => match self.target.commit().await {
                Ok(()) => Ok(value),
                Err(e) => {
                    self.rollback_quietly().await;
                    Err(e)
                }
            },
            Err(e) => {
                self.rollback_quietly().await;
                Err(e)
            }
        }
    }

    async fn rollback_quietly(&self) {
        if let Err(rollback_error) = self.target.rollback().await {
            tracing::warn!(error = %rollback_error, "Rollback failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryTargetStore;
    use crate::domain::{MigrationError, TargetRow};

    #[tokio::test]
    async fn test_commit_keeps_rows() {
        let store = Arc::new(MemoryTargetStore::new());
        let executor = TransactionalExecutor::new(store.clone());

        let id = executor
            .atomically(async {
                store
                    .insert("users", &TargetRow::new().with("username", "admin"))
                    .await
            })
            .await
            .unwrap();

        assert_eq!(id.value(), 1);
        assert_eq!(store.rows("users").len(), 1);
    }

    #[tokio::test]
    async fn test_failure_rolls_back_only_the_unit() {
        let store = Arc::new(MemoryTargetStore::new());
        let executor = TransactionalExecutor::new(store.clone());

        executor
            .atomically(async {
                store
                    .insert("users", &TargetRow::new().with("username", "first"))
                    .await
            })
            .await
            .unwrap();

        let result: Result<()> = executor
            .atomically(async {
                store
                    .insert("users", &TargetRow::new().with("username", "second"))
                    .await?;
                Err(MigrationError::Validation("group missing".to_string()))
            })
            .await;

        assert!(result.is_err());
        let users = store.rows("users");
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].text("username"), "first");
    }
}
