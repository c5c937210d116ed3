//! Store factory
//!
//! Creates the legacy and target stores from configuration. A dry run keeps
//! the real legacy reader but writes into an in-memory target.

use crate::adapters::legacy::{LegacyStore, PostgresLegacyStore};
use crate::adapters::memory::MemoryTargetStore;
use crate::adapters::target::{PostgresTargetStore, TargetStore};
use crate::config::MigratorConfig;
use crate::domain::{MigrationError, Result};
use std::sync::Arc;

/// The target store in use, plus the in-memory store when dry running
pub struct TargetHandle {
    pub store: Arc<dyn TargetStore>,
    pub dry_run_store: Option<Arc<MemoryTargetStore>>,
}

/// Create the legacy store and verify it is reachable
///
/// # Errors
///
/// Returns a connection error if the legacy database cannot be reached.
pub async fn create_legacy_store(config: &MigratorConfig) -> Result<Arc<dyn LegacyStore>> {
    tracing::info!(
        host = %config.legacy.host,
        database = %config.legacy.database,
        "Creating legacy store"
    );
    let store = PostgresLegacyStore::new(&config.legacy)?;
    store
        .test_connection()
        .await
        .map_err(|e| MigrationError::Connection(format!("Legacy database unreachable: {e}")))?;
    Ok(Arc::new(store))
}

/// Create the target store
///
/// # Errors
///
/// Returns a connection error if the target database cannot be reached.
pub async fn create_target_store(config: &MigratorConfig, dry_run: bool) -> Result<TargetHandle> {
    if dry_run {
        tracing::info!("Dry run: migrating into an in-memory target");
        let memory = Arc::new(MemoryTargetStore::new());
        return Ok(TargetHandle {
            store: memory.clone(),
            dry_run_store: Some(memory),
        });
    }

    tracing::info!("Creating target store");
    let store = PostgresTargetStore::connect(&config.target)
        .await
        .map_err(|e| match e {
            MigrationError::Configuration(_) => e,
            other => MigrationError::Connection(format!("Target database unreachable: {other}")),
        })?;
    if config.target.create_schema {
        store.ensure_schema().await?;
    }

    Ok(TargetHandle {
        store: Arc::new(store),
        dry_run_store: None,
    })
}
