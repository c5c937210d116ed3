//! Integration tests for dry-run mode
//!
//! A dry run reads the legacy data as usual but writes into an in-memory
//! target, and the summary reports the resulting row count per table.

mod common;

use billing_migrator::adapters::factory::create_target_store;
use billing_migrator::adapters::target::TargetStore;
use billing_migrator::config::load_config;
use billing_migrator::core::migration::MigrationCoordinator;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

const CONFIG: &str = r#"
[application]
dry_run = true

[legacy]
host = "legacy.internal"
database = "billing_v2"
user = "reader"
password = "pw"
encryption_key = "legacy-key"

[target]
connection_string = "postgresql://writer:pw@unreachable.invalid/billing"
encryption_key = "target-key"
create_schema = true
"#;

fn config_file() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(CONFIG.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[tokio::test]
async fn test_dry_run_target_is_in_memory() {
    let file = config_file();
    let config = load_config(file.path()).unwrap();
    assert!(config.application.dry_run);

    // The configured database is never contacted
    let handle = create_target_store(&config, true).await.unwrap();
    assert!(handle.dry_run_store.is_some());
    assert_eq!(handle.store.name(), handle.dry_run_store.unwrap().name());
}

#[tokio::test]
async fn test_dry_run_reports_table_counts() {
    let file = config_file();
    let config = load_config(file.path()).unwrap();
    let handle = create_target_store(&config, true).await.unwrap();
    let memory = handle.dry_run_store.clone().unwrap();

    let summary = MigrationCoordinator::new(
        config.migration.clone(),
        Arc::new(common::basic_legacy()),
        handle.store,
        common::services(),
    )
    .unwrap()
    .with_dry_run_store(memory.clone())
    .with_now(common::fixed_now())
    .run()
    .await
    .unwrap();

    assert!(summary.dry_run);
    let counts = summary.table_counts.expect("dry run reports table counts");
    assert_eq!(counts.get("clients"), Some(&1));
    assert_eq!(counts.get("currencies"), Some(&1));
    assert_eq!(counts.get("packages"), Some(&1));
    assert_eq!(counts.get("package_pricing"), Some(&1));
    assert_eq!(counts.get("services"), Some(&1));
    assert_eq!(counts, memory.table_counts());
}

#[tokio::test]
async fn test_real_run_has_no_table_counts() {
    let (summary, _) = common::run(common::basic_legacy(), common::settings()).await;

    assert!(!summary.dry_run);
    assert!(summary.table_counts.is_none());
}
