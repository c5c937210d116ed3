//! Integration tests for logging functionality

use billing_migrator::config::LoggingConfig;
use billing_migrator::domain::EntityClass;
use billing_migrator::logging::init_logging;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_logging_config_default() {
    let config = LoggingConfig::default();
    assert!(config.local_enabled);
    assert_eq!(config.local_rotation, "daily");
    assert_eq!(config.local_path, "/var/log/billing-migrator");
}

#[test]
fn test_init_logging_creates_log_directory() {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("logs");

    let config = LoggingConfig {
        local_enabled: true,
        local_path: log_path.to_string_lossy().to_string(),
        local_rotation: "never".to_string(),
    };
    assert!(!log_path.exists());

    // Only one subscriber can be installed per process, so this is the
    // single test in this binary that initializes logging
    let guard = init_logging("debug", &config).expect("logging initializes");
    assert!(log_path.is_dir());

    tracing::info!("written to the file layer");
    billing_migrator::log_segment_start!("clients");
    billing_migrator::log_segment_complete!("clients", 3, 1, Duration::from_millis(20));
    billing_migrator::log_foreign_key_miss!("invoices", EntityClass::Clients, "42");

    drop(guard);
    let files: Vec<_> = std::fs::read_dir(&log_path).unwrap().collect();
    assert_eq!(files.len(), 1);
}

#[test]
fn test_invalid_level_is_rejected_before_install() {
    let config = LoggingConfig {
        local_enabled: false,
        ..LoggingConfig::default()
    };
    let err = init_logging("verbose", &config).err().expect("invalid level");
    assert!(err.to_string().contains("verbose"));
}
