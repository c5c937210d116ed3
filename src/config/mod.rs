//! Configuration management for the migrator.
//!
//! TOML configuration files with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `MIGRATOR_<SECTION>_<KEY>` environment overrides
//! - Default values for optional settings
//! - Validation before any connection is attempted
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Log level and dry-run flag
//! - [`LegacyConfig`] - Legacy database connection and shared encryption key
//! - [`TargetConfig`] - Target database connection and encryption key
//! - [`MigrationConfig`] - Company, groups, fallbacks, package handling, rules
//! - [`LoggingConfig`] - Local log file settings
//!
//! # Example Configuration
//!
//! ```toml
//! [legacy]
//! host = "legacy-db.internal"
//! database = "billing_v2"
//! user = "migrator"
//! password = "${MIGRATOR_LEGACY_PASSWORD}"
//! encryption_key = "${MIGRATOR_LEGACY_KEY}"
//!
//! [target]
//! connection_string = "${MIGRATOR_TARGET_URL}"
//! encryption_key = "${MIGRATOR_TARGET_KEY}"
//!
//! [migration]
//! company_id = 1
//! create_packages = true
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

pub use loader::{load_config, resolve_package_overrides};
pub use schema::{
    ApplicationConfig, LegacyConfig, LoggingConfig, MigrationConfig, MigratorConfig, StaffGroups,
    TargetConfig, MAX_INVOICE_LEAD_DAYS,
};
pub use secret::{secret_string, secret_string_opt, SecretString, SecretValue};
