//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{MigrationConfig, MigratorConfig};
use crate::domain::errors::MigrationError;
use crate::domain::ids::{LegacyId, TargetId};
use crate::domain::result::Result;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into MigratorConfig
/// 4. Applies environment variable overrides (MIGRATOR_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns a configuration error if the file is missing or unreadable, a
/// referenced environment variable is unset, or validation fails.
///
/// # Examples
///
/// ```no_run
/// use billing_migrator::config::loader::load_config;
///
/// let config = load_config("migrator.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<MigratorConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MigrationError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        MigrationError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_config(&contents)
}

/// Parses and validates configuration text
pub fn parse_config(contents: &str) -> Result<MigratorConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: MigratorConfig = toml::from_str(&contents)
        .map_err(|e| MigrationError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config);

    config.validate().map_err(|e| {
        MigrationError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error listing every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| MigrationError::Configuration(format!("Invalid substitution pattern: {e}")))?;
    let mut result = String::new();
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{}}}", var_name);
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(MigrationError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Applies environment variable overrides using the MIGRATOR_<SECTION>_<KEY> pattern
fn apply_env_overrides(config: &mut MigratorConfig) {
    use crate::config::secret_string;

    if let Ok(val) = std::env::var("MIGRATOR_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Ok(val) = std::env::var("MIGRATOR_APPLICATION_DRY_RUN") {
        config.application.dry_run = val.parse().unwrap_or(false);
    }

    if let Ok(val) = std::env::var("MIGRATOR_LEGACY_HOST") {
        config.legacy.host = val;
    }
    if let Ok(val) = std::env::var("MIGRATOR_LEGACY_PORT") {
        if let Ok(port) = val.parse() {
            config.legacy.port = port;
        }
    }
    if let Ok(val) = std::env::var("MIGRATOR_LEGACY_DATABASE") {
        config.legacy.database = val;
    }
    if let Ok(val) = std::env::var("MIGRATOR_LEGACY_USER") {
        config.legacy.user = val;
    }
    if let Ok(val) = std::env::var("MIGRATOR_LEGACY_PASSWORD") {
        config.legacy.password = secret_string(val);
    }

    if let Ok(val) = std::env::var("MIGRATOR_TARGET_CONNECTION_STRING") {
        config.target.connection_string = secret_string(val);
    }
    if let Ok(val) = std::env::var("MIGRATOR_TARGET_ENCRYPTION_KEY") {
        config.target.encryption_key = secret_string(val);
    }

    if let Ok(val) = std::env::var("MIGRATOR_MIGRATION_COMPANY_ID") {
        if let Ok(id) = val.parse() {
            config.migration.company_id = id;
        }
    }
    if let Ok(val) = std::env::var("MIGRATOR_MIGRATION_DEFAULT_TIMEZONE") {
        config.migration.default_timezone = val;
    }
    if let Ok(val) = std::env::var("MIGRATOR_MIGRATION_DEFAULT_CURRENCY") {
        config.migration.default_currency = val;
    }
    if let Ok(val) = std::env::var("MIGRATOR_MIGRATION_RULES_PATH") {
        config.migration.rules_path = Some(val);
    }

    if let Ok(val) = std::env::var("MIGRATOR_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(true);
    }
    if let Ok(val) = std::env::var("MIGRATOR_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
}

#[derive(Debug, Deserialize)]
struct PackageMapFile {
    #[serde(default)]
    packages: BTreeMap<String, i64>,
}

/// Reads a package override file (`[packages]` table of legacy id = target id)
pub fn load_package_map(path: impl AsRef<Path>) -> Result<BTreeMap<String, i64>> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| {
        MigrationError::Configuration(format!(
            "Failed to read package map {}: {}",
            path.display(),
            e
        ))
    })?;
    let file: PackageMapFile = toml::from_str(&contents)?;
    Ok(file.packages)
}

/// Resolves the manual package override table, if one is configured
///
/// Entries from `package_map_path` are merged over the inline `package_map`.
/// Returns `None` when no override table is supplied at all.
pub fn resolve_package_overrides(
    migration: &MigrationConfig,
) -> Result<Option<BTreeMap<LegacyId, TargetId>>> {
    if !migration.has_package_map() {
        return Ok(None);
    }

    let mut raw = migration.package_map.clone();
    if let Some(path) = &migration.package_map_path {
        raw.extend(load_package_map(path)?);
    }

    let mut overrides = BTreeMap::new();
    for (legacy, target) in raw {
        let legacy_id = LegacyId::new(legacy).map_err(MigrationError::Configuration)?;
        if target <= 0 {
            return Err(MigrationError::Configuration(format!(
                "package map entry '{}' maps to invalid target id {}",
                legacy_id, target
            )));
        }
        overrides.insert(legacy_id, TargetId::new(target));
    }
    Ok(Some(overrides))
}
