//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the migrator configuration file without connecting to any database.

use crate::config::{load_config, resolve_package_overrides};
use crate::core::transform::RuleRegistry;
use clap::Args;
use std::path::Path;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration file loaded successfully");
                c
            }
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        if let Err(e) = config.validate() {
            println!("❌ Configuration validation failed");
            println!("   Error: {e}");
            println!();
            return Ok(2);
        }

        let rules = match RuleRegistry::load(config.migration.rules_path.as_deref().map(Path::new))
        {
            Ok(rules) => rules,
            Err(e) => {
                println!("❌ Transformation rules are invalid");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        let overrides = match resolve_package_overrides(&config.migration) {
            Ok(overrides) => overrides,
            Err(e) => {
                println!("❌ Package map is invalid");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  Dry Run: {}", config.application.dry_run);
        println!(
            "  Legacy Database: {}:{}/{}",
            config.legacy.host, config.legacy.port, config.legacy.database
        );
        println!("  Company: {}", config.migration.company_id);
        println!("  Client Group: {}", config.migration.client_group_id);
        println!("  Default Timezone: {}", config.migration.default_timezone);
        println!("  Default Currency: {}", config.migration.default_currency);
        println!("  Invoice Lead Days: {}", config.migration.invoice_lead_days);
        match overrides {
            Some(map) => println!("  Packages: manual map ({} entries)", map.len()),
            None => println!("  Packages: created from legacy data"),
        }
        println!(
            "  Rules: {}",
            config
                .migration
                .rules_path
                .as_deref()
                .unwrap_or("built-in")
        );
        for module in ["cpanel", "plesk", "registrar"] {
            if !rules.has_module(module) {
                println!("  ⚠️  No rules for module '{module}', fallback rules apply");
            }
        }
        println!();
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_config_is_a_config_error() {
        let args = ValidateArgs {};
        let code = args.execute("/nonexistent/migrator.toml").await.unwrap();
        assert_eq!(code, 2);
    }
}
