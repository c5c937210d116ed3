//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "billing-migrator.toml")]
    pub output: String,

    /// Include example values and comments
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing billing migrator configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2);
        }

        let config_content = if self.with_examples {
            Self::generate_config_with_examples()
        } else {
            Self::generate_minimal_config()
        };

        match fs::write(&self.output, config_content) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your settings", self.output);
                println!("  2. Create a .env file with your credentials:");
                println!("     - MIGRATOR_LEGACY_PASSWORD and MIGRATOR_LEGACY_ENCRYPTION_KEY");
                println!(
                    "     - MIGRATOR_TARGET_CONNECTION_STRING and MIGRATOR_TARGET_ENCRYPTION_KEY"
                );
                println!("  3. Validate configuration: billing-migrator validate-config");
                println!("  4. Rehearse: billing-migrator migrate --dry-run");
                println!("  5. Run the migration: billing-migrator migrate");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {}", e);
                Ok(5)
            }
        }
    }

    /// Generate minimal configuration
    fn generate_minimal_config() -> String {
        r#"# Billing Migrator Configuration File

[application]
log_level = "info"
dry_run = false

[legacy]
host = "legacy-db.internal"
port = 5432
database = "billing_v2"
user = "migrator"
password = "${MIGRATOR_LEGACY_PASSWORD}"
encryption_key = "${MIGRATOR_LEGACY_ENCRYPTION_KEY}"

[target]
connection_string = "${MIGRATOR_TARGET_CONNECTION_STRING}"
encryption_key = "${MIGRATOR_TARGET_ENCRYPTION_KEY}"
create_schema = false

[migration]
company_id = 1
client_group_id = 1
default_timezone = "UTC"
default_currency = "USD"
invoice_lead_days = 14
create_packages = true

[logging]
local_enabled = true
local_path = "/var/log/billing-migrator"
local_rotation = "daily"
"#
        .to_string()
    }

    /// Generate configuration with examples and comments
    fn generate_config_with_examples() -> String {
        r#"# Billing Migrator Configuration File
# Legacy billing platform -> new billing platform
#
# This file contains all configuration options with examples and explanations.
# Values of the form ${VAR} are read from the environment (or a .env file).
# Any key can also be overridden with MIGRATOR_<SECTION>_<KEY>.

# ============================================================================
# Application Settings
# ============================================================================
[application]
# Log level (trace, debug, info, warn, error)
log_level = "info"

# Dry run mode (migrate into an in-memory target, report table counts)
dry_run = false

# ============================================================================
# Legacy Database
# ============================================================================
[legacy]
host = "legacy-db.internal"
port = 5432
database = "billing_v2"
user = "migrator"

# Password (use environment variable)
password = "${MIGRATOR_LEGACY_PASSWORD}"

# Key the legacy platform encrypted stored module credentials with
encryption_key = "${MIGRATOR_LEGACY_ENCRYPTION_KEY}"

# Connection pool settings
max_connections = 4                 # 1-32
connection_timeout_seconds = 30

# ============================================================================
# Target Database
# ============================================================================
[target]
# Connection string format: postgresql://[user[:password]@][host][:port][/dbname][?params]
connection_string = "${MIGRATOR_TARGET_CONNECTION_STRING}"

connection_timeout_seconds = 30
statement_timeout_seconds = 60

# Key of the target platform's encryption service
encryption_key = "${MIGRATOR_TARGET_ENCRYPTION_KEY}"

# Create the target tables when they do not exist yet
create_schema = false

# ============================================================================
# Migration Behaviour
# ============================================================================
[migration]
# Company and client group every migrated row belongs to
company_id = 1
client_group_id = 1

# Fallbacks used when the legacy settings do not carry a value
default_timezone = "UTC"
default_currency = "USD"
invoice_lead_days = 14

# Create packages, module registrations and prices from the legacy data
create_packages = true

# Or map legacy packages onto packages that already exist in the target.
# When a map is given the packages segment is skipped.
# [migration.package_map]
# "12" = 4
# "13" = 5
#
# package_map_path = "package-map.toml"

# Per-module transformation rules (built-in rules when absent)
# rules_path = "rules.toml"

# Target staff group ids for legacy privilege levels
[migration.staff_groups]
admin = 1
billing = 2
support = 3

# ============================================================================
# Logging Configuration
# ============================================================================
[logging]
# Enable local file logging
local_enabled = true

# Local log directory
local_path = "/var/log/billing-migrator"

# Log rotation (daily, hourly or never)
local_rotation = "daily"
"#
        .to_string()
    }
}
