//! Migrate command implementation
//!
//! This module implements the `migrate` command, which runs the full
//! legacy -> target pipeline once.

use crate::adapters::factory::{create_legacy_store, create_target_store};
use crate::adapters::services::MigrationServices;
use crate::config::{load_config, MigratorConfig};
use crate::core::migration::{MigrationCoordinator, MigrationSummary, SegmentStatus};
use crate::domain::MigrationError;
use clap::Args;

/// Arguments for the migrate command
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Dry run mode - migrate into an in-memory target and report table counts
    #[arg(long)]
    pub dry_run: bool,

    /// TOML file with a `[packages]` table of legacy package id = target package id
    #[arg(long, value_name = "FILE")]
    pub package_map: Option<String>,
}

impl MigrateArgs {
    /// Execute the migrate command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Starting migrate command");

        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Failed to load configuration: {e}");
                return Ok(2);
            }
        };

        if let Some(path) = &self.package_map {
            tracing::info!(path = %path, "Using package map from CLI");
            config.migration.package_map_path = Some(path.clone());
        }

        if self.dry_run {
            tracing::info!("Enabling dry-run mode from CLI");
            config.application.dry_run = true;
        }
        let dry_run = config.application.dry_run;

        if let Err(e) = config.validate() {
            tracing::error!(error = %e, "Configuration validation failed");
            eprintln!("Configuration validation failed: {e}");
            return Ok(2);
        }

        if dry_run {
            tracing::info!("Dry run mode enabled - the target database is not touched");
            println!("🔍 DRY RUN MODE - No data will be written to the target database");
            println!();
        }

        if !self.yes && !dry_run && !confirm(&config)? {
            println!("Migration cancelled.");
            return Ok(0);
        }

        let legacy = match create_legacy_store(&config).await {
            Ok(store) => store,
            Err(e) => {
                tracing::error!(error = %e, "Failed to open legacy store");
                eprintln!("Failed to connect to the legacy database: {e}");
                return Ok(exit_code_for(&e));
            }
        };
        let target = match create_target_store(&config, dry_run).await {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!(error = %e, "Failed to open target store");
                eprintln!("Failed to connect to the target database: {e}");
                return Ok(exit_code_for(&e));
            }
        };
        let services = match MigrationServices::from_config(&config.target) {
            Ok(services) => services,
            Err(e) => {
                tracing::error!(error = %e, "Failed to initialize target services");
                eprintln!("Failed to initialize target services: {e}");
                return Ok(exit_code_for(&e));
            }
        };

        tracing::info!("Creating migration coordinator");
        let mut coordinator =
            match MigrationCoordinator::new(config.migration.clone(), legacy, target.store, services)
            {
                Ok(c) => c,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to create migration coordinator");
                    eprintln!("Failed to initialize migration: {e}");
                    return Ok(exit_code_for(&e));
                }
            };
        if let Some(store) = target.dry_run_store {
            coordinator = coordinator.with_dry_run_store(store);
        }

        println!("🚀 Starting migration...");
        println!();

        let summary = match coordinator.run().await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Migration failed during setup");
                eprintln!("Migration failed: {e}");
                return Ok(5);
            }
        };

        print_summary(&summary);

        if summary.completed_with_errors() {
            println!("⚠️  {}", summary.outcome());
            Ok(1)
        } else {
            println!("✅ {}", summary.outcome());
            Ok(0)
        }
    }
}

fn confirm(config: &MigratorConfig) -> anyhow::Result<bool> {
    use std::io::{self, Write};

    println!("Migration Configuration:");
    println!(
        "  Legacy: {}:{}/{}",
        config.legacy.host, config.legacy.port, config.legacy.database
    );
    println!("  Company: {}", config.migration.company_id);
    println!(
        "  Packages: {}",
        if config.migration.has_package_map() {
            "manual package map"
        } else {
            "created from legacy data"
        }
    );
    println!();
    print!("Proceed with migration? [y/N]: ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

/// Exit code of a setup failure
fn exit_code_for(error: &MigrationError) -> i32 {
    match error {
        MigrationError::Configuration(_) => 2,
        MigrationError::Connection(_) => 4,
        _ => 5,
    }
}

fn print_summary(summary: &MigrationSummary) {
    println!();
    println!("📊 Migration Summary:");
    for report in &summary.segments {
        let status = match report.status {
            SegmentStatus::Completed => "ok",
            SegmentStatus::Failed => "failed",
            SegmentStatus::Skipped => "skipped",
        };
        println!(
            "  {:<20} {:>7} imported {:>6} skipped  {:>7.2}s  {}",
            report.segment.name(),
            report.imported,
            report.skipped,
            report.duration.as_secs_f64(),
            status
        );
    }
    println!("  Total imported: {}", summary.total_imported());
    println!("  Total skipped: {}", summary.total_skipped());
    println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
    println!();

    if let Some(counts) = &summary.table_counts {
        println!("🧮 Dry-run target tables:");
        for (table, count) in counts {
            println!("  {table:<28} {count}");
        }
        println!();
    }

    if summary.completed_with_errors() {
        println!("⚠️  Errors encountered:");
        for error in &summary.errors {
            println!("  - {error}");
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_args_defaults() {
        let args = MigrateArgs {
            yes: false,
            dry_run: false,
            package_map: None,
        };

        assert!(!args.yes);
        assert!(!args.dry_run);
        assert!(args.package_map.is_none());
    }

    #[test]
    fn test_exit_code_for_setup_errors() {
        assert_eq!(exit_code_for(&MigrationError::Configuration("x".into())), 2);
        assert_eq!(exit_code_for(&MigrationError::Connection("x".into())), 4);
        assert_eq!(exit_code_for(&MigrationError::Transform("x".into())), 5);
    }
}
