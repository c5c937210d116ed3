//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for the migrator using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Billing Migrator - legacy billing data migration engine
#[derive(Parser, Debug)]
#[command(name = "billing-migrator")]
#[command(version, about, long_about = None)]
#[command(author = "Billing Migrator Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        default_value = "billing-migrator.toml",
        env = "MIGRATOR_CONFIG"
    )]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "MIGRATOR_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Migrate the legacy billing database into the target
    Migrate(commands::migrate::MigrateArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}
