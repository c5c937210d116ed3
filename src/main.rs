// Billing Migrator - Legacy billing data migration engine
// Copyright (c) 2025 Billing Migrator Contributors
// Licensed under the MIT License

use billing_migrator::cli::{Cli, Commands};
use billing_migrator::config::{load_config, LoggingConfig};
use billing_migrator::logging::init_logging;
use clap::Parser;
use std::process;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // File logging follows the config file when it loads; console only otherwise
    let logging_config = match &cli.command {
        Commands::Init(_) => console_only(),
        _ => load_config(&cli.config)
            .map(|config| config.logging)
            .unwrap_or_else(|_| console_only()),
    };
    let log_level = cli.log_level.as_deref().unwrap_or("info");
    let guard = match init_logging(log_level, &logging_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(5);
        }
    };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Billing Migrator - Legacy billing data migration engine"
    );

    let exit_code = match execute_command(&cli).await {
        Ok(code) => code,
        Err(e) => {
            billing_migrator::log_error_with_context!(e, "command execution");
            eprintln!("Error: {e}");
            5
        }
    };

    drop(guard);
    process::exit(exit_code);
}

fn console_only() -> LoggingConfig {
    LoggingConfig {
        local_enabled: false,
        ..LoggingConfig::default()
    }
}

/// Execute the CLI command
async fn execute_command(cli: &Cli) -> anyhow::Result<i32> {
    match &cli.command {
        Commands::Migrate(args) => args.execute(&cli.config).await,
        Commands::ValidateConfig(args) => args.execute(&cli.config).await,
        Commands::Init(args) => args.execute().await,
    }
}
