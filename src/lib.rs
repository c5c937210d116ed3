// Billing Migrator - Legacy billing data migration engine
// Copyright (c) 2025 Billing Migrator Contributors
// Licensed under the MIT License

//! # Billing Migrator
//!
//! Billing Migrator moves a legacy billing platform's data (staff, clients,
//! invoices, payments, products, services, support tickets and company
//! settings) into a new billing platform's PostgreSQL schema in one run.
//!
//! ## Overview
//!
//! The library provides:
//! - **Reading** fixed result sets from the legacy database
//! - **Transforming** rows with per-module rules, encryption and date/term normalization
//! - **Writing** rows into the target schema, with atomic multi-row units where needed
//! - **Mapping** every legacy key to its new surrogate id so later segments can resolve references
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Migration pipeline, importers, rules and identity map
//! - [`adapters`] - Legacy and target stores, plus target-side services
//! - [`domain`] - Identifiers, rows and error types
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use billing_migrator::adapters::factory::{create_legacy_store, create_target_store};
//! use billing_migrator::adapters::services::MigrationServices;
//! use billing_migrator::config::load_config;
//! use billing_migrator::core::migration::MigrationCoordinator;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("billing-migrator.toml")?;
//!
//!     let legacy = create_legacy_store(&config).await?;
//!     let target = create_target_store(&config, config.application.dry_run).await?;
//!     let services = MigrationServices::from_config(&config.target)?;
//!
//!     let summary =
//!         MigrationCoordinator::new(config.migration.clone(), legacy, target.store, services)?
//!             .run()
//!             .await?;
//!
//!     println!("{}", summary.outcome());
//!     Ok(())
//! }
//! ```
//!
//! ## Segments
//!
//! A run executes Staff, Clients, Contacts, Taxes, Currencies, Invoices,
//! Transactions, Packages, Coupons, Services, Support departments, Support
//! tickets and Misc settings in that order. A failing segment is recorded
//! and the run moves on; dependents of rows that never migrated are
//! skipped rather than failing.
//!
//! ## Configuration
//!
//! ```toml
//! [legacy]
//! host = "legacy-db.internal"
//! database = "billing_v2"
//! user = "migrator"
//! password = "${MIGRATOR_LEGACY_PASSWORD}"
//! encryption_key = "${MIGRATOR_LEGACY_ENCRYPTION_KEY}"
//!
//! [target]
//! connection_string = "${MIGRATOR_TARGET_CONNECTION_STRING}"
//! encryption_key = "${MIGRATOR_TARGET_ENCRYPTION_KEY}"
//!
//! [migration]
//! company_id = 1
//! ```
//!
//! See the [`config`] module for every option.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;

pub use domain::{MigrationError, Result};
