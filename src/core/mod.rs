//! Core migration logic.
//!
//! # Modules
//!
//! - [`migration`] - Run coordination, the per-run session and the summary
//! - [`importers`] - One importer per segment of the pipeline
//! - [`transform`] - Rule-driven field transformation and email tokens
//! - [`mapping`] - Legacy -> target identity map
//! - [`executor`] - Transactional units on the target store
//! - [`util`] - Dates, money and billing terms
//! - [`countries`] - ISO 3166 country code lookup
//!
//! # Migration Workflow
//!
//! 1. **Resolve defaults**: Read currency, timezone and invoice lead time from legacy settings
//! 2. **Run segments**: Staff through Misc, in a fixed order, each inside an error guard
//! 3. **Map identities**: Every created row is registered against its legacy key
//! 4. **Report**: Per-segment counts, durations and the flat error list
//!
//! # Example
//!
//! ```rust,no_run
//! use billing_migrator::adapters::factory::{create_legacy_store, create_target_store};
//! use billing_migrator::adapters::services::MigrationServices;
//! use billing_migrator::config::load_config;
//! use billing_migrator::core::migration::MigrationCoordinator;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("billing-migrator.toml")?;
//!
//! let legacy = create_legacy_store(&config).await?;
//! let target = create_target_store(&config, false).await?;
//! let services = MigrationServices::from_config(&config.target)?;
//!
//! let coordinator =
//!     MigrationCoordinator::new(config.migration.clone(), legacy, target.store, services)?;
//! let summary = coordinator.run().await?;
//!
//! println!("{}", summary.outcome());
//! # Ok(())
//! # }
//! ```

pub mod countries;
pub mod executor;
pub mod importers;
pub mod mapping;
pub mod migration;
pub mod transform;
pub mod util;
