//! External system integrations.
//!
//! - [`legacy`] - read-only access to the legacy billing database
//! - [`target`] - write access to the target billing schema
//! - [`memory`] - in-memory stores for dry runs and tests
//! - [`services`] - encryption, invoice presenter and module installer
//! - [`factory`] - builds stores from configuration
//!
//! Stores sit behind `async_trait` traits so the migration core can run
//! against PostgreSQL or the in-memory implementations:
//!
//! ```rust
//! use billing_migrator::adapters::memory::MemoryTargetStore;
//! use billing_migrator::adapters::target::TargetStore;
//! use billing_migrator::domain::TargetRow;
//!
//! # async fn example() -> billing_migrator::domain::Result<()> {
//! let target = MemoryTargetStore::new();
//! let id = target.insert("taxes", &TargetRow::new().with("name", "VAT")).await?;
//! assert_eq!(id.value(), 1);
//! # Ok(())
//! # }
//! ```

pub mod factory;
pub mod legacy;
pub mod memory;
pub mod services;
pub mod target;
