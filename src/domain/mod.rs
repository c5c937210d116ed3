//! Domain types for the billing migrator.
//!
//! The domain layer provides:
//! - **Identifiers** ([`LegacyId`], [`TargetId`], [`EntityClass`])
//! - **Rows** exchanged with the stores ([`LegacyRecord`], [`TargetRow`])
//! - **Error types** ([`MigrationError`], [`LegacyStoreError`], [`TargetStoreError`])
//! - **Result type alias** ([`Result`])
//!
//! ```rust
//! use billing_migrator::domain::{LegacyId, TargetRow};
//!
//! let client = LegacyId::from(7);
//! let row = TargetRow::new().with("id_value", client.as_str());
//! assert_eq!(row.text("id_value"), "7");
//! ```

pub mod context;
pub mod errors;
pub mod ids;
pub mod records;
pub mod result;

pub use errors::{LegacyStoreError, MigrationError, TargetStoreError};
pub use ids::{EntityClass, LegacyId, TargetId};
pub use records::{Fields, LegacyRecord, TargetRow};
pub use result::Result;
