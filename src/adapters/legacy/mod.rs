//! Legacy billing database access

pub mod postgres;
pub mod query;
pub mod traits;

pub use postgres::PostgresLegacyStore;
pub use query::LegacyQuery;
pub use traits::LegacyStore;
