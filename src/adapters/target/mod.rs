//! Target billing schema access

pub mod postgres;
pub mod traits;

pub use postgres::PostgresTargetStore;
pub use traits::TargetStore;
