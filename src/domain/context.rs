//! Error context extension trait
//!
//! Provides `.context()` for `Result<T, MigrationError>`,
//! similar to `anyhow::Context` but keeping the domain error type in library code.
//!
//! ```rust
//! use billing_migrator::domain::Result;
//! use billing_migrator::domain::context::ResultExt;
//!
//! fn read_rules(path: &str) -> Result<String> {
//!     std::fs::read_to_string(path)
//!         .context(format!("Failed to read rules file: {}", path))
//! }
//! ```

use crate::domain::errors::MigrationError;
use crate::domain::result::Result;

/// Extension trait for adding context to `Result` types
pub trait ResultExt<T> {
    /// Add context to an error (evaluated eagerly)
    fn context<C>(self, context: C) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<MigrationError>,
{
    fn context<C>(self, context: C) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|e| wrap(e.into(), context))
    }
}

/// Conflicts keep their variant so callers can still branch on them.
fn wrap<C: std::fmt::Display>(base: MigrationError, context: C) -> MigrationError {
    if base.is_conflict() {
        return base;
    }
    MigrationError::Other(format!("{context}: {base}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::TargetStoreError;

    #[test]
    fn test_context_with_migration_error() {
        let result: Result<()> = Err(MigrationError::Configuration("Invalid config".to_string()));
        let err_msg = result
            .context("Failed to load configuration")
            .unwrap_err()
            .to_string();
        assert!(err_msg.contains("Failed to load configuration"));
        assert!(err_msg.contains("Invalid config"));
    }

    #[test]
    fn test_context_chaining() {
        let result: Result<()> = Err(MigrationError::Connection("refused".to_string()));
        let err_msg = result
            .context("Failed to open legacy pool")
            .context("Failed to resolve defaults")
            .unwrap_err()
            .to_string();
        assert!(err_msg.contains("Failed to resolve defaults"));
        assert!(err_msg.contains("Failed to open legacy pool"));
        assert!(err_msg.contains("refused"));
    }

    #[test]
    fn test_context_preserves_conflict() {
        let result: std::result::Result<(), TargetStoreError> = Err(TargetStoreError::Conflict {
            table: "users".to_string(),
            column: "username".to_string(),
            value: "x".to_string(),
        });
        let err = result.context("Failed to create login").unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn test_io_error_with_context() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let result: Result<()> = Err(io_error.into());
        let err_msg = result
            .context("Failed to read package map 'packages.toml'")
            .unwrap_err()
            .to_string();
        assert!(err_msg.contains("Failed to read package map"));
        assert!(err_msg.contains("File not found"));
    }
}
