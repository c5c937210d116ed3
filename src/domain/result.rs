//! Result type alias for the migrator
//!
//! This module provides a convenient Result type alias that uses
//! `MigrationError` as the error type.

use super::errors::MigrationError;

/// Result type alias for migration operations
///
/// # Examples
///
/// ```
/// use billing_migrator::domain::result::Result;
/// use billing_migrator::domain::errors::MigrationError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(MigrationError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, MigrationError>;
