//! Domain error types
//!
//! This module defines the error hierarchy for the migrator. All errors are
//! domain-specific and don't expose third-party driver types.

use thiserror::Error;

/// Main migration error type
///
/// This is the primary error type used throughout the application.
/// It wraps store-specific error types and provides context for error handling.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Network/connection errors
    #[error("Connection error: {0}")]
    Connection(String),

    /// Errors raised while reading the legacy dataset
    #[error("Legacy store error: {0}")]
    Legacy(#[from] LegacyStoreError),

    /// Errors raised while writing the target schema
    #[error("Target store error: {0}")]
    Target(#[from] TargetStoreError),

    /// Field transformation errors
    #[error("Transformation error: {0}")]
    Transform(String),

    /// Identity mapping errors
    #[error("Identity mapping error: {0}")]
    Mapping(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Encryption service errors
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl MigrationError {
    /// Returns true when the error is a uniqueness conflict raised by the target store
    pub fn is_conflict(&self) -> bool {
        matches!(self, MigrationError::Target(TargetStoreError::Conflict { .. }))
    }
}

/// Legacy store errors
///
/// Errors that occur while reading the legacy billing database.
#[derive(Debug, Error)]
pub enum LegacyStoreError {
    /// Failed to connect to the legacy database
    #[error("Failed to connect to legacy database: {0}")]
    ConnectionFailed(String),

    /// A legacy query failed
    #[error("Legacy query '{query}' failed: {message}")]
    QueryFailed { query: String, message: String },

    /// A legacy row could not be decoded
    #[error("Invalid legacy row: {0}")]
    InvalidRow(String),
}

/// Target store errors
///
/// Errors that occur while writing the target billing schema.
#[derive(Debug, Error)]
pub enum TargetStoreError {
    /// Failed to connect to the target database
    #[error("Failed to connect to target database: {0}")]
    ConnectionFailed(String),

    /// A uniqueness constraint rejected the row
    #[error("Conflict on {table}.{column}: '{value}' already exists")]
    Conflict {
        table: String,
        column: String,
        value: String,
    },

    /// Failed to insert a row
    #[error("Failed to insert into {table}: {message}")]
    InsertFailed { table: String, message: String },

    /// Failed to update rows
    #[error("Failed to update {table}: {message}")]
    UpdateFailed { table: String, message: String },

    /// Failed to query rows
    #[error("Failed to query {table}: {message}")]
    QueryFailed { table: String, message: String },

    /// Transaction control failed
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Table or column name rejected before reaching the database
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),
}

// Conversion from std::io::Error
impl From<std::io::Error> for MigrationError {
    fn from(err: std::io::Error) -> Self {
        MigrationError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for MigrationError {
    fn from(err: serde_json::Error) -> Self {
        MigrationError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for MigrationError {
    fn from(err: toml::de::Error) -> Self {
        MigrationError::Configuration(format!("TOML parse error: {err}"))
    }
}
