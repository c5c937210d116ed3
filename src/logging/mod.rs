//! Logging and observability
//!
//! Structured logging with:
//! - Console output for operators
//! - JSON-formatted file logs with rotation
//! - Segment-level helper macros
//!
//! # Example
//!
//! ```no_run
//! use billing_migrator::logging::init_logging;
//! use billing_migrator::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Migration started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log the start of a pipeline segment
///
/// ```no_run
/// use billing_migrator::log_segment_start;
///
/// log_segment_start!("clients");
/// ```
#[macro_export]
macro_rules! log_segment_start {
    ($segment:expr) => {
        tracing::info!(segment = %$segment, "Starting segment");
    };
}

/// Log the completion of a pipeline segment with its counts
///
/// ```no_run
/// use billing_migrator::log_segment_complete;
/// use std::time::Duration;
///
/// log_segment_complete!("clients", 120, 3, Duration::from_secs(4));
/// ```
#[macro_export]
macro_rules! log_segment_complete {
    ($segment:expr, $imported:expr, $skipped:expr, $duration:expr) => {
        tracing::info!(
            segment = %$segment,
            imported = $imported,
            skipped = $skipped,
            duration_ms = $duration.as_millis() as u64,
            "Segment completed"
        );
    };
}

/// Log a dependent row skipped because a required mapping is absent
///
/// These skips are not recorded as segment errors.
///
/// ```no_run
/// use billing_migrator::log_foreign_key_miss;
///
/// log_foreign_key_miss!("invoices", "clients", "42");
/// ```
#[macro_export]
macro_rules! log_foreign_key_miss {
    ($dependent:expr, $class:expr, $legacy_id:expr) => {
        tracing::debug!(
            dependent = %$dependent,
            missing_class = %$class,
            legacy_id = %$legacy_id,
            "Skipping row with unmapped reference"
        );
    };
}

/// Log an error with context
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}
