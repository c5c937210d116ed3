//! Segment pipeline
//!
//! - [`coordinator`] - runs the segments in order with per-segment guards
//! - [`session`] - state owned by one run and passed to every importer
//! - [`segment`] - the fixed segment list
//! - [`summary`] - per-segment reports and the run outcome

pub mod coordinator;
pub mod segment;
pub mod session;
pub mod summary;

pub use coordinator::MigrationCoordinator;
pub use segment::Segment;
pub use session::{GlobalDefaults, MigrationSession, ModuleRegistration};
pub use summary::{MigrationSummary, SegmentError, SegmentReport, SegmentStats, SegmentStatus};
