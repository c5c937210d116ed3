//! Migration summary and reporting

use super::segment::Segment;
use crate::core::mapping::IdentityMap;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Row counts collected by an importer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SegmentStats {
    /// Legacy rows that produced target rows
    pub imported: usize,

    /// Legacy rows left out (unmapped reference, duplicate, failed unit)
    pub skipped: usize,
}

impl SegmentStats {
    pub fn record_imported(&mut self) {
        self.imported += 1;
    }

    pub fn record_skipped(&mut self) {
        self.skipped += 1;
    }
}

/// How a segment ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentStatus {
    Completed,
    /// The importer raised; rows committed before the failure are kept
    Failed,
    /// Not run (packages with a manual override table)
    Skipped,
}

#[derive(Debug, Clone)]
pub struct SegmentReport {
    pub segment: Segment,
    pub status: SegmentStatus,
    pub imported: usize,
    pub skipped: usize,
    pub duration: Duration,
}

/// An error recorded against a segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentError {
    pub segment: Segment,
    pub message: String,
}

impl SegmentError {
    pub fn new(segment: Segment, message: impl Into<String>) -> Self {
        Self {
            segment,
            message: message.into(),
        }
    }
}

impl fmt::Display for SegmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.segment, self.message)
    }
}

/// Outcome of a full run
///
/// A run always attempts every segment, so the outcome is "completed"
/// with zero or more errors rather than pass/fail.
#[derive(Debug, Clone)]
pub struct MigrationSummary {
    /// One report per segment, in execution order
    pub segments: Vec<SegmentReport>,

    /// Flat list of segment-tagged errors
    pub errors: Vec<SegmentError>,

    pub duration: Duration,

    /// True when the target was the in-memory store
    pub dry_run: bool,

    /// Final legacy -> target identity mapping
    pub mapping: IdentityMap,

    /// Rows per target table, filled for dry runs
    pub table_counts: Option<BTreeMap<String, usize>>,
}

impl MigrationSummary {
    pub fn new(dry_run: bool) -> Self {
        Self {
            segments: Vec::new(),
            errors: Vec::new(),
            duration: Duration::from_secs(0),
            dry_run,
            mapping: IdentityMap::new(),
            table_counts: None,
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn report(&self, segment: Segment) -> Option<&SegmentReport> {
        self.segments.iter().find(|r| r.segment == segment)
    }

    pub fn completed_with_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn total_imported(&self) -> usize {
        self.segments.iter().map(|r| r.imported).sum()
    }

    pub fn total_skipped(&self) -> usize {
        self.segments.iter().map(|r| r.skipped).sum()
    }

    /// One-line outcome shown to the operator
    pub fn outcome(&self) -> String {
        match self.errors.len() {
            0 => "Migration completed".to_string(),
            1 => "Migration completed with 1 error".to_string(),
            n => format!("Migration completed with {n} errors"),
        }
    }

    pub fn log_summary(&self) {
        tracing::info!(
            segments = self.segments.len(),
            imported = self.total_imported(),
            skipped = self.total_skipped(),
            duration_secs = self.duration.as_secs(),
            dry_run = self.dry_run,
            "{}",
            self.outcome()
        );

        if self.completed_with_errors() {
            tracing::warn!(error_count = self.errors.len(), "Migration completed with errors");
            for error in &self.errors {
                tracing::warn!(
                    segment = %error.segment,
                    message = %error.message,
                    "Segment error"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(segment: Segment, imported: usize, skipped: usize) -> SegmentReport {
        SegmentReport {
            segment,
            status: SegmentStatus::Completed,
            imported,
            skipped,
            duration: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_segment_error_display() {
        let error = SegmentError::new(Segment::Currencies, "relation does not exist");
        assert_eq!(error.to_string(), "[currencies] relation does not exist");
    }

    #[test]
    fn test_outcome_message() {
        let mut summary = MigrationSummary::new(false);
        assert_eq!(summary.outcome(), "Migration completed");
        assert!(!summary.completed_with_errors());

        summary.errors.push(SegmentError::new(Segment::Staff, "a"));
        assert_eq!(summary.outcome(), "Migration completed with 1 error");

        summary.errors.push(SegmentError::new(Segment::Clients, "b"));
        assert_eq!(summary.outcome(), "Migration completed with 2 errors");
        assert!(summary.completed_with_errors());
    }

    #[test]
    fn test_totals_and_lookup() {
        let mut summary = MigrationSummary::new(true);
        summary.segments.push(report(Segment::Staff, 3, 1));
        summary.segments.push(report(Segment::Clients, 10, 0));

        assert_eq!(summary.total_imported(), 13);
        assert_eq!(summary.total_skipped(), 1);
        assert_eq!(summary.report(Segment::Clients).map(|r| r.imported), Some(10));
        assert!(summary.report(Segment::Misc).is_none());
    }

    #[test]
    fn test_stats_counters() {
        let mut stats = SegmentStats::default();
        stats.record_imported();
        stats.record_imported();
        stats.record_skipped();
        assert_eq!(stats, SegmentStats { imported: 2, skipped: 1 });
    }
}
