//! Migration coordinator - runs the segment pipeline
//!
//! The coordinator resolves global defaults from the legacy settings, then
//! runs every segment in [`Segment::ORDER`]. Each segment runs inside a
//! guard: an error is recorded against the segment and the next segment
//! starts regardless. Only setup failures (before the first segment) are
//! returned as `Err`.

use super::segment::Segment;
use super::session::{GlobalDefaults, MigrationSession};
use super::summary::{MigrationSummary, SegmentReport, SegmentStats, SegmentStatus};
use crate::adapters::legacy::{LegacyQuery, LegacyStore};
use crate::adapters::memory::MemoryTargetStore;
use crate::adapters::services::MigrationServices;
use crate::adapters::target::TargetStore;
use crate::config::{resolve_package_overrides, MigrationConfig, MAX_INVOICE_LEAD_DAYS};
use crate::core::importers;
use crate::core::transform::RuleRegistry;
use crate::core::util::resolve_timezone;
use crate::domain::context::ResultExt;
use crate::domain::{EntityClass, Result};
use crate::{log_segment_complete, log_segment_start};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

pub struct MigrationCoordinator {
    session: MigrationSession,
    dry_run_store: Option<Arc<MemoryTargetStore>>,
}

impl MigrationCoordinator {
    /// Build a coordinator for one run
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the rule file or the package
    /// override table cannot be loaded.
    pub fn new(
        settings: MigrationConfig,
        legacy: Arc<dyn LegacyStore>,
        target: Arc<dyn TargetStore>,
        services: MigrationServices,
    ) -> Result<Self> {
        let rules = RuleRegistry::load(settings.rules_path.as_deref().map(Path::new))?;
        let package_overrides = resolve_package_overrides(&settings)?;

        let mut session = MigrationSession::new(settings, legacy, target, services, rules);
        session.package_overrides = package_overrides;

        Ok(Self {
            session,
            dry_run_store: None,
        })
    }

    /// Mark the run as a dry run into `store`, whose table counts are reported
    pub fn with_dry_run_store(mut self, store: Arc<MemoryTargetStore>) -> Self {
        self.dry_run_store = Some(store);
        self
    }

    /// Override the reference time used for renewal corrections
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.session.now = now;
        self
    }

    /// Execute the migration
    ///
    /// # Errors
    ///
    /// Returns an error only when the legacy settings cannot be read; once
    /// segments start, failures are recorded in the summary instead.
    pub async fn run(mut self) -> Result<MigrationSummary> {
        let start_time = Instant::now();
        let mut summary = MigrationSummary::new(self.dry_run_store.is_some());

        tracing::info!(
            legacy = self.session.legacy.name(),
            target = self.session.target.name(),
            "Starting migration"
        );

        self.session.defaults = self.resolve_defaults().await?;
        tracing::info!(
            currency = %self.session.defaults.currency,
            timezone = %self.session.defaults.timezone,
            invoice_lead_days = self.session.defaults.invoice_lead_days,
            "Resolved global defaults"
        );

        self.seed_package_overrides();

        for segment in Segment::ORDER {
            let report = self.run_segment(segment).await;
            summary.segments.push(report);
        }

        let MigrationCoordinator {
            session,
            dry_run_store,
        } = self;

        summary.errors = session.errors;
        summary.mapping = session.mapping;
        summary.table_counts = dry_run_store.map(|store| store.table_counts());

        let summary = summary.with_duration(start_time.elapsed());
        summary.log_summary();
        Ok(summary)
    }

    async fn run_segment(&mut self, segment: Segment) -> SegmentReport {
        let started = Instant::now();

        if segment.skipped_by_package_overrides() && self.session.package_overrides.is_some() {
            tracing::info!(
                segment = %segment,
                "Skipping segment: manual package override table supplied"
            );
            return SegmentReport {
                segment,
                status: SegmentStatus::Skipped,
                imported: 0,
                skipped: 0,
                duration: started.elapsed(),
            };
        }

        log_segment_start!(segment);
        let mut stats = SegmentStats::default();
        let status = match importers::import(segment, &mut self.session, &mut stats).await {
            Ok(()) => SegmentStatus::Completed,
            Err(e) => {
                self.session.record_error(segment, &e);
                SegmentStatus::Failed
            }
        };

        let duration = started.elapsed();
        log_segment_complete!(segment, stats.imported, stats.skipped, duration);

        SegmentReport {
            segment,
            status,
            imported: stats.imported,
            skipped: stats.skipped,
            duration,
        }
    }

    async fn resolve_defaults(&self) -> Result<GlobalDefaults> {
        let rows = self
            .session
            .legacy
            .fetch(LegacyQuery::Settings)
            .await
            .context("Failed to read legacy settings")?;

        let settings: BTreeMap<String, String> = rows
            .iter()
            .filter_map(|row| Some((row.opt_text("key")?, row.text("value"))))
            .collect();
        let configured = &self.session.settings;

        let currency = settings
            .get("default_currency")
            .map(|c| c.trim().to_ascii_uppercase())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| configured.default_currency.clone());

        let timezone = resolve_timezone(
            settings.get("timezone").map(String::as_str),
            &configured.default_timezone,
        );

        let invoice_lead_days = match settings.get("invoice_days_before_renewal") {
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(days) if (0..=MAX_INVOICE_LEAD_DAYS).contains(&days) => days,
                _ => {
                    tracing::warn!(
                        value = %raw,
                        fallback = configured.invoice_lead_days,
                        "Ignoring out-of-range legacy invoice_days_before_renewal"
                    );
                    configured.invoice_lead_days
                }
            },
            None => configured.invoice_lead_days,
        };

        Ok(GlobalDefaults {
            currency,
            timezone,
            invoice_lead_days,
        })
    }

    /// Register manual package overrides as if the Packages segment created them
    fn seed_package_overrides(&mut self) {
        let Some(overrides) = self.session.package_overrides.clone() else {
            return;
        };
        for (legacy, target) in overrides {
            if let Err(e) = self.session.mapping.set(EntityClass::Packages, legacy, target) {
                self.session.record_error(Segment::Packages, &e);
            }
        }
        tracing::info!(
            count = self.session.mapping.len(EntityClass::Packages),
            "Seeded package mapping from override table"
        );
    }
}
