//! Migration session: the state shared by every importer of one run

use super::segment::Segment;
use super::summary::SegmentError;
use crate::adapters::legacy::LegacyStore;
use crate::adapters::services::MigrationServices;
use crate::adapters::target::TargetStore;
use crate::config::MigrationConfig;
use crate::core::executor::TransactionalExecutor;
use crate::core::mapping::IdentityMap;
use crate::core::transform::{FieldTransformer, RuleRegistry};
use crate::core::util::{format_datetime, parse_legacy_datetime};
use crate::domain::{EntityClass, LegacyId, LegacyRecord, MigrationError, TargetId};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Defaults resolved from the legacy global settings before any segment runs
#[derive(Debug, Clone)]
pub struct GlobalDefaults {
    /// Default currency code
    pub currency: String,
    /// Timezone legacy timestamps are recorded in
    pub timezone: Tz,
    /// Days before renewal that the legacy system issued invoices
    pub invoice_lead_days: i64,
}

impl GlobalDefaults {
    pub fn from_settings(settings: &MigrationConfig) -> Self {
        Self {
            currency: settings.default_currency.clone(),
            timezone: settings.default_timezone.parse().unwrap_or(Tz::UTC),
            invoice_lead_days: settings.invoice_lead_days,
        }
    }
}

/// A target module registration created by the packages segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleRegistration {
    pub module_id: TargetId,
    /// Row used by packages and services with no specific configuration row
    pub default_row: TargetId,
}

/// Everything one run owns
///
/// Created once per invocation and passed to each importer in turn. The
/// identity map and the error list are only ever touched by the importer
/// currently running.
pub struct MigrationSession {
    pub settings: MigrationConfig,
    pub legacy: Arc<dyn LegacyStore>,
    pub target: Arc<dyn TargetStore>,
    pub services: MigrationServices,
    pub rules: RuleRegistry,
    pub transformer: FieldTransformer,
    pub mapping: IdentityMap,
    pub defaults: GlobalDefaults,
    /// Reference time for renewal corrections
    pub now: DateTime<Utc>,
    pub errors: Vec<SegmentError>,
    /// Module registrations keyed by legacy module identifier
    pub modules: BTreeMap<String, ModuleRegistration>,
    /// Manual legacy -> target package table; Packages is skipped when set
    pub package_overrides: Option<BTreeMap<LegacyId, TargetId>>,
}

impl MigrationSession {
    pub fn new(
        settings: MigrationConfig,
        legacy: Arc<dyn LegacyStore>,
        target: Arc<dyn TargetStore>,
        services: MigrationServices,
        rules: RuleRegistry,
    ) -> Self {
        let transformer = FieldTransformer::new(services.encryptor.clone());
        let defaults = GlobalDefaults::from_settings(&settings);
        Self {
            settings,
            legacy,
            target,
            services,
            rules,
            transformer,
            mapping: IdentityMap::new(),
            defaults,
            now: Utc::now(),
            errors: Vec::new(),
            modules: BTreeMap::new(),
            package_overrides: None,
        }
    }

    pub fn company_id(&self) -> i64 {
        self.settings.company_id
    }

    pub fn executor(&self) -> TransactionalExecutor {
        TransactionalExecutor::new(self.target.clone())
    }

    /// Record a non-fatal error against a segment
    pub fn record_error(&mut self, segment: Segment, error: &MigrationError) {
        tracing::error!(segment = %segment, error = %error, "Segment error");
        self.errors.push(SegmentError::new(segment, error.to_string()));
    }

    /// Resolve a legacy reference column, logging a miss at debug
    ///
    /// An empty or zero reference is not a miss.
    pub fn lookup(
        &self,
        dependent: &str,
        class: EntityClass,
        record: &LegacyRecord,
        column: &str,
    ) -> Option<TargetId> {
        let legacy = record.id(column)?;
        let target = self.mapping.get(class, &legacy);
        if target.is_none() {
            crate::log_foreign_key_miss!(dependent, class, legacy);
        }
        target
    }

    /// Legacy timestamp column converted to UTC
    pub fn datetime(&self, record: &LegacyRecord, column: &str) -> Option<DateTime<Utc>> {
        parse_legacy_datetime(&record.text(column), self.defaults.timezone)
    }

    /// Legacy timestamp column as a target column value (NULL when empty)
    pub fn date_value(&self, record: &LegacyRecord, column: &str) -> Value {
        self.datetime(record, column)
            .map(|d| Value::String(format_datetime(d)))
            .unwrap_or(Value::Null)
    }

    /// Legacy timestamp, or the run's reference time when empty
    pub fn date_value_or_now(&self, record: &LegacyRecord, column: &str) -> Value {
        Value::String(format_datetime(self.datetime(record, column).unwrap_or(self.now)))
    }
}
