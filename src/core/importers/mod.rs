//! Entity importers, one per pipeline segment
//!
//! Every importer has the same shape: read one or more legacy result sets,
//! build target rows (resolving references through the identity map and
//! meta values through the transformation engine), write them, and register
//! the new ids. A row whose required reference is unmapped is skipped and
//! counted, never raised. An error outside a transactional unit ends the
//! segment; an error inside one rolls back that unit, is recorded, and the
//! importer moves on to the next legacy row.

pub mod clients;
pub mod contacts;
pub mod coupons;
pub mod currencies;
pub mod invoices;
pub mod misc;
pub mod packages;
pub mod services;
pub mod staff;
pub mod support_departments;
pub mod support_tickets;
pub mod taxes;
pub mod transactions;

use crate::adapters::target::TargetStore;
use crate::core::migration::{MigrationSession, Segment, SegmentStats};
use crate::core::transform::ResolvedField;
use crate::domain::{LegacyId, LegacyRecord, Result, TargetId, TargetRow};
use std::collections::BTreeMap;

/// Run the importer for `segment`
pub async fn import(
    segment: Segment,
    session: &mut MigrationSession,
    stats: &mut SegmentStats,
) -> Result<()> {
    match segment {
        Segment::Staff => staff::import(session, stats).await,
        Segment::Clients => clients::import(session, stats).await,
        Segment::Contacts => contacts::import(session, stats).await,
        Segment::Taxes => taxes::import(session, stats).await,
        Segment::Currencies => currencies::import(session, stats).await,
        Segment::Invoices => invoices::import(session, stats).await,
        Segment::Transactions => transactions::import(session, stats).await,
        Segment::Packages => packages::import(session, stats).await,
        Segment::Coupons => coupons::import(session, stats).await,
        Segment::Services => services::import(session, stats).await,
        Segment::SupportDepartments => support_departments::import(session, stats).await,
        Segment::SupportTickets => support_tickets::import(session, stats).await,
        Segment::Misc => misc::import(session, stats).await,
    }
}

/// Write resolved meta values for one owner row
pub(crate) async fn insert_meta(
    target: &dyn TargetStore,
    table: &str,
    owner_column: &str,
    owner_id: TargetId,
    fields: &[ResolvedField],
) -> Result<()> {
    for field in fields {
        let row = TargetRow::new()
            .with(owner_column, owner_id)
            .with("key", field.key.as_str())
            .with("value", field.value.as_str())
            .with("serialized", i64::from(field.serialized))
            .with("encrypted", i64::from(field.encrypted));
        target.insert(table, &row).await?;
    }
    Ok(())
}

/// Group legacy rows by a reference column, keeping stream order inside each group
pub(crate) fn group_by(
    records: Vec<LegacyRecord>,
    column: &str,
) -> BTreeMap<LegacyId, Vec<LegacyRecord>> {
    let mut groups: BTreeMap<LegacyId, Vec<LegacyRecord>> = BTreeMap::new();
    for record in records {
        if let Some(key) = record.id(column) {
            groups.entry(key).or_default().push(record);
        }
    }
    groups
}

/// Index legacy rows by their own key column
pub(crate) fn index_by(records: Vec<LegacyRecord>, column: &str) -> BTreeMap<LegacyId, LegacyRecord> {
    records
        .into_iter()
        .filter_map(|record| Some((record.id(column)?, record)))
        .collect()
}

/// Legacy "active" flag or status text as an active/inactive status
pub(crate) fn active_status(record: &LegacyRecord, column: &str) -> &'static str {
    match record.text(column).trim().to_ascii_lowercase().as_str() {
        "active" | "1" | "true" | "yes" | "" => "active",
        _ => "inactive",
    }
}

/// Currency code of a legacy row, the run default when empty
pub(crate) fn currency_code(record: &LegacyRecord, column: &str, default: &str) -> String {
    record
        .opt_text(column)
        .map(|code| code.to_ascii_uppercase())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_group_by_keeps_order_and_drops_unkeyed() {
        let rows = vec![
            LegacyRecord::from(json!({"package_id": 2, "id": 1})),
            LegacyRecord::from(json!({"package_id": 1, "id": 2})),
            LegacyRecord::from(json!({"package_id": 2, "id": 3})),
            LegacyRecord::from(json!({"package_id": 0, "id": 4})),
        ];
        let groups = group_by(rows, "package_id");
        assert_eq!(groups.len(), 2);
        let ids: Vec<i64> = groups[&LegacyId::from(2)].iter().map(|r| r.int("id")).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_active_status() {
        assert_eq!(active_status(&LegacyRecord::from(json!({"status": "1"})), "status"), "active");
        assert_eq!(
            active_status(&LegacyRecord::from(json!({"status": "disabled"})), "status"),
            "inactive"
        );
    }

    #[test]
    fn test_currency_code_defaults() {
        let row = LegacyRecord::from(json!({"currency": " eur "}));
        assert_eq!(currency_code(&row, "currency", "USD"), "EUR");
        assert_eq!(currency_code(&row, "missing", "USD"), "USD");
    }
}
