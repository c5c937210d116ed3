//! Services, their pricing and module fields
//!
//! A service points at a target package price. An existing price of the
//! package with the same normalized term and currency is reused; otherwise a
//! price is created from the legacy package's `term-price` list, or from the
//! service's own amount when the list has no entry for the term.
//!
//! The legacy platform advanced renewal dates only when it issued the
//! renewal invoice. A service whose renewal date already falls inside the
//! pre-invoice window has been invoiced, so its renewal date moves forward
//! by one term.

use super::insert_meta;
use super::packages::module_key;
use crate::adapters::legacy::LegacyQuery;
use crate::adapters::target::TargetStore;
use crate::core::migration::{MigrationSession, Segment, SegmentStats};
use crate::core::transform::{ResolvedField, RuleContext};
use crate::core::util::{format_datetime, normalize_term, parse_price_list, round_money, Period};
use crate::domain::{EntityClass, LegacyRecord, MigrationError, Result, TargetId, TargetRow};
use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Billing term of a legacy service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Term {
    pub term: i64,
    pub period: Period,
}

impl Term {
    pub fn of(record: &LegacyRecord) -> Self {
        let period = Period::parse(&record.text("period"));
        let term = match (record.int("term"), period) {
            (_, Period::Onetime) => 0,
            (n, _) if n > 0 => n,
            _ => 1,
        };
        Self { term, period }
    }

    fn normalized(&self) -> Result<(i64, Period)> {
        normalize_term(self.term, self.period).ok_or_else(|| {
            MigrationError::Transform(format!(
                "service term {} {} is out of range",
                self.term, self.period
            ))
        })
    }
}

pub async fn import(session: &mut MigrationSession, stats: &mut SegmentStats) -> Result<()> {
    let packages = super::index_by(session.legacy.fetch(LegacyQuery::Packages).await?, "id");
    let configs = super::index_by(session.legacy.fetch(LegacyQuery::ModuleConfigs).await?, "id");
    let fields = super::group_by(
        session.legacy.fetch(LegacyQuery::ServiceFields).await?,
        "service_id",
    );
    let services = session.legacy.fetch(LegacyQuery::Services).await?;
    let target = session.target.clone();

    for service in services {
        let Some(legacy_id) = service.id("id") else {
            stats.record_skipped();
            continue;
        };
        let Some(client_id) = session.lookup("services", EntityClass::Clients, &service, "client_id")
        else {
            stats.record_skipped();
            continue;
        };
        let Some(package_id) =
            session.lookup("services", EntityClass::Packages, &service, "package_id")
        else {
            stats.record_skipped();
            continue;
        };

        let package = service.id("package_id").and_then(|id| packages.get(&id));
        let config = package
            .and_then(|p| p.id("module_config_id"))
            .and_then(|id| configs.get(&id));
        let module_row_id = match package.and_then(|p| module_row_for(session, p)) {
            Some(row) => Some(row),
            None => existing_module_row(target.as_ref(), package_id).await?,
        };

        let term = Term::of(&service);
        let currency = super::currency_code(&service, "currency", &session.defaults.currency);
        let price_list = package.map(|p| p.text("prices")).unwrap_or_default();
        let amount = round_money(service.float("amount"));

        let legacy_fields = fields.get(&legacy_id).map(Vec::as_slice).unwrap_or_default();
        let field_record = fields_record(legacy_fields);
        let source = service.merged_with(&field_record);
        let module = package.map(module_key).unwrap_or_else(|| "none".to_string());
        let rules = session.rules.rule_set(&module);
        let resolved = session
            .transformer
            .resolve_all(&rules.service_fields, &RuleContext::new(Some(&source), config))?;
        let service_fields = merge_fields(legacy_fields, resolved);

        let renews = correct_renewal(
            session.datetime(&service, "date_renews"),
            session.now,
            session.defaults.invoice_lead_days,
            term,
        );
        let row = TargetRow::new()
            .with("id_value", legacy_id.as_str())
            .with("client_id", client_id)
            .with("module_row_id", module_row_id.map_or(Value::Null, Value::from))
            .with("qty", 1)
            .with("status", service_status(&service))
            .with("date_added", session.date_value_or_now(&service, "date_added"))
            .with(
                "date_renews",
                renews.map_or(Value::Null, |d| Value::String(format_datetime(d))),
            )
            .with("date_suspended", session.date_value(&service, "date_suspended"))
            .with("date_canceled", session.date_value(&service, "date_canceled"));

        let result = session
            .executor()
            .atomically(async {
                let pricing_id = find_or_create_pricing(
                    target.as_ref(),
                    package_id,
                    term,
                    &currency,
                    &price_list,
                    amount,
                )
                .await?;
                let service_id = target
                    .insert("services", &row.clone().with("pricing_id", pricing_id))
                    .await?;
                insert_meta(
                    target.as_ref(),
                    "service_fields",
                    "service_id",
                    service_id,
                    &service_fields,
                )
                .await?;
                Ok(service_id)
            })
            .await;

        match result {
            Ok(service_id) => {
                session.mapping.set(EntityClass::Services, legacy_id, service_id)?;
                stats.record_imported();
            }
            Err(e) => {
                session.record_error(Segment::Services, &e);
                stats.record_skipped();
            }
        }
    }

    Ok(())
}

/// Module row of a legacy package: its configuration row, else the module default
fn module_row_for(session: &MigrationSession, package: &LegacyRecord) -> Option<TargetId> {
    package
        .id("module_config_id")
        .and_then(|id| session.mapping.get(EntityClass::ModuleRows, &id))
        .or_else(|| {
            session
                .modules
                .get(&module_key(package))
                .map(|registration| registration.default_row)
        })
}

/// Module row of a package that exists only in the target
async fn existing_module_row(
    target: &dyn TargetStore,
    package_id: TargetId,
) -> Result<Option<TargetId>> {
    let rows = target
        .select("packages", &TargetRow::new().with("id", package_id))
        .await?;
    Ok(rows
        .first()
        .map(|p| p.int("module_row_id"))
        .filter(|id| *id > 0)
        .map(TargetId::new))
}

/// Reuse a package price with the same term and currency, or create one
pub(crate) async fn find_or_create_pricing(
    target: &dyn TargetStore,
    package_id: TargetId,
    term: Term,
    currency: &str,
    price_list: &str,
    fallback_amount: f64,
) -> Result<TargetId> {
    let existing = target
        .select("package_pricing", &TargetRow::new().with("package_id", package_id))
        .await?;
    let wanted = Some(term.normalized()?);
    let matching = existing.iter().find(|price| {
        price.text("currency").eq_ignore_ascii_case(currency)
            && normalize_term(price.int("term"), Period::parse(&price.text("period"))) == wanted
    });
    if let Some(id) = matching.and_then(TargetRow::id) {
        return Ok(id);
    }

    let price = parse_price_list(price_list)
        .into_iter()
        .find(|(months, _)| normalize_term(*months, Period::Month) == wanted)
        .map_or(fallback_amount, |(_, price)| price);

    tracing::debug!(
        package_id = %package_id,
        term = term.term,
        period = %term.period,
        currency,
        "Creating package price for service"
    );
    target
        .insert(
            "package_pricing",
            &TargetRow::new()
                .with("package_id", package_id)
                .with("currency", currency)
                .with("term", term.term)
                .with("period", term.period.as_str())
                .with("price", round_money(price))
                .with("setup_fee", 0.0),
        )
        .await
}

/// Advance a renewal date that falls inside the pre-invoice window by one term
pub(crate) fn correct_renewal(
    renews: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    lead_days: i64,
    term: Term,
) -> Option<DateTime<Utc>> {
    let renews = renews?;
    let Some(window_end) =
        Duration::try_days(lead_days.max(0)).and_then(|lead| now.checked_add_signed(lead))
    else {
        return Some(renews);
    };
    if term.period == Period::Onetime || renews < now || renews > window_end {
        return Some(renews);
    }
    term.period.advance(renews, term.term).or(Some(renews))
}

fn fields_record(rows: &[LegacyRecord]) -> LegacyRecord {
    let fields: Map<String, Value> = rows
        .iter()
        .filter_map(|row| Some((row.opt_text("key")?, row.value("value"))))
        .collect();
    LegacyRecord::from(Value::Object(fields))
}

/// Legacy service fields, with rule-derived fields replacing same-named keys
fn merge_fields(legacy: &[LegacyRecord], resolved: Vec<ResolvedField>) -> Vec<ResolvedField> {
    let mut merged: BTreeMap<String, ResolvedField> = legacy
        .iter()
        .filter_map(|row| {
            let key = row.opt_text("key")?;
            Some((
                key.clone(),
                ResolvedField {
                    key,
                    value: row.text("value"),
                    serialized: false,
                    encrypted: false,
                },
            ))
        })
        .collect();
    for field in resolved {
        merged.insert(field.key.clone(), field);
    }
    merged.into_values().collect()
}

fn service_status(row: &LegacyRecord) -> &'static str {
    match row.text("status").trim().to_ascii_lowercase().as_str() {
        "pending" => "pending",
        "suspended" => "suspended",
        "cancelled" | "canceled" | "terminated" => "canceled",
        "in_review" | "fraud" => "in_review",
        _ => "active",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryTargetStore;
    use chrono::TimeZone;
    use serde_json::json;
    use test_case::test_case;

    fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn monthly() -> Term {
        Term {
            term: 1,
            period: Period::Month,
        }
    }

    #[test]
    fn test_term_defaults() {
        let onetime = Term::of(&LegacyRecord::from(json!({"term": 3, "period": "onetime"})));
        assert_eq!(onetime.term, 0);
        let missing = Term::of(&LegacyRecord::from(json!({"period": "year"})));
        assert_eq!(missing, Term { term: 1, period: Period::Year });
    }

    #[test]
    fn test_renewal_inside_window_advances_one_term() {
        let now = utc(2024, 3, 1);
        let renews = correct_renewal(Some(utc(2024, 3, 5)), now, 7, monthly());
        assert_eq!(renews, Some(utc(2024, 4, 5)));
    }

    #[test_case(2024, 3, 20 ; "after the window")]
    #[test_case(2024, 2, 10 ; "already past")]
    fn test_renewal_outside_window_unchanged(y: i32, m: u32, d: u32) {
        let now = utc(2024, 3, 1);
        assert_eq!(
            correct_renewal(Some(utc(y, m, d)), now, 7, monthly()),
            Some(utc(y, m, d))
        );
    }

    #[test_case(Period::Day, 999_999_999_999_999 ; "day term")]
    #[test_case(Period::Year, i64::MAX / 2 ; "year term")]
    fn test_renewal_with_unreachable_term_keeps_legacy_date(period: Period, term: i64) {
        let now = utc(2024, 3, 1);
        let renews = correct_renewal(Some(utc(2024, 3, 5)), now, 7, Term { term, period });
        assert_eq!(renews, Some(utc(2024, 3, 5)));
    }

    #[test]
    fn test_renewal_with_huge_lead_days_keeps_legacy_date() {
        let now = utc(2024, 3, 1);
        let renews = correct_renewal(Some(utc(2024, 3, 5)), now, i64::MAX, monthly());
        assert_eq!(renews, Some(utc(2024, 3, 5)));
    }

    #[tokio::test]
    async fn test_pricing_rejects_overflowing_term() {
        let store = MemoryTargetStore::new();
        let term = Term {
            term: i64::MAX / 2,
            period: Period::Year,
        };
        let err = find_or_create_pricing(&store, TargetId::new(1), term, "USD", "", 5.0)
            .await
            .unwrap_err();
        assert!(matches!(err, MigrationError::Transform(_)));
        assert!(store.rows("package_pricing").is_empty());
    }

    #[tokio::test]
    async fn test_pricing_reused_for_equivalent_term() {
        let store = MemoryTargetStore::new();
        let package = TargetId::new(1);
        let existing = store
            .insert(
                "package_pricing",
                &TargetRow::new()
                    .with("package_id", package)
                    .with("currency", "USD")
                    .with("term", 12)
                    .with("period", "month")
                    .with("price", 100.0),
            )
            .await
            .unwrap();

        let yearly = Term {
            term: 1,
            period: Period::Year,
        };
        let id = find_or_create_pricing(&store, package, yearly, "usd", "", 5.0)
            .await
            .unwrap();
        assert_eq!(id, existing);
        assert_eq!(store.rows("package_pricing").len(), 1);
    }

    #[tokio::test]
    async fn test_pricing_created_from_price_list() {
        let store = MemoryTargetStore::new();
        let package = TargetId::new(1);
        let quarterly = Term {
            term: 3,
            period: Period::Month,
        };

        find_or_create_pricing(&store, package, quarterly, "EUR", "1-10.00,3-27.50", 9.0)
            .await
            .unwrap();
        find_or_create_pricing(&store, package, monthly(), "GBP", "", 9.0)
            .await
            .unwrap();

        let rows = store.rows("package_pricing");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].float("price"), 27.5);
        assert_eq!(rows[1].float("price"), 9.0);
    }

    #[test]
    fn test_rule_fields_replace_legacy_fields() {
        let legacy = vec![
            LegacyRecord::from(json!({"key": "domain", "value": "Example.com"})),
            LegacyRecord::from(json!({"key": "notes", "value": "vip"})),
        ];
        let resolved = vec![ResolvedField {
            key: "domain".to_string(),
            value: "example.com".to_string(),
            serialized: false,
            encrypted: false,
        }];
        let merged = merge_fields(&legacy, resolved);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].value, "example.com");
        assert_eq!(merged[1].value, "vip");
    }
}
