//! Coupons, their discount amount and package restrictions

use crate::adapters::legacy::LegacyQuery;
use crate::core::migration::{MigrationSession, SegmentStats};
use crate::core::util::{parse_id_list, round_money};
use crate::domain::{EntityClass, LegacyId, LegacyRecord, MigrationError, Result, TargetRow};
use serde_json::Value;

pub async fn import(session: &mut MigrationSession, stats: &mut SegmentStats) -> Result<()> {
    let rows = session.legacy.fetch(LegacyQuery::Coupons).await?;
    let target = session.target.clone();

    for row in rows {
        let Some(legacy_id) = row.id("id") else {
            stats.record_skipped();
            continue;
        };

        let max_qty = row.int("max_uses").max(0);
        let recurring = row.flag("recurring");
        let coupon_id = target
            .insert(
                "coupons",
                &TargetRow::new()
                    .with("code", row.text("code"))
                    .with("company_id", session.company_id())
                    .with("used_qty", row.int("used").max(0))
                    .with("max_qty", max_qty)
                    .with("start_date", session.date_value(&row, "start_date"))
                    .with("end_date", session.date_value(&row, "end_date"))
                    .with("status", super::active_status(&row, "status"))
                    .with("type", "exclusive")
                    .with("recurring", i64::from(recurring))
                    .with("limit_recurring", 0),
            )
            .await?;
        session.mapping.set(EntityClass::Coupons, legacy_id, coupon_id)?;

        let kind = discount_type(&row);
        let currency = match kind {
            "percent" => session.defaults.currency.clone(),
            _ => super::currency_code(&row, "currency", &session.defaults.currency),
        };
        let currency_key = LegacyId::new(currency.as_str()).map_err(MigrationError::Validation)?;
        if session.mapping.contains(EntityClass::Currencies, &currency_key) {
            target
                .insert(
                    "coupon_amounts",
                    &TargetRow::new()
                        .with("coupon_id", coupon_id)
                        .with("currency", currency)
                        .with("amount", round_money(row.float("value")))
                        .with("type", kind),
                )
                .await?;
        } else {
            crate::log_foreign_key_miss!("coupon_amounts", EntityClass::Currencies, currency_key);
        }

        for package in parse_id_list(&row.text("packages")) {
            let Some(package_id) = session.mapping.get(EntityClass::Packages, &package) else {
                crate::log_foreign_key_miss!("coupon_packages", EntityClass::Packages, package);
                continue;
            };
            target
                .insert(
                    "coupon_packages",
                    &TargetRow::new()
                        .with("coupon_id", coupon_id)
                        .with("package_id", Value::from(package_id)),
                )
                .await?;
        }

        stats.record_imported();
    }

    Ok(())
}

fn discount_type(row: &LegacyRecord) -> &'static str {
    match row.text("type").trim().to_ascii_lowercase().as_str() {
        "percent" | "percentage" | "%" => "percent",
        _ => "amount",
    }
}
