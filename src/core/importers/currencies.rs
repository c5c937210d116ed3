//! Currencies, keyed by ISO code
//!
//! A currency that already exists in the target for the company is not
//! inserted again; its code is mapped to the existing row and the import
//! continues with the next currency.

use crate::adapters::legacy::LegacyQuery;
use crate::core::migration::{MigrationSession, SegmentStats};
use crate::core::util::format_datetime;
use crate::domain::{EntityClass, LegacyId, MigrationError, Result, TargetRow};

pub async fn import(session: &mut MigrationSession, stats: &mut SegmentStats) -> Result<()> {
    let rows = session.legacy.fetch(LegacyQuery::Currencies).await?;
    let target = session.target.clone();
    let company_id = session.company_id();

    for row in rows {
        let Some(code) = row.opt_text("code").map(|c| c.to_ascii_uppercase()) else {
            stats.record_skipped();
            continue;
        };
        let legacy_id = LegacyId::new(code.as_str()).map_err(MigrationError::Validation)?;
        if session.mapping.contains(EntityClass::Currencies, &legacy_id) {
            tracing::debug!(currency = %code, "Duplicate legacy currency row");
            stats.record_skipped();
            continue;
        }

        let key = TargetRow::new()
            .with("code", code.as_str())
            .with("company_id", company_id);
        let existing = target.select("currencies", &key).await?;

        if let Some(existing_id) = existing.first().and_then(|c| c.id()) {
            tracing::info!(currency = %code, "Currency already exists in target, reusing it");
            session.mapping.set(EntityClass::Currencies, legacy_id, existing_id)?;
            stats.record_skipped();
            continue;
        }

        let rate = row.float("rate");
        let currency_id = target
            .insert(
                "currencies",
                &key.with(
                    "format",
                    row.opt_text("format").unwrap_or_else(|| "#,###.##".to_string()),
                )
                .with("prefix", row.text("prefix"))
                .with("suffix", row.text("suffix"))
                .with("exchange_rate", if rate > 0.0 { rate } else { 1.0 })
                .with("exchange_updated", format_datetime(session.now)),
            )
            .await?;

        session.mapping.set(EntityClass::Currencies, legacy_id, currency_id)?;
        stats.record_imported();
    }

    Ok(())
}
