//! Tax rules; each row is imported on its own

use crate::adapters::legacy::LegacyQuery;
use crate::core::migration::{MigrationSession, SegmentStats};
use crate::domain::{EntityClass, Result, TargetRow};

pub async fn import(session: &mut MigrationSession, stats: &mut SegmentStats) -> Result<()> {
    let rows = session.legacy.fetch(LegacyQuery::Taxes).await?;
    let target = session.target.clone();

    for row in rows {
        let Some(legacy_id) = row.id("id") else {
            stats.record_skipped();
            continue;
        };

        let tax_id = target
            .insert(
                "taxes",
                &TargetRow::new()
                    .with("company_id", session.company_id())
                    .with("level", row.int("level").clamp(1, 2))
                    .with("name", row.text("name"))
                    .with("amount", row.float("rate"))
                    .with("type", "exclusive")
                    .with("country", row.text("country").trim().to_ascii_uppercase())
                    .with("state", row.text("state"))
                    .with("status", "active"),
            )
            .await?;

        session.mapping.set(EntityClass::Taxes, legacy_id, tax_id)?;
        stats.record_imported();
    }

    Ok(())
}
