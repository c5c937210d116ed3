//! Additional contacts attached to migrated clients

use super::clients::{contact_row, insert_numbers};
use crate::adapters::legacy::LegacyQuery;
use crate::core::migration::{MigrationSession, SegmentStats};
use crate::domain::{EntityClass, Result};

pub async fn import(session: &mut MigrationSession, stats: &mut SegmentStats) -> Result<()> {
    let rows = session.legacy.fetch(LegacyQuery::Contacts).await?;
    let target = session.target.clone();

    for row in rows {
        let Some(legacy_id) = row.id("id") else {
            stats.record_skipped();
            continue;
        };
        let Some(client_id) = session.lookup("contacts", EntityClass::Clients, &row, "client_id")
        else {
            stats.record_skipped();
            continue;
        };

        let contact_id = target
            .insert("contacts", &contact_row(&row, client_id, "other"))
            .await?;
        insert_numbers(target.as_ref(), contact_id, &row).await?;

        session.mapping.set(EntityClass::Contacts, legacy_id, contact_id)?;
        stats.record_imported();
    }

    Ok(())
}
