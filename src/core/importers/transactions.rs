//! Transactions and their invoice allocations
//!
//! Allocations are upserted on (transaction, invoice): a second allocation
//! for the same pair adds to the existing row. The owning invoice's paid
//! amount is recomputed after every allocation.

use super::invoices::refresh_paid;
use crate::adapters::legacy::LegacyQuery;
use crate::adapters::target::TargetStore;
use crate::core::migration::{MigrationSession, Segment, SegmentStats};
use crate::core::util::round_money;
use crate::domain::{EntityClass, LegacyId, LegacyRecord, MigrationError, Result, TargetId, TargetRow};
use serde_json::Value;

pub async fn import(session: &mut MigrationSession, stats: &mut SegmentStats) -> Result<()> {
    let rows = session.legacy.fetch(LegacyQuery::Transactions).await?;
    let target = session.target.clone();

    for row in rows {
        let Some(legacy_id) = row.id("id") else {
            stats.record_skipped();
            continue;
        };
        let Some(client_id) =
            session.lookup("transactions", EntityClass::Clients, &row, "client_id")
        else {
            stats.record_skipped();
            continue;
        };

        let currency = super::currency_code(&row, "currency", &session.defaults.currency);
        let currency_key = LegacyId::new(currency.as_str()).map_err(MigrationError::Validation)?;
        if !session.mapping.contains(EntityClass::Currencies, &currency_key) {
            crate::log_foreign_key_miss!("transactions", EntityClass::Currencies, currency_key);
            stats.record_skipped();
            continue;
        }

        let transaction_id = target
            .insert(
                "transactions",
                &TargetRow::new()
                    .with("client_id", client_id)
                    .with("amount", round_money(row.float("amount")))
                    .with("currency", currency)
                    .with("type", row.opt_text("type").unwrap_or_else(|| "other".to_string()))
                    .with("gateway", row.text("gateway"))
                    .with("transaction_id", row.text("trans_id"))
                    .with("status", transaction_status(&row))
                    .with("date_added", session.date_value_or_now(&row, "date_added")),
            )
            .await?;

        session
            .mapping
            .set(EntityClass::Transactions, legacy_id, transaction_id)?;
        stats.record_imported();
    }

    import_allocations(session, stats).await
}

async fn import_allocations(session: &mut MigrationSession, stats: &mut SegmentStats) -> Result<()> {
    let rows = session.legacy.fetch(LegacyQuery::TransactionAllocations).await?;
    let target = session.target.clone();

    for row in rows {
        let Some(transaction_id) = session.lookup(
            "transaction_applied",
            EntityClass::Transactions,
            &row,
            "transaction_id",
        ) else {
            stats.record_skipped();
            continue;
        };
        let Some(invoice_id) =
            session.lookup("transaction_applied", EntityClass::Invoices, &row, "invoice_id")
        else {
            stats.record_skipped();
            continue;
        };

        let amount = round_money(row.float("amount"));
        let date = session.date_value_or_now(&row, "date");

        let result = session
            .executor()
            .atomically(async {
                apply(target.as_ref(), transaction_id, invoice_id, amount, date).await?;
                refresh_paid(target.as_ref(), invoice_id).await
            })
            .await;

        if let Err(e) = result {
            session.record_error(Segment::Transactions, &e);
            stats.record_skipped();
        }
    }

    Ok(())
}

/// Insert an allocation, or add to the existing one for the same pair
pub(crate) async fn apply(
    target: &dyn TargetStore,
    transaction_id: TargetId,
    invoice_id: TargetId,
    amount: f64,
    date: Value,
) -> Result<()> {
    let key = TargetRow::new()
        .with("transaction_id", transaction_id)
        .with("invoice_id", invoice_id);

    match target.select("transaction_applied", &key).await?.first() {
        Some(existing) => {
            let total = round_money(existing.float("amount") + amount);
            target
                .update("transaction_applied", &TargetRow::new().with("amount", total), &key)
                .await?;
        }
        None => {
            target
                .insert(
                    "transaction_applied",
                    &key.clone().with("amount", amount).with("date", date),
                )
                .await?;
        }
    }
    Ok(())
}

fn transaction_status(row: &LegacyRecord) -> &'static str {
    match row.text("status").trim().to_ascii_lowercase().as_str() {
        "approved" | "paid" => "approved",
        "pending" => "pending",
        "refunded" => "refunded",
        _ => "declined",
    }
}
