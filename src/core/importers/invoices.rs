//! Invoices and their lines
//!
//! Lines arrive as one stream of invoice headers joined with their lines,
//! ordered by invoice id then line id. A header is created the first time
//! its invoice id appears; the line-order counter restarts at zero for
//! every new invoice. Totals are never copied from the legacy header: they
//! are computed by the invoice presenter from the lines written here, when
//! the stream moves to the next invoice and once more at the end.

use crate::adapters::legacy::LegacyQuery;
use crate::adapters::services::{InvoicePresenter, PresentedLine, TaxRate};
use crate::adapters::target::TargetStore;
use crate::core::migration::{MigrationSession, SegmentStats};
use crate::core::util::round_money;
use crate::domain::{
    EntityClass, LegacyId, LegacyRecord, MigrationError, Result, TargetId, TargetRow,
};
use serde_json::Value;

/// The invoice currently being streamed
struct OpenInvoice {
    legacy_id: LegacyId,
    /// `None` when the header was skipped; its lines are skipped too
    target: Option<TargetId>,
    country: String,
    next_order: i64,
}

pub async fn import(session: &mut MigrationSession, stats: &mut SegmentStats) -> Result<()> {
    let rows = session.legacy.fetch(LegacyQuery::InvoiceLines).await?;
    let target = session.target.clone();
    let presenter = session.services.presenter.clone();
    let taxes = target
        .select("taxes", &TargetRow::new().with("company_id", session.company_id()))
        .await?;

    let mut open: Option<OpenInvoice> = None;

    for row in rows {
        let Some(invoice_id) = row.id("invoice_id") else {
            continue;
        };

        let is_new = open.as_ref().map_or(true, |o| o.legacy_id != invoice_id);
        if is_new {
            if let Some(previous) = open.take() {
                finalize(target.as_ref(), presenter.as_ref(), &previous, &taxes).await?;
            }

            let header = create_header(session, &row, &invoice_id).await?;
            match header {
                Some(_) => stats.record_imported(),
                None => stats.record_skipped(),
            }
            open = Some(OpenInvoice {
                legacy_id: invoice_id,
                target: header,
                country: row.text("client_country").trim().to_ascii_uppercase(),
                next_order: 0,
            });
        }

        let Some(current) = open.as_mut() else {
            continue;
        };
        let (Some(invoice), Some(line_legacy_id)) = (current.target, row.id("line_id")) else {
            continue;
        };

        let line_id = target
            .insert(
                "invoice_lines",
                &TargetRow::new()
                    .with("invoice_id", invoice)
                    .with("description", row.text("description"))
                    .with("qty", row.float("qty"))
                    .with("amount", round_money(row.float("amount")))
                    .with("order", current.next_order),
            )
            .await?;
        current.next_order += 1;
        session
            .mapping
            .set(EntityClass::InvoiceLines, line_legacy_id, line_id)?;

        if row.flag("taxed") {
            for (tax_id, level) in applicable_taxes(&taxes, &current.country) {
                target
                    .insert(
                        "invoice_line_taxes",
                        &TargetRow::new()
                            .with("line_id", line_id)
                            .with("tax_id", tax_id)
                            .with("cascade", i64::from(presenter.cascades(level))),
                    )
                    .await?;
            }
        }
    }

    if let Some(last) = open.take() {
        finalize(target.as_ref(), presenter.as_ref(), &last, &taxes).await?;
    }

    Ok(())
}

/// Create the invoice header, or `None` when its client or currency is unmapped
async fn create_header(
    session: &mut MigrationSession,
    row: &LegacyRecord,
    legacy_id: &LegacyId,
) -> Result<Option<TargetId>> {
    let Some(client_id) = session.lookup("invoices", EntityClass::Clients, row, "client_id") else {
        return Ok(None);
    };

    let currency = super::currency_code(row, "currency", &session.defaults.currency);
    let currency_key = LegacyId::new(currency.as_str()).map_err(MigrationError::Validation)?;
    if !session.mapping.contains(EntityClass::Currencies, &currency_key) {
        crate::log_foreign_key_miss!("invoices", EntityClass::Currencies, currency_key);
        return Ok(None);
    }

    let (status, date_closed) = match row.text("status").trim().to_ascii_lowercase().as_str() {
        "paid" => ("active", session.date_value(row, "date_paid")),
        "cancelled" | "canceled" => ("void", Value::Null),
        _ => ("active", Value::Null),
    };

    let invoice_id = session
        .target
        .insert(
            "invoices",
            &TargetRow::new()
                .with("id_value", legacy_id.as_str())
                .with("client_id", client_id)
                .with("date_billed", session.date_value_or_now(row, "date_billed"))
                .with("date_due", session.date_value_or_now(row, "date_due"))
                .with("date_closed", date_closed)
                .with("status", status)
                .with("currency", currency)
                .with("note_public", row.text("notes"))
                .with("subtotal", 0.0)
                .with("total", 0.0)
                .with("paid", 0.0),
        )
        .await?;

    session
        .mapping
        .set(EntityClass::Invoices, legacy_id.clone(), invoice_id)?;
    Ok(Some(invoice_id))
}

async fn finalize(
    target: &dyn TargetStore,
    presenter: &dyn InvoicePresenter,
    invoice: &OpenInvoice,
    taxes: &[TargetRow],
) -> Result<()> {
    if let Some(invoice_id) = invoice.target {
        finalize_totals(target, presenter, invoice_id, taxes).await?;
        refresh_paid(target, invoice_id).await?;
    }
    Ok(())
}

/// Recompute subtotal and total of an invoice from its migrated lines
pub(crate) async fn finalize_totals(
    target: &dyn TargetStore,
    presenter: &dyn InvoicePresenter,
    invoice_id: TargetId,
    taxes: &[TargetRow],
) -> Result<()> {
    let lines = target
        .select("invoice_lines", &TargetRow::new().with("invoice_id", invoice_id))
        .await?;

    let mut presented = Vec::with_capacity(lines.len());
    for line in &lines {
        let Some(line_id) = line.id() else {
            continue;
        };
        let line_taxes = target
            .select("invoice_line_taxes", &TargetRow::new().with("line_id", line_id))
            .await?;
        let rates = line_taxes
            .iter()
            .filter_map(|lt| {
                let tax_id = lt.int("tax_id");
                taxes.iter().find(|t| t.int("id") == tax_id)
            })
            .map(|tax| TaxRate {
                level: tax.int("level"),
                rate: tax.float("amount"),
            })
            .collect();
        presented.push(PresentedLine {
            qty: line.float("qty"),
            unit_amount: line.float("amount"),
            taxes: rates,
        });
    }

    let totals = presenter.totals(&presented);
    target
        .update(
            "invoices",
            &TargetRow::new()
                .with("subtotal", totals.subtotal)
                .with("total", totals.total),
            &TargetRow::new().with("id", invoice_id),
        )
        .await?;
    Ok(())
}

/// Set an invoice's paid amount to the sum of its allocation rows
pub(crate) async fn refresh_paid(target: &dyn TargetStore, invoice_id: TargetId) -> Result<f64> {
    let applied = target
        .select(
            "transaction_applied",
            &TargetRow::new().with("invoice_id", invoice_id),
        )
        .await?;
    let paid = round_money(applied.iter().map(|a| a.float("amount")).sum());

    target
        .update(
            "invoices",
            &TargetRow::new().with("paid", paid),
            &TargetRow::new().with("id", invoice_id),
        )
        .await?;
    Ok(paid)
}

/// At most one tax per level for a client country; country-specific rules win over global ones
fn applicable_taxes(taxes: &[TargetRow], country: &str) -> Vec<(TargetId, i64)> {
    [1, 2]
        .into_iter()
        .filter_map(|level| {
            let at_level = || taxes.iter().filter(move |t| t.int("level") == level);
            at_level()
                .find(|t| !country.is_empty() && t.text("country").eq_ignore_ascii_case(country))
                .or_else(|| at_level().find(|t| t.text("country").is_empty()))
                .and_then(TargetRow::id)
                .map(|id| (id, level))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryTargetStore;
    use crate::adapters::services::TaxPresenter;

    fn tax(id: i64, level: i64, country: &str, amount: f64) -> TargetRow {
        TargetRow::new()
            .with("id", id)
            .with("level", level)
            .with("country", country)
            .with("amount", amount)
    }

    #[test]
    fn test_applicable_taxes_prefers_country() {
        let taxes = vec![
            tax(1, 1, "", 5.0),
            tax(2, 1, "US", 7.0),
            tax(3, 2, "", 1.0),
            tax(4, 2, "DE", 19.0),
        ];
        assert_eq!(
            applicable_taxes(&taxes, "US"),
            vec![(TargetId::new(2), 1), (TargetId::new(3), 2)]
        );
        assert_eq!(
            applicable_taxes(&taxes, ""),
            vec![(TargetId::new(1), 1), (TargetId::new(3), 2)]
        );
    }

    #[tokio::test]
    async fn test_finalize_totals_from_lines() {
        let store = MemoryTargetStore::new();
        let invoice = store
            .insert("invoices", &TargetRow::new().with("subtotal", 999.0))
            .await
            .unwrap();
        let line = store
            .insert(
                "invoice_lines",
                &TargetRow::new()
                    .with("invoice_id", invoice)
                    .with("qty", 2.0)
                    .with("amount", 50.0),
            )
            .await
            .unwrap();
        store
            .insert(
                "invoice_line_taxes",
                &TargetRow::new().with("line_id", line).with("tax_id", 1),
            )
            .await
            .unwrap();

        let taxes = vec![tax(1, 1, "", 10.0)];
        finalize_totals(&store, &TaxPresenter::default(), invoice, &taxes)
            .await
            .unwrap();

        let row = &store.rows("invoices")[0];
        assert_eq!(row.float("subtotal"), 100.0);
        assert_eq!(row.float("total"), 110.0);
    }

    #[tokio::test]
    async fn test_refresh_paid_sums_allocations() {
        let store = MemoryTargetStore::new();
        let invoice = store
            .insert("invoices", &TargetRow::new().with("paid", 0.0))
            .await
            .unwrap();
        for (transaction, amount) in [(1, 10.0), (2, 2.5)] {
            store
                .insert(
                    "transaction_applied",
                    &TargetRow::new()
                        .with("transaction_id", transaction)
                        .with("invoice_id", invoice)
                        .with("amount", amount),
                )
                .await
                .unwrap();
        }

        let paid = refresh_paid(&store, invoice).await.unwrap();
        assert_eq!(paid, 12.5);
        assert_eq!(store.rows("invoices")[0].float("paid"), 12.5);
    }
}
