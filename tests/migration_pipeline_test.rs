//! Integration tests for the full migration pipeline

mod common;

use billing_migrator::adapters::legacy::LegacyQuery;
use billing_migrator::core::migration::{Segment, SegmentStatus};
use billing_migrator::domain::{EntityClass, TargetRow};
use common::{basic_legacy, mapped, run, settings};
use serde_json::json;

fn billing_legacy() -> billing_migrator::adapters::memory::MemoryLegacyStore {
    basic_legacy()
        .with_rows(
            LegacyQuery::Taxes,
            vec![json!({"id": 1, "level": 1, "name": "VAT", "rate": "10", "country": "", "state": ""})],
        )
        .with_rows(
            LegacyQuery::InvoiceLines,
            vec![
                json!({
                    "invoice_id": 100, "client_id": 7, "date_billed": "2024-05-01 00:00:00",
                    "date_due": "2024-05-15 00:00:00", "status": "unpaid", "currency": "USD",
                    "notes": "", "client_country": "US", "line_id": 1,
                    "description": "Hosting", "qty": "2", "amount": "50", "taxed": "0"
                }),
                json!({
                    "invoice_id": 100, "client_id": 7, "date_billed": "2024-05-01 00:00:00",
                    "date_due": "2024-05-15 00:00:00", "status": "unpaid", "currency": "USD",
                    "notes": "", "client_country": "US", "line_id": 2,
                    "description": "Setup", "qty": "1", "amount": "20", "taxed": "1"
                }),
            ],
        )
}

#[tokio::test]
async fn test_end_to_end_client_package_service() {
    let (summary, target) = run(basic_legacy(), settings()).await;

    assert!(!summary.completed_with_errors(), "errors: {:?}", summary.errors);

    let client_id = mapped(&summary, EntityClass::Clients, 7).expect("client 7 mapped");
    let package_id = mapped(&summary, EntityClass::Packages, 3).expect("package 3 mapped");

    let pricing: Vec<TargetRow> = target
        .rows("package_pricing")
        .into_iter()
        .filter(|p| p.int("package_id") == package_id.value())
        .collect();
    assert_eq!(pricing.len(), 1);
    assert_eq!(pricing[0].float("price"), 9.99);

    let services = target.rows("services");
    assert_eq!(services.len(), 1);
    assert_eq!(services[0].int("pricing_id"), pricing[0].int("id"));
    assert_eq!(services[0].int("client_id"), client_id.value());
    assert_eq!(
        mapped(&summary, EntityClass::Services, 21).map(|id| id.value()),
        Some(services[0].int("id"))
    );
}

#[tokio::test]
async fn test_every_segment_reported_in_order() {
    let (summary, _) = run(basic_legacy(), settings()).await;

    let order: Vec<Segment> = summary.segments.iter().map(|r| r.segment).collect();
    assert_eq!(order, Segment::ORDER.to_vec());
    assert!(summary
        .segments
        .iter()
        .all(|r| r.status == SegmentStatus::Completed));
    assert_eq!(summary.outcome(), "Migration completed");
}

#[tokio::test]
async fn test_package_creates_module_and_default_row() {
    let (_, target) = run(basic_legacy(), settings()).await;

    let modules = target.rows("modules");
    assert_eq!(modules.len(), 1);
    assert_eq!(modules[0].text("class"), "none");

    let rows = target.rows("module_rows");
    assert_eq!(rows.len(), 1);

    let packages = target.rows("packages");
    assert_eq!(packages[0].int("module_row_id"), rows[0].int("id"));
    assert_eq!(packages[0].get("qty"), Some(&serde_json::Value::Null));

    let emails = target.rows("package_emails");
    assert_eq!(emails.len(), 1);
    assert_eq!(emails[0].text("text"), "Welcome {contact.first_name}");
}

#[tokio::test]
async fn test_currencies_failure_does_not_block_invoices() {
    let legacy = billing_legacy().failing_on(LegacyQuery::Currencies);
    let (summary, target) = run(legacy, settings()).await;

    assert_eq!(summary.errors.len(), 1);
    assert_eq!(summary.errors[0].segment, Segment::Currencies);
    assert_eq!(summary.outcome(), "Migration completed with 1 error");

    let currencies = summary.report(Segment::Currencies).unwrap();
    assert_eq!(currencies.status, SegmentStatus::Failed);

    // Invoices still ran; their currency is unmapped so the header is skipped
    let invoices = summary.report(Segment::Invoices).unwrap();
    assert_eq!(invoices.status, SegmentStatus::Completed);
    assert_eq!(invoices.skipped, 1);
    assert!(target.rows("invoices").is_empty());

    // Later segments are unaffected
    assert!(mapped(&summary, EntityClass::Clients, 7).is_some());
    assert_eq!(target.rows("services").len(), 1);
}

#[tokio::test]
async fn test_taxes_failure_keeps_invoices_untaxed() {
    let legacy = billing_legacy().failing_on(LegacyQuery::Taxes);
    let (summary, target) = run(legacy, settings()).await;

    assert_eq!(summary.errors.len(), 1);
    assert_eq!(summary.errors[0].segment, Segment::Taxes);

    let invoices = target.rows("invoices");
    assert_eq!(invoices.len(), 1);
    assert_eq!(invoices[0].float("subtotal"), 120.0);
    assert_eq!(invoices[0].float("total"), 120.0);
    assert!(target.rows("invoice_line_taxes").is_empty());
}

#[tokio::test]
async fn test_unreadable_settings_abort_before_segments() {
    let legacy = basic_legacy().failing_on(LegacyQuery::Settings);
    let target = std::sync::Arc::new(billing_migrator::adapters::memory::MemoryTargetStore::new());
    let coordinator = billing_migrator::core::migration::MigrationCoordinator::new(
        settings(),
        std::sync::Arc::new(legacy),
        target.clone(),
        common::services(),
    )
    .unwrap();

    let result = coordinator.run().await;
    assert!(result.is_err());
    assert!(target.table_counts().values().all(|count| *count == 0));
}

#[tokio::test]
async fn test_repeated_runs_are_identical() {
    let (first_summary, first) = run(billing_legacy(), settings()).await;
    let (second_summary, second) = run(billing_legacy(), settings()).await;

    assert_eq!(first.table_counts(), second.table_counts());
    for table in first.table_counts().keys() {
        assert_eq!(first.rows(table), second.rows(table), "table {table} differs");
    }
    for class in [
        EntityClass::Clients,
        EntityClass::Invoices,
        EntityClass::Packages,
        EntityClass::Services,
    ] {
        assert_eq!(
            first_summary.mapping.entries(class),
            second_summary.mapping.entries(class)
        );
    }
}
