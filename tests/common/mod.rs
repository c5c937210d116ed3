//! Shared fixtures for pipeline integration tests

#![allow(dead_code)]

use billing_migrator::adapters::legacy::LegacyQuery;
use billing_migrator::adapters::memory::{MemoryLegacyStore, MemoryTargetStore};
use billing_migrator::adapters::services::{
    AesGcmEncryptor, MigrationServices, RegistryInstaller, TaxPresenter,
};
use billing_migrator::config::{secret_string, MigrationConfig};
use billing_migrator::core::migration::{MigrationCoordinator, MigrationSummary};
use billing_migrator::domain::{EntityClass, LegacyId, TargetId};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};
use std::sync::Arc;

/// Reference time of every test run
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
}

pub fn services() -> MigrationServices {
    MigrationServices {
        encryptor: Arc::new(
            AesGcmEncryptor::new(&secret_string("integration-test-key".to_string())).unwrap(),
        ),
        presenter: Arc::new(TaxPresenter::default()),
        installer: Arc::new(RegistryInstaller),
    }
}

pub fn settings() -> MigrationConfig {
    MigrationConfig::default()
}

pub fn client(id: i64, email: &str) -> Value {
    json!({
        "id": id,
        "email": email,
        "password": "$2y$10$hash",
        "first_name": "Ada",
        "last_name": "Lovelace",
        "company": "",
        "address1": "1 Main St",
        "city": "Springfield",
        "country": "US",
        "phone": "555-0100",
        "status": "active",
        "date_added": "2020-01-15 10:00:00",
        "currency": "USD",
        "tax_exempt": "0"
    })
}

pub fn service(id: i64, client_id: i64, package_id: i64, renews: &str) -> Value {
    json!({
        "id": id,
        "client_id": client_id,
        "package_id": package_id,
        "term": 1,
        "period": "month",
        "amount": "9.99",
        "currency": "USD",
        "status": "active",
        "date_added": "2023-01-01 00:00:00",
        "date_renews": renews,
        "domain": "example.com"
    })
}

/// One client (7), one currency, one package with a monthly price, one service
pub fn basic_legacy() -> MemoryLegacyStore {
    MemoryLegacyStore::new()
        .with_rows(LegacyQuery::Clients, vec![client(7, "a@example.com")])
        .with_rows(
            LegacyQuery::Currencies,
            vec![json!({"code": "USD", "prefix": "$", "suffix": "", "rate": "1"})],
        )
        .with_rows(
            LegacyQuery::Packages,
            vec![json!({
                "id": 3,
                "module": "",
                "name": "Starter",
                "description": "Starter hosting",
                "status": "active",
                "taxable": "1",
                "qty": 0,
                "prices": "1-9.99,12-99.00",
                "welcome_email": "Welcome {client_first_name}"
            })],
        )
        .with_rows(
            LegacyQuery::PackagePricing,
            vec![json!({
                "id": 11,
                "package_id": 3,
                "currency": "USD",
                "term": 1,
                "period": "month",
                "price": "9.99",
                "setup_fee": "0"
            })],
        )
        .with_rows(
            LegacyQuery::Services,
            vec![service(21, 7, 3, "2024-09-01 00:00:00")],
        )
}

/// Run the pipeline into a fresh in-memory target
pub async fn run(
    legacy: MemoryLegacyStore,
    settings: MigrationConfig,
) -> (MigrationSummary, Arc<MemoryTargetStore>) {
    let target = Arc::new(MemoryTargetStore::new());
    let summary = run_into(legacy, settings, target.clone()).await;
    (summary, target)
}

/// Run the pipeline into a prepared in-memory target
pub async fn run_into(
    legacy: MemoryLegacyStore,
    settings: MigrationConfig,
    target: Arc<MemoryTargetStore>,
) -> MigrationSummary {
    run_with_services(legacy, settings, target, services()).await
}

pub async fn run_with_services(
    legacy: MemoryLegacyStore,
    settings: MigrationConfig,
    target: Arc<MemoryTargetStore>,
    services: MigrationServices,
) -> MigrationSummary {
    MigrationCoordinator::new(settings, Arc::new(legacy), target, services)
        .unwrap()
        .with_now(fixed_now())
        .run()
        .await
        .unwrap()
}

pub fn mapped(summary: &MigrationSummary, class: EntityClass, legacy: i64) -> Option<TargetId> {
    summary.mapping.get(class, &LegacyId::from(legacy))
}
