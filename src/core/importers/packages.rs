//! Packages, with the module registrations they depend on
//!
//! The first package of each legacy module type installs the target module
//! and creates its module rows: one per legacy configuration row of that
//! module, or a single default row when the module has none. Package meta,
//! module-row meta and email token maps all come from the module's rule set.

use super::insert_meta;
use crate::adapters::legacy::LegacyQuery;
use crate::adapters::target::TargetStore;
use crate::core::migration::{MigrationSession, ModuleRegistration, Segment, SegmentStats};
use crate::core::transform::{ModuleRuleSet, ResolvedField, RuleContext, TokenSubstitutor};
use crate::core::util::{round_money, Period};
use crate::domain::{EntityClass, LegacyRecord, MigrationError, Result, TargetId, TargetRow};
use serde_json::Value;
use std::collections::BTreeMap;

pub async fn import(session: &mut MigrationSession, stats: &mut SegmentStats) -> Result<()> {
    let configs = session.legacy.fetch(LegacyQuery::ModuleConfigs).await?;
    let packages = session.legacy.fetch(LegacyQuery::Packages).await?;
    let pricing = super::group_by(
        session.legacy.fetch(LegacyQuery::PackagePricing).await?,
        "package_id",
    );

    let mut configs_by_module: BTreeMap<String, Vec<LegacyRecord>> = BTreeMap::new();
    for config in &configs {
        configs_by_module
            .entry(module_key(config))
            .or_default()
            .push(config.clone());
    }
    let configs_by_id = super::index_by(configs, "id");
    let target = session.target.clone();

    for package in packages {
        let Some(legacy_id) = package.id("id") else {
            stats.record_skipped();
            continue;
        };

        let module = module_key(&package);
        let rules = session.rules.rule_set(&module).clone();
        let module_configs = configs_by_module
            .get(&module)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let registration = ensure_module(session, &module, &rules, module_configs).await?;

        let config_id = package.id("module_config_id");
        let config = config_id.as_ref().and_then(|id| configs_by_id.get(id));
        let module_row_id = config_id
            .as_ref()
            .and_then(|id| session.mapping.get(EntityClass::ModuleRows, id))
            .unwrap_or(registration.default_row);

        let ctx = RuleContext::new(Some(&package), config);
        let meta = session.transformer.resolve_all(&rules.package_meta, &ctx)?;
        let email = match package.opt_text("welcome_email") {
            Some(body) => Some(TokenSubstitutor::new(&rules.email_tokens)?.substitute(&body)),
            None => None,
        };
        let prices = pricing.get(&legacy_id).map(Vec::as_slice).unwrap_or_default();
        let row = package_row(&package, registration.module_id, module_row_id, session);
        let default_currency = session.defaults.currency.clone();

        let result = session
            .executor()
            .atomically(async {
                let package_id = target.insert("packages", &row).await?;
                insert_meta(target.as_ref(), "package_meta", "package_id", package_id, &meta)
                    .await?;

                let mut pricing_ids = Vec::with_capacity(prices.len());
                for price in prices {
                    let pricing_id = target
                        .insert("package_pricing", &pricing_row(package_id, price, &default_currency))
                        .await?;
                    if let Some(legacy_pricing) = price.id("id") {
                        pricing_ids.push((legacy_pricing, pricing_id));
                    }
                }

                if let Some(body) = &email {
                    target
                        .insert(
                            "package_emails",
                            &TargetRow::new()
                                .with("package_id", package_id)
                                .with("lang", "en_us")
                                .with("subject", "")
                                .with("html", body.as_str())
                                .with("text", body.as_str()),
                        )
                        .await?;
                }

                Ok((package_id, pricing_ids))
            })
            .await;

        match result {
            Ok((package_id, pricing_ids)) => {
                session.mapping.set(EntityClass::Packages, legacy_id, package_id)?;
                for (legacy_pricing, pricing_id) in pricing_ids {
                    session
                        .mapping
                        .set(EntityClass::PackagePricing, legacy_pricing, pricing_id)?;
                }
                stats.record_imported();
            }
            Err(e) => {
                session.record_error(Segment::Packages, &e);
                stats.record_skipped();
            }
        }
    }

    Ok(())
}

/// Install the target module for a legacy module type, once per run
async fn ensure_module(
    session: &mut MigrationSession,
    module: &str,
    rules: &ModuleRuleSet,
    configs: &[LegacyRecord],
) -> Result<ModuleRegistration> {
    if let Some(registration) = session.modules.get(module) {
        return Ok(*registration);
    }

    let target = session.target.clone();
    let module_id = session
        .services
        .installer
        .install(target.as_ref(), &rules.module_class, session.company_id())
        .await?;

    let mut row_ids = Vec::with_capacity(configs.len().max(1));
    if configs.is_empty() {
        let meta = session
            .transformer
            .resolve_all(&rules.row_meta, &RuleContext::default())?;
        row_ids.push(create_module_row(target.as_ref(), module_id, &meta).await?);
    } else {
        for config in configs {
            let meta = session
                .transformer
                .resolve_all(&rules.row_meta, &RuleContext::new(None, Some(config)))?;
            let row_id = create_module_row(target.as_ref(), module_id, &meta).await?;
            if let Some(legacy_config) = config.id("id") {
                session
                    .mapping
                    .set(EntityClass::ModuleRows, legacy_config, row_id)?;
            }
            row_ids.push(row_id);
        }
    }

    let Some(&default_row) = row_ids.first() else {
        return Err(MigrationError::Transform(format!(
            "module '{module}' has no module rows"
        )));
    };

    if let Ok(legacy_module) = crate::domain::LegacyId::new(module) {
        session.mapping.set(EntityClass::Modules, legacy_module, module_id)?;
    }

    let registration = ModuleRegistration {
        module_id,
        default_row,
    };
    tracing::info!(
        module,
        class = %rules.module_class,
        module_id = %module_id,
        rows = row_ids.len(),
        "Registered module"
    );
    session.modules.insert(module.to_string(), registration);
    Ok(registration)
}

async fn create_module_row(
    target: &dyn TargetStore,
    module_id: TargetId,
    meta: &[ResolvedField],
) -> Result<TargetId> {
    let row_id = target
        .insert(
            "module_rows",
            &TargetRow::new()
                .with("module_id", module_id)
                .with("status", "active"),
        )
        .await?;
    insert_meta(target, "module_row_meta", "module_row_id", row_id, meta).await?;
    Ok(row_id)
}

/// Legacy module identifier of a package or configuration row
pub(crate) fn module_key(row: &LegacyRecord) -> String {
    row.opt_text("module")
        .map(|m| m.to_ascii_lowercase())
        .unwrap_or_else(|| "none".to_string())
}

fn package_row(
    package: &LegacyRecord,
    module_id: TargetId,
    module_row_id: TargetId,
    session: &MigrationSession,
) -> TargetRow {
    let qty = match package.int("qty") {
        n if n > 0 => Value::from(n),
        _ => Value::Null,
    };
    TargetRow::new()
        .with("id_value", package.text("id"))
        .with("module_id", module_id)
        .with("module_row_id", module_row_id)
        .with("company_id", session.company_id())
        .with("name", package.text("name"))
        .with("description", package.text("description"))
        .with("qty", qty)
        .with("status", super::active_status(package, "status"))
        .with("taxable", i64::from(package.flag("taxable")))
}

/// Legacy price copied verbatim onto a target package
fn pricing_row(package_id: TargetId, price: &LegacyRecord, default_currency: &str) -> TargetRow {
    let period = Period::parse(&price.text("period"));
    TargetRow::new()
        .with("package_id", package_id)
        .with(
            "currency",
            super::currency_code(price, "currency", default_currency),
        )
        .with("term", price.int("term"))
        .with("period", period.as_str())
        .with("price", round_money(price.float("price")))
        .with("setup_fee", round_money(price.float("setup_fee")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_module_key_defaults_to_none() {
        assert_eq!(module_key(&LegacyRecord::from(json!({"module": "cPanel"}))), "cpanel");
        assert_eq!(module_key(&LegacyRecord::from(json!({"module": ""}))), "none");
    }

    #[test]
    fn test_pricing_row_copies_values() {
        let price = LegacyRecord::from(json!({
            "currency": "",
            "term": "12",
            "period": "annually",
            "price": "99.999999",
            "setup_fee": null
        }));
        let row = pricing_row(TargetId::new(4), &price, "USD");
        assert_eq!(row.text("currency"), "USD");
        assert_eq!(row.int("term"), 12);
        assert_eq!(row.text("period"), "year");
        assert_eq!(row.float("price"), 100.0);
        assert_eq!(row.float("setup_fee"), 0.0);
    }
}
