//! Company settings carried over from the legacy global settings table
//!
//! Only settings listed in [`SETTING_MAP`] are migrated. Anything else, and
//! any value a transform cannot convert, is dropped.

use crate::adapters::legacy::LegacyQuery;
use crate::adapters::target::TargetStore;
use crate::core::countries::alpha3_to_alpha2;
use crate::core::migration::{MigrationSession, SegmentStats};
use crate::domain::{Result, TargetRow};

const SECONDS_PER_DAY: i64 = 86_400;

/// Conversion applied to a legacy setting value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingTransform {
    Verbatim,
    /// Seconds rounded up to whole days
    SecondsToDays,
    /// Legacy invoice delivery method to target delivery method list
    InvoiceDelivery,
    /// ISO 3166 alpha-3 country to alpha-2
    CountryAlpha3,
}

impl SettingTransform {
    pub fn apply(self, raw: &str) -> Option<String> {
        let raw = raw.trim();
        match self {
            SettingTransform::Verbatim => Some(raw.to_string()),
            SettingTransform::SecondsToDays => {
                let seconds: i64 = raw.parse().ok()?;
                if seconds < 0 {
                    return None;
                }
                Some((seconds / SECONDS_PER_DAY + i64::from(seconds % SECONDS_PER_DAY != 0)).to_string())
            }
            SettingTransform::InvoiceDelivery => {
                let method = match raw.to_ascii_lowercase().as_str() {
                    "email" => "email",
                    "post" | "mail" | "paper" => "paper",
                    "both" => "email,paper",
                    _ => return None,
                };
                Some(method.to_string())
            }
            SettingTransform::CountryAlpha3 => match raw.len() {
                3 => alpha3_to_alpha2(raw).map(str::to_string),
                2 => Some(raw.to_ascii_uppercase()),
                _ => None,
            },
        }
    }
}

/// Legacy setting name, target setting key, transform
pub const SETTING_MAP: &[(&str, &str, SettingTransform)] = &[
    ("autodebit_days", "autodebit_days_before_due", SettingTransform::Verbatim),
    ("company_email", "company_email", SettingTransform::Verbatim),
    ("company_name", "company_name", SettingTransform::Verbatim),
    ("country", "country", SettingTransform::CountryAlpha3),
    ("date_format", "date_format", SettingTransform::Verbatim),
    ("invoice_days_before_renewal", "inv_days_before_renewal", SettingTransform::Verbatim),
    ("invoice_delivery", "delivery_methods", SettingTransform::InvoiceDelivery),
    ("late_fee_days", "late_fee_days", SettingTransform::Verbatim),
    ("session_timeout", "client_session_days", SettingTransform::SecondsToDays),
    ("tax_id", "tax_id", SettingTransform::Verbatim),
];

/// Target key and converted value of a legacy setting, if it is migrated
pub fn translate(name: &str, raw: &str) -> Option<(&'static str, String)> {
    let (_, key, transform) = SETTING_MAP
        .iter()
        .find(|(legacy, _, _)| legacy.eq_ignore_ascii_case(name.trim()))?;
    Some((*key, transform.apply(raw)?))
}

pub async fn import(session: &mut MigrationSession, stats: &mut SegmentStats) -> Result<()> {
    let rows = session.legacy.fetch(LegacyQuery::Settings).await?;
    let target = session.target.clone();

    for row in rows {
        let name = row.text("key");
        let Some((key, value)) = translate(&name, &row.text("value")) else {
            tracing::debug!(setting = %name, "Dropping legacy setting");
            stats.record_skipped();
            continue;
        };

        upsert_setting(target.as_ref(), session.company_id(), key, &value).await?;
        stats.record_imported();
    }

    Ok(())
}

/// Write a company setting, replacing any existing value
pub(crate) async fn upsert_setting(
    target: &dyn TargetStore,
    company_id: i64,
    key: &str,
    value: &str,
) -> Result<()> {
    let filter = TargetRow::new()
        .with("key", key)
        .with("company_id", company_id);

    if target.select("company_settings", &filter).await?.is_empty() {
        target
            .insert("company_settings", &filter.with("value", value))
            .await?;
    } else {
        target
            .update(
                "company_settings",
                &TargetRow::new().with("value", value),
                &filter,
            )
            .await?;
    }
    Ok(())
}
