//! Domain identifier types with validation
//!
//! Newtype wrappers for the two identifier spaces of a migration: keys read
//! from the legacy dataset and surrogate ids generated by the target schema.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Legacy record key
///
/// Most legacy keys are integers, but currencies are keyed by their ISO code,
/// so the key is kept as a non-empty string.
///
/// # Examples
///
/// ```
/// use billing_migrator::domain::ids::LegacyId;
///
/// let id = LegacyId::from(7);
/// assert_eq!(id.as_str(), "7");
/// assert!(LegacyId::new("  ").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LegacyId(String);

impl LegacyId {
    /// Creates a new LegacyId, rejecting empty keys
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err("Legacy ID cannot be empty".to_string());
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the legacy key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<i64> for LegacyId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for LegacyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LegacyId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for LegacyId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Target surrogate identifier assigned by the target store on insert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetId(i64);

impl TargetId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl From<i64> for TargetId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<TargetId> for Value {
    fn from(id: TargetId) -> Self {
        Value::from(id.0)
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Entity classes tracked by the identity map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityClass {
    Staff,
    Clients,
    Contacts,
    Taxes,
    Currencies,
    Invoices,
    InvoiceLines,
    Transactions,
    Modules,
    ModuleRows,
    Packages,
    PackagePricing,
    Coupons,
    Services,
    SupportDepartments,
    SupportTickets,
    SupportReplies,
}

impl EntityClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityClass::Staff => "staff",
            EntityClass::Clients => "clients",
            EntityClass::Contacts => "contacts",
            EntityClass::Taxes => "taxes",
            EntityClass::Currencies => "currencies",
            EntityClass::Invoices => "invoices",
            EntityClass::InvoiceLines => "invoice_lines",
            EntityClass::Transactions => "transactions",
            EntityClass::Modules => "modules",
            EntityClass::ModuleRows => "module_rows",
            EntityClass::Packages => "packages",
            EntityClass::PackagePricing => "package_pricing",
            EntityClass::Coupons => "coupons",
            EntityClass::Services => "services",
            EntityClass::SupportDepartments => "support_departments",
            EntityClass::SupportTickets => "support_tickets",
            EntityClass::SupportReplies => "support_replies",
        }
    }
}

impl fmt::Display for EntityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_id_trims_and_rejects_empty() {
        assert_eq!(LegacyId::new(" 42 ").unwrap().as_str(), "42");
        assert!(LegacyId::new("").is_err());
        assert!(LegacyId::from_str("   ").is_err());
    }

    #[test]
    fn test_legacy_id_from_currency_code() {
        let id = LegacyId::new("USD").unwrap();
        assert_eq!(id.to_string(), "USD");
    }

    #[test]
    fn test_target_id_into_json() {
        let value: Value = TargetId::new(12).into();
        assert_eq!(value, serde_json::json!(12));
    }

    #[test]
    fn test_entity_class_names() {
        assert_eq!(EntityClass::PackagePricing.as_str(), "package_pricing");
        assert_eq!(
            serde_json::to_string(&EntityClass::SupportTickets).unwrap(),
            "\"support_tickets\""
        );
    }
}
