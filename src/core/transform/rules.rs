//! Per-module transformation rule sets
//!
//! Rules are loaded from TOML. Each legacy module identifier maps to a
//! [`ModuleRuleSet`]; identifiers without an entry resolve to the fallback
//! set, so every package always has a rule set to apply.
//!
//! ```toml
//! [fallback]
//! module_class = "none"
//!
//! [modules.cpanel]
//! module_class = "cpanel"
//!
//! [[modules.cpanel.row_meta]]
//! key = "host_name"
//! source = { type = "nested_field", field = "hostname" }
//! callback = "host_or_ip"
//! ```

use super::callbacks::Callback;
use crate::domain::{MigrationError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

const BUILTIN_RULES: &str = include_str!("default_rules.toml");

/// Where a rule takes its base value from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValueSource {
    /// A constant
    Literal { value: Value },
    /// A field of the primary legacy row
    SourceField { field: String },
    /// A field of the module-specific legacy row
    NestedField { field: String },
    /// Produced entirely by the callback
    Computed,
}

/// How to derive one target field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRule {
    pub key: String,
    pub source: ValueSource,
    #[serde(default)]
    pub callback: Option<Callback>,
    #[serde(default)]
    pub serialize: bool,
    #[serde(default)]
    pub encrypt: bool,
}

impl FieldRule {
    fn validate(&self, module: &str) -> Result<()> {
        if self.key.trim().is_empty() {
            return Err(MigrationError::Configuration(format!(
                "rule in module '{module}' has an empty key"
            )));
        }
        match &self.source {
            ValueSource::Computed if self.callback.is_none() => {
                Err(MigrationError::Configuration(format!(
                    "computed rule '{}' in module '{module}' has no callback",
                    self.key
                )))
            }
            ValueSource::SourceField { field } | ValueSource::NestedField { field }
                if field.trim().is_empty() =>
            {
                Err(MigrationError::Configuration(format!(
                    "rule '{}' in module '{module}' names no field",
                    self.key
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Rules for one legacy module type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleRuleSet {
    /// Target module class the legacy module becomes
    pub module_class: String,
    /// Meta written for each module row
    #[serde(default)]
    pub row_meta: Vec<FieldRule>,
    /// Meta written for each package
    #[serde(default)]
    pub package_meta: Vec<FieldRule>,
    /// Fields written for each service
    #[serde(default)]
    pub service_fields: Vec<FieldRule>,
    /// Legacy email merge token -> target merge token
    #[serde(default)]
    pub email_tokens: BTreeMap<String, String>,
}

impl ModuleRuleSet {
    /// Minimal rule set used when nothing else applies
    pub fn fallback() -> Self {
        Self {
            module_class: "none".to_string(),
            row_meta: Vec::new(),
            package_meta: Vec::new(),
            service_fields: Vec::new(),
            email_tokens: BTreeMap::new(),
        }
    }

    fn validate(&self, module: &str) -> Result<()> {
        if self.module_class.trim().is_empty() {
            return Err(MigrationError::Configuration(format!(
                "module '{module}' has an empty module_class"
            )));
        }
        self.row_meta
            .iter()
            .chain(&self.package_meta)
            .chain(&self.service_fields)
            .try_for_each(|rule| rule.validate(module))
    }
}

#[derive(Debug, Deserialize)]
struct RuleFile {
    #[serde(default)]
    fallback: Option<ModuleRuleSet>,
    #[serde(default)]
    modules: BTreeMap<String, ModuleRuleSet>,
}

/// Rule sets keyed by legacy module identifier
#[derive(Debug, Clone)]
pub struct RuleRegistry {
    modules: BTreeMap<String, ModuleRuleSet>,
    fallback: ModuleRuleSet,
}

impl RuleRegistry {
    /// Rules shipped with the migrator
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_RULES)
    }

    /// Load a rule file, or the built-in rules when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let contents = std::fs::read_to_string(path).map_err(|e| {
                    MigrationError::Configuration(format!(
                        "Failed to read rules file {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                Self::from_toml_str(&contents)
            }
            None => Self::builtin(),
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let file: RuleFile = toml::from_str(contents)?;
        let fallback = file.fallback.unwrap_or_else(ModuleRuleSet::fallback);
        fallback.validate("fallback")?;
        for (module, rules) in &file.modules {
            rules.validate(module)?;
        }
        Ok(Self {
            modules: file.modules,
            fallback,
        })
    }

    /// Rule set for a legacy module identifier, or the fallback set
    pub fn rule_set(&self, legacy_module: &str) -> &ModuleRuleSet {
        match self.modules.get(legacy_module.trim()) {
            Some(rules) => rules,
            None => &self.fallback,
        }
    }

    pub fn has_module(&self, legacy_module: &str) -> bool {
        self.modules.contains_key(legacy_module.trim())
    }

    pub fn fallback(&self) -> &ModuleRuleSet {
        &self.fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_rules_load() {
        let registry = RuleRegistry::builtin().unwrap();
        assert!(registry.has_module("cpanel"));
        assert_eq!(registry.rule_set("cpanel").module_class, "cpanel");
        assert!(!registry.rule_set("cpanel").row_meta.is_empty());
    }

    #[test]
    fn test_unknown_module_uses_fallback() {
        let registry = RuleRegistry::builtin().unwrap();
        let rules = registry.rule_set("some_unlisted_module");
        assert_eq!(rules, registry.fallback());
    }

    #[test]
    fn test_missing_fallback_section_uses_minimal_set() {
        let registry = RuleRegistry::from_toml_str("").unwrap();
        assert_eq!(registry.rule_set("cpanel"), &ModuleRuleSet::fallback());
    }

    #[test]
    fn test_computed_rule_requires_callback() {
        let toml = r#"
[modules.custom]
module_class = "custom"

[[modules.custom.package_meta]]
key = "derived"
source = { type = "computed" }
"#;
        let err = RuleRegistry::from_toml_str(toml).unwrap_err();
        assert!(err.to_string().contains("no callback"));
    }

    #[test]
    fn test_literal_source_parses_any_value() {
        let toml = r#"
[modules.custom]
module_class = "custom"

[[modules.custom.package_meta]]
key = "quota"
source = { type = "literal", value = 25 }
serialize = true
"#;
        let registry = RuleRegistry::from_toml_str(toml).unwrap();
        let rule = &registry.rule_set("custom").package_meta[0];
        assert_eq!(
            rule.source,
            ValueSource::Literal {
                value: serde_json::json!(25)
            }
        );
        assert!(rule.serialize);
        assert!(!rule.encrypt);
    }
}
