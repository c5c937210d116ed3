//! Rule resolution
//!
//! A rule's base value comes from its [`ValueSource`], optionally passes
//! through its callback, and is then rendered to the text stored in the
//! target meta tables. `serialize` and `encrypt` are applied in that order
//! and independently of each other. A field missing from the legacy row
//! resolves to `null` and still goes through both steps.

use super::rules::{FieldRule, ValueSource};
use crate::adapters::services::Encryptor;
use crate::domain::{LegacyRecord, Result};
use serde_json::Value;
use std::sync::Arc;

/// Legacy rows a rule may read from
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleContext<'a> {
    /// Primary row (package or service)
    pub source: Option<&'a LegacyRecord>,
    /// Module-specific row (module configuration)
    pub nested: Option<&'a LegacyRecord>,
}

impl<'a> RuleContext<'a> {
    pub fn new(source: Option<&'a LegacyRecord>, nested: Option<&'a LegacyRecord>) -> Self {
        Self { source, nested }
    }
}

/// A rule resolved to its stored form
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedField {
    pub key: String,
    pub value: String,
    pub serialized: bool,
    pub encrypted: bool,
}

#[derive(Clone)]
pub struct FieldTransformer {
    encryptor: Arc<dyn Encryptor>,
}

impl FieldTransformer {
    pub fn new(encryptor: Arc<dyn Encryptor>) -> Self {
        Self { encryptor }
    }

    /// Value of a rule before serialization and encryption
    pub fn value(rule: &FieldRule, ctx: &RuleContext<'_>) -> Value {
        let base = match &rule.source {
            ValueSource::Literal { value } => value.clone(),
            ValueSource::SourceField { field } => {
                ctx.source.map(|row| row.value(field)).unwrap_or(Value::Null)
            }
            ValueSource::NestedField { field } => {
                ctx.nested.map(|row| row.value(field)).unwrap_or(Value::Null)
            }
            ValueSource::Computed => Value::Null,
        };

        match rule.callback {
            Some(callback) => callback.apply(base, ctx),
            None => base,
        }
    }

    /// Resolve one rule
    ///
    /// # Errors
    ///
    /// Only the encryption service can fail; missing fields never do.
    pub fn resolve(&self, rule: &FieldRule, ctx: &RuleContext<'_>) -> Result<ResolvedField> {
        let value = Self::value(rule, ctx);

        let mut stored = if rule.serialize {
            serde_json::to_string(&value)?
        } else {
            render(&value)
        };

        if rule.encrypt {
            stored = self.encryptor.encrypt(&stored)?;
        }

        Ok(ResolvedField {
            key: rule.key.clone(),
            value: stored,
            serialized: rule.serialize,
            encrypted: rule.encrypt,
        })
    }

    pub fn resolve_all(
        &self,
        rules: &[FieldRule],
        ctx: &RuleContext<'_>,
    ) -> Result<Vec<ResolvedField>> {
        rules.iter().map(|rule| self.resolve(rule, ctx)).collect()
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transform::Callback;
    use crate::domain::MigrationError;
    use serde_json::json;

    /// Reversible stand-in so tests can see what was encrypted
    struct Reverse;

    impl Encryptor for Reverse {
        fn encrypt(&self, plaintext: &str) -> Result<String> {
            Ok(format!("enc:{}", plaintext.chars().rev().collect::<String>()))
        }
    }

    struct Broken;

    impl Encryptor for Broken {
        fn encrypt(&self, _plaintext: &str) -> Result<String> {
            Err(MigrationError::Encryption("service unavailable".to_string()))
        }
    }

    fn rule(key: &str, source: ValueSource) -> FieldRule {
        FieldRule {
            key: key.to_string(),
            source,
            callback: None,
            serialize: false,
            encrypt: false,
        }
    }

    fn transformer() -> FieldTransformer {
        FieldTransformer::new(Arc::new(Reverse))
    }

    #[test]
    fn test_literal_and_source_fields() {
        let package = LegacyRecord::from(json!({"cpanel_package": "gold", "qty": 3}));
        let config = LegacyRecord::from(json!({"hostname": "web1.test"}));
        let ctx = RuleContext::new(Some(&package), Some(&config));

        let literal = rule("type", ValueSource::Literal { value: json!("standard") });
        let source = rule(
            "package",
            ValueSource::SourceField {
                field: "cpanel_package".to_string(),
            },
        );
        let nested = rule(
            "host",
            ValueSource::NestedField {
                field: "hostname".to_string(),
            },
        );
        let numeric = rule("qty", ValueSource::SourceField { field: "qty".to_string() });

        let resolved = transformer()
            .resolve_all(&[literal, source, nested, numeric], &ctx)
            .unwrap();
        let values: Vec<&str> = resolved.iter().map(|r| r.value.as_str()).collect();
        assert_eq!(values, vec!["standard", "gold", "web1.test", "3"]);
    }

    #[test]
    fn test_missing_field_still_serialized_and_encrypted() {
        let package = LegacyRecord::from(json!({"id": 1}));
        let ctx = RuleContext::new(Some(&package), None);

        let mut missing = rule(
            "password",
            ValueSource::NestedField {
                field: "password".to_string(),
            },
        );
        missing.serialize = true;
        missing.encrypt = true;

        let resolved = transformer().resolve(&missing, &ctx).unwrap();
        assert!(resolved.serialized);
        assert!(resolved.encrypted);
        // "null" serialized, then reversed by the stand-in encryptor
        assert_eq!(resolved.value, "enc:llun");
    }

    #[test]
    fn test_serialize_before_encrypt() {
        let mut both = rule("names", ValueSource::Literal { value: json!(["a"]) });
        both.serialize = true;
        both.encrypt = true;

        let resolved = transformer().resolve(&both, &RuleContext::default()).unwrap();
        assert_eq!(resolved.value, "enc:]\"a\"[");
    }

    #[test]
    fn test_computed_rule_uses_context() {
        let config = LegacyRecord::from(json!({"ns1": "a.ns.test", "ns2": "b.ns.test"}));
        let mut computed = rule("name_servers", ValueSource::Computed);
        computed.callback = Some(Callback::NameServers);
        computed.serialize = true;

        let resolved = transformer()
            .resolve(&computed, &RuleContext::new(None, Some(&config)))
            .unwrap();
        assert_eq!(resolved.value, r#"["a.ns.test","b.ns.test"]"#);
    }

    #[test]
    fn test_encryptor_failure_propagates() {
        let mut secret = rule("key", ValueSource::Literal { value: json!("x") });
        secret.encrypt = true;

        let err = FieldTransformer::new(Arc::new(Broken))
            .resolve(&secret, &RuleContext::default())
            .unwrap_err();
        assert!(matches!(err, MigrationError::Encryption(_)));
    }
}
