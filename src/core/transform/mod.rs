//! Field transformation engine
//!
//! Per-module rule sets describe how package, module-row and service meta
//! values are derived from legacy rows:
//!
//! - [`rules`] - rule types and the [`RuleRegistry`] loaded from TOML
//! - [`callbacks`] - named transform functions a rule may reference
//! - [`engine`] - resolves a rule against legacy rows
//! - [`tokens`] - email template merge-token substitution
//!
//! ```rust
//! use billing_migrator::core::transform::{FieldTransformer, RuleContext, RuleRegistry};
//! use billing_migrator::domain::LegacyRecord;
//! use billing_migrator::adapters::services::{AesGcmEncryptor, Encryptor};
//! use billing_migrator::config::secret_string;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # fn example() -> billing_migrator::domain::Result<()> {
//! let registry = RuleRegistry::builtin()?;
//! let encryptor: Arc<dyn Encryptor> =
//!     Arc::new(AesGcmEncryptor::new(&secret_string("key".to_string()))?);
//! let transformer = FieldTransformer::new(encryptor);
//!
//! let package = LegacyRecord::from(json!({"cpanel_package": "gold"}));
//! let ctx = RuleContext::new(Some(&package), None);
//! let meta = transformer.resolve_all(&registry.rule_set("cpanel").package_meta, &ctx)?;
//! assert!(meta.iter().any(|m| m.key == "package" && m.value == "gold"));
//! # Ok(())
//! # }
//! ```

pub mod callbacks;
pub mod engine;
pub mod rules;
pub mod tokens;

pub use callbacks::Callback;
pub use engine::{FieldTransformer, ResolvedField, RuleContext};
pub use rules::{FieldRule, ModuleRuleSet, RuleRegistry, ValueSource};
pub use tokens::TokenSubstitutor;
