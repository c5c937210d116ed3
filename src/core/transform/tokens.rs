//! Email template merge-token substitution

use crate::domain::{MigrationError, Result};
use regex::{Captures, Regex};
use std::collections::BTreeMap;

/// Legacy tokens understood by every template, whatever the module
const UNIVERSAL_TOKENS: &[(&str, &str)] = &[
    ("{client_first_name}", "{contact.first_name}"),
    ("{client_last_name}", "{contact.last_name}"),
    ("{client_email}", "{contact.email}"),
    ("{client_company}", "{contact.company}"),
    ("{client_id}", "{client.id_code}"),
    ("{company_name}", "{company.name}"),
    ("{package_name}", "{package.name}"),
    ("{service_domain}", "{service.domain}"),
    ("{service_renew_date}", "{service.date_renews}"),
    ("{invoice_id}", "{invoice.id_code}"),
];

/// Rewrites legacy merge tokens in template text
///
/// Module tokens take precedence over the universal table. Unknown tokens
/// are left in place so nothing in the template is lost.
pub struct TokenSubstitutor {
    pattern: Regex,
    tokens: BTreeMap<String, String>,
}

impl TokenSubstitutor {
    pub fn new(module_tokens: &BTreeMap<String, String>) -> Result<Self> {
        let pattern = Regex::new(r"\{[A-Za-z0-9_.]+\}")
            .map_err(|e| MigrationError::Transform(format!("Invalid token pattern: {e}")))?;

        let mut tokens: BTreeMap<String, String> = UNIVERSAL_TOKENS
            .iter()
            .map(|(legacy, target)| (legacy.to_string(), target.to_string()))
            .collect();
        tokens.extend(module_tokens.iter().map(|(k, v)| (k.clone(), v.clone())));

        Ok(Self { pattern, tokens })
    }

    pub fn substitute(&self, text: &str) -> String {
        self.pattern
            .replace_all(text, |caps: &Captures<'_>| {
                let token = &caps[0];
                self.tokens
                    .get(token)
                    .cloned()
                    .unwrap_or_else(|| token.to_string())
            })
            .into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_universal_and_module_tokens() {
        let module = BTreeMap::from([(
            "{cpanel_username}".to_string(),
            "{service.cpanel_username}".to_string(),
        )]);
        let substitutor = TokenSubstitutor::new(&module).unwrap();

        let text = "Hi {client_first_name}, your login is {cpanel_username}.";
        assert_eq!(
            substitutor.substitute(text),
            "Hi {contact.first_name}, your login is {service.cpanel_username}."
        );
    }

    #[test]
    fn test_unknown_tokens_are_kept() {
        let substitutor = TokenSubstitutor::new(&BTreeMap::new()).unwrap();
        assert_eq!(
            substitutor.substitute("{mystery} and {package_name}"),
            "{mystery} and {package.name}"
        );
    }

    #[test]
    fn test_module_tokens_override_universal() {
        let module = BTreeMap::from([(
            "{service_domain}".to_string(),
            "{service.plesk_domain}".to_string(),
        )]);
        let substitutor = TokenSubstitutor::new(&module).unwrap();
        assert_eq!(substitutor.substitute("{service_domain}"), "{service.plesk_domain}");
    }
}
