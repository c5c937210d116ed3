//! Named transform functions referenced by rules

use super::engine::RuleContext;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const NAME_SERVER_FIELDS: &[&str] = &["ns1", "ns2", "ns3", "ns4"];

/// Transform applied to a rule's base value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Callback {
    /// Legacy truthy value -> "true" / "false"
    BoolFlag,
    Lowercase,
    Trim,
    /// "a, b" -> ["a", "b"]
    SplitList,
    /// First element of a list or comma-separated string
    FirstListItem,
    /// ns1..ns4 of the module row (then the primary row) as a list
    NameServers,
    /// The value, else the module row's hostname, else its ip
    HostOrIp,
    /// Zero means unlimited, stored as an empty string
    AccountLimit,
}

impl Callback {
    pub fn apply(&self, value: Value, ctx: &RuleContext<'_>) -> Value {
        match self {
            Callback::BoolFlag => Value::String(is_truthy(&value).to_string()),
            Callback::Lowercase => map_string(value, |s| s.to_lowercase()),
            Callback::Trim => map_string(value, |s| s.trim().to_string()),
            Callback::SplitList => Value::Array(
                split_list(&value)
                    .into_iter()
                    .map(Value::String)
                    .collect(),
            ),
            Callback::FirstListItem => match value {
                Value::Array(items) => items.into_iter().next().unwrap_or(Value::Null),
                other => split_list(&other)
                    .into_iter()
                    .next()
                    .map(Value::String)
                    .unwrap_or(Value::Null),
            },
            Callback::NameServers => {
                let servers = NAME_SERVER_FIELDS
                    .iter()
                    .filter_map(|field| {
                        ctx.nested
                            .and_then(|row| row.opt_text(field))
                            .or_else(|| ctx.source.and_then(|row| row.opt_text(field)))
                    })
                    .map(Value::String)
                    .collect();
                Value::Array(servers)
            }
            Callback::HostOrIp => {
                if let Some(host) = as_non_empty(&value) {
                    return Value::String(host);
                }
                ctx.nested
                    .and_then(|row| row.opt_text("hostname").or_else(|| row.opt_text("ip")))
                    .map(Value::String)
                    .unwrap_or(Value::Null)
            }
            Callback::AccountLimit => {
                let limit = match &value {
                    Value::Number(n) => n.as_i64().unwrap_or(0),
                    Value::String(s) => s.trim().parse().unwrap_or(0),
                    _ => 0,
                };
                if limit <= 0 {
                    Value::String(String::new())
                } else {
                    Value::String(limit.to_string())
                }
            }
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        _ => false,
    }
}

fn map_string(value: Value, f: impl FnOnce(&str) -> String) -> Value {
    match value {
        Value::String(s) => Value::String(f(&s)),
        other => other,
    }
}

fn as_non_empty(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn split_list(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}
