//! Declarative filter trees.
//!
//! A condition is a tree of `and`/`or` nodes over leaf field comparisons.
//! Leaves look fields up by name (entry metadata first, then typed data)
//! and compare by runtime value type: numbers numerically, strings
//! lexicographically. Conjunctions short-circuit left to right.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use folio_index::Entry;

/// One leaf comparison.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldOp {
    Is(Value),
    IsNot(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    StartsWith(String),
    /// Any of the listed values matches.
    AnyOf(Vec<Value>),
    In(Vec<Value>),
    NotIn(Vec<Value>),
    /// The field holds an object matching a nested condition.
    Has(Box<Condition>),
    /// The field holds an array with at least one element matching a
    /// nested condition.
    Includes(Box<Condition>),
}

/// A filter tree over entry fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Condition {
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Field { name: String, op: FieldOp },
}

impl Condition {
    pub fn field(name: impl Into<String>, op: FieldOp) -> Self {
        Self::Field {
            name: name.into(),
            op,
        }
    }

    pub fn and(conditions: impl IntoIterator<Item = Condition>) -> Self {
        Self::And(conditions.into_iter().collect())
    }

    pub fn or(conditions: impl IntoIterator<Item = Condition>) -> Self {
        Self::Or(conditions.into_iter().collect())
    }

    /// Evaluate against an entry.
    pub fn matches_entry(&self, entry: &Entry) -> bool {
        self.matches(&|name| entry.resolve_field(name))
    }

    fn matches(&self, lookup: &dyn Fn(&str) -> Option<Value>) -> bool {
        match self {
            Self::And(conditions) => conditions.iter().all(|c| c.matches(lookup)),
            Self::Or(conditions) => conditions.iter().any(|c| c.matches(lookup)),
            Self::Field { name, op } => op.matches(lookup(name)),
        }
    }
}

impl FieldOp {
    fn matches(&self, value: Option<Value>) -> bool {
        let value = value.unwrap_or(Value::Null);
        match self {
            Self::Is(expected) => value == *expected,
            Self::IsNot(expected) => value != *expected,
            Self::Gt(bound) => compare(&value, bound) == Some(Ordering::Greater),
            Self::Gte(bound) => {
                matches!(compare(&value, bound), Some(Ordering::Greater | Ordering::Equal))
            }
            Self::Lt(bound) => compare(&value, bound) == Some(Ordering::Less),
            Self::Lte(bound) => {
                matches!(compare(&value, bound), Some(Ordering::Less | Ordering::Equal))
            }
            Self::StartsWith(prefix) => value
                .as_str()
                .map(|s| s.starts_with(prefix.as_str()))
                .unwrap_or(false),
            Self::AnyOf(values) | Self::In(values) => values.contains(&value),
            Self::NotIn(values) => !values.contains(&value),
            Self::Has(condition) => match value {
                Value::Object(fields) => condition.matches(&|name| fields.get(name).cloned()),
                _ => false,
            },
            Self::Includes(condition) => match value {
                Value::Array(items) => items.iter().any(|item| match item {
                    Value::Object(fields) => {
                        condition.matches(&|name| fields.get(name).cloned())
                    }
                    other => condition.matches(&|_| Some(other.clone())),
                }),
                _ => false,
            },
        }
    }
}

/// Compare two values of matching runtime type: numbers numerically,
/// strings lexicographically, booleans false-before-true.
pub(crate) fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => {
            a.as_f64().and_then(|a| b.as_f64().and_then(|b| a.partial_cmp(&b)))
        }
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}
