//! Value representation: pure data, no behavior beyond inspection.
//!
//! A `Value` is what crosses the crate boundary: an already-typed domain
//! value, a primitive literal, or the explicit `Unset` sentinel. Coercion
//! contracts depend on being able to distinguish "already correctly typed"
//! from "needs parsing" from "absent", so the sentinel is a variant of its
//! own and never conflated with zero or the empty string.

use serde::{Deserialize, Serialize};

/// A raw or bound attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    /// No value supplied. Distinct from every domain value.
    Unset,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    /// An enumerated token tagged with its enumeration type.
    Enumeration { type_name: String, member: String },
    /// A value of a user-defined simple type: the base-primitive value
    /// wrapped with the subtype identity.
    Tagged { type_name: String, value: Box<Value> },
}

impl Value {
    /// The existence predicate: only `Unset` counts as missing. Empty
    /// strings and zero-valued numerics are present.
    pub fn exists(&self) -> bool {
        !matches!(self, Value::Unset)
    }

    /// Strip subtype tags down to the underlying primitive value.
    pub fn base(&self) -> &Value {
        match self {
            Value::Tagged { value, .. } => value.base(),
            other => other,
        }
    }

    /// Human-readable kind, for diagnostics.
    pub fn kind_name(&self) -> String {
        match self {
            Value::Unset => "unset".to_string(),
            Value::Bool(_) => "boolean".to_string(),
            Value::Integer(_) => "integer".to_string(),
            Value::Real(_) => "real".to_string(),
            Value::Text(_) => "string".to_string(),
            Value::Enumeration { type_name, .. } => format!("enumeration {type_name}"),
            Value::Tagged { type_name, .. } => type_name.clone(),
        }
    }

    /// The subtype tag, if this value carries one.
    pub fn type_tag(&self) -> Option<&str> {
        match self {
            Value::Tagged { type_name, .. } => Some(type_name),
            Value::Enumeration { type_name, .. } => Some(type_name),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(r: f64) -> Self {
        Value::Real(r)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}
