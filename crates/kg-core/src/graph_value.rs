//! Typed accessor over graph-store query results (§4.1, §9 "dynamic `any`
//! maps"). Every adapter normalizes its driver's native row/value type into
//! `GraphValue` at exactly one point; no downstream component type-asserts
//! against a driver type directly.

use std::collections::HashMap;

/// A single cell of a query result, after numeric normalization.
///
/// Normalization rule (§4.1): `nil → 0` is NOT applied here — absence is
/// `GraphValue::Null` and callers decide whether that means zero or missing.
/// The large-integer/float/variant coercion happens when the adapter builds
/// this value from the driver's native type.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphValue {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    List(Vec<GraphValue>),
    Map(HashMap<String, GraphValue>),
}

impl GraphValue {
    pub fn as_i64(&self) -> i64 {
        match self {
            Self::Null => 0,
            Self::Int(i) => *i,
            Self::Float(f) => *f as i64,
            Self::Str(s) => s.parse().unwrap_or(0),
            Self::Bool(b) => *b as i64,
            Self::List(_) | Self::Map(_) => 0,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            Self::Null => 0.0,
            Self::Int(i) => *i as f64,
            Self::Float(f) => *f,
            Self::Str(s) => s.parse().unwrap_or(0.0),
            Self::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Self::List(_) | Self::Map(_) => 0.0,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Null => false,
            Self::Int(i) => *i != 0,
            _ => false,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_map(&self) -> Option<&HashMap<String, GraphValue>> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Converts to `serde_json::Value` for transport to callers that expect
    /// a generic property bag (e.g. `RelationshipEdge::properties`).
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Int(i) => serde_json::Value::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Self::Bool(b) => serde_json::Value::from(*b),
            Self::Str(s) => serde_json::Value::from(s.clone()),
            Self::List(l) => serde_json::Value::Array(l.iter().map(|v| v.to_json()).collect()),
            Self::Map(m) => serde_json::Value::Object(
                m.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

/// One row of a query result — a named bag of `GraphValue`s.
#[derive(Debug, Clone, Default)]
pub struct GraphRow(pub HashMap<String, GraphValue>);

impl GraphRow {
    pub fn get(&self, key: &str) -> GraphValue {
        self.0.get(key).cloned().unwrap_or(GraphValue::Null)
    }

    pub fn get_i64(&self, key: &str) -> i64 {
        self.get(key).as_i64()
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).as_str().map(|s| s.to_string())
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key).as_bool()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn large_int_variant_coerces_to_i64() {
        assert_eq!(GraphValue::Int(9_000_000_000_000).as_i64(), 9_000_000_000_000);
    }

    #[test]
    fn null_numeric_coerces_to_zero() {
        assert_eq!(GraphValue::Null.as_i64(), 0);
        assert_eq!(GraphValue::Null.as_f64(), 0.0);
    }

    #[test]
    fn string_variant_parses_or_zero() {
        assert_eq!(GraphValue::Str("42".into()).as_i64(), 42);
        assert_eq!(GraphValue::Str("nope".into()).as_i64(), 0);
    }

    #[test]
    fn float_truncates() {
        assert_eq!(GraphValue::Float(3.9).as_i64(), 3);
    }
}
