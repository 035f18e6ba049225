//! Typed attribute values
//!
//! Device attributes are an explicit value union; constraint evaluators
//! pattern-match on the tag instead of coercing at runtime.

use serde::{Deserialize, Serialize};

/// A single device attribute value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    /// Boolean flag (e.g. `is_dimmable`)
    Bool(bool),
    /// Integer quantity (e.g. `brightness`)
    Integer(i64),
    /// Floating point quantity
    Float(f64),
    /// Text value (e.g. `status`, `color`)
    String(String),
    /// Homogeneous or mixed list of values
    List(Vec<AttrValue>),
}

impl AttrValue {
    /// Name of the value's type tag, for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            AttrValue::Bool(_) => "bool",
            AttrValue::Integer(_) => "integer",
            AttrValue::Float(_) => "float",
            AttrValue::String(_) => "string",
            AttrValue::List(_) => "list",
        }
    }

    /// Numeric view of the value, if it has one
    pub fn as_number(&self) -> Option<f64> {
        match self {
            AttrValue::Integer(i) => Some(*i as f64),
            AttrValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// String view of the value, if it is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Convert a JSON scalar or array into an attribute value.
    ///
    /// Objects and nulls are rejected: the attribute map is flat and every
    /// entry must be a scalar or a list.
    pub fn from_json(value: &serde_json::Value) -> Option<AttrValue> {
        match value {
            serde_json::Value::Bool(b) => Some(AttrValue::Bool(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(AttrValue::Integer(i))
                } else {
                    n.as_f64().map(AttrValue::Float)
                }
            }
            serde_json::Value::String(s) => Some(AttrValue::String(s.clone())),
            serde_json::Value::Array(items) => {
                let converted: Option<Vec<AttrValue>> =
                    items.iter().map(AttrValue::from_json).collect();
                converted.map(AttrValue::List)
            }
            serde_json::Value::Null | serde_json::Value::Object(_) => None,
        }
    }
}

impl std::fmt::Display for AttrValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttrValue::Bool(b) => write!(f, "{}", b),
            AttrValue::Integer(i) => write!(f, "{}", i),
            AttrValue::Float(x) => write!(f, "{}", x),
            AttrValue::String(s) => write!(f, "{}", s),
            AttrValue::List(items) => {
                let rendered: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", rendered.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untagged_deserialization() {
        let v: AttrValue = serde_json::from_str("true").unwrap();
        assert_eq!(v, AttrValue::Bool(true));

        let v: AttrValue = serde_json::from_str("42").unwrap();
        assert_eq!(v, AttrValue::Integer(42));

        let v: AttrValue = serde_json::from_str("2.5").unwrap();
        assert_eq!(v, AttrValue::Float(2.5));

        let v: AttrValue = serde_json::from_str("\"on\"").unwrap();
        assert_eq!(v, AttrValue::String("on".to_string()));

        let v: AttrValue = serde_json::from_str("[1, 2]").unwrap();
        assert_eq!(
            v,
            AttrValue::List(vec![AttrValue::Integer(1), AttrValue::Integer(2)])
        );
    }

    #[test]
    fn test_as_number() {
        assert_eq!(AttrValue::Integer(21).as_number(), Some(21.0));
        assert_eq!(AttrValue::Float(0.5).as_number(), Some(0.5));
        assert_eq!(AttrValue::String("21".to_string()).as_number(), None);
        assert_eq!(AttrValue::Bool(true).as_number(), None);
    }

    #[test]
    fn test_from_json_rejects_objects_and_nulls() {
        assert!(AttrValue::from_json(&serde_json::json!({"a": 1})).is_none());
        assert!(AttrValue::from_json(&serde_json::Value::Null).is_none());
        assert!(AttrValue::from_json(&serde_json::json!([1, null])).is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(AttrValue::String("locked".to_string()).to_string(), "locked");
        assert_eq!(
            AttrValue::List(vec![AttrValue::Integer(1), AttrValue::Bool(false)]).to_string(),
            "[1, false]"
        );
    }
}
