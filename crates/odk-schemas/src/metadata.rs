//! Order / event / ticket metadata.
//!
//! The server stores metadata as an opaque blob. Depending on the code path it
//! arrives as a JSON object, as a JSON-encoded string holding an object, as
//! `null`, or (rarely) as some other primitive. Every read goes through
//! [`normalize_metadata`], which always yields a flat key/value mapping.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A primitive metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

impl MetaValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Render for display; `Null` renders as an empty string.
    pub fn render(&self) -> String {
        match self {
            MetaValue::Null => String::new(),
            MetaValue::Bool(b) => b.to_string(),
            MetaValue::Number(n) => n.to_string(),
            MetaValue::Text(s) => s.clone(),
        }
    }
}

impl From<&str> for MetaValue {
    fn from(s: &str) -> Self {
        MetaValue::Text(s.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(s: String) -> Self {
        MetaValue::Text(s)
    }
}

impl From<bool> for MetaValue {
    fn from(b: bool) -> Self {
        MetaValue::Bool(b)
    }
}

impl From<i64> for MetaValue {
    fn from(n: i64) -> Self {
        MetaValue::Number(n.into())
    }
}

impl From<f64> for MetaValue {
    /// Non-finite floats have no JSON representation and become `Null`.
    fn from(n: f64) -> Self {
        serde_json::Number::from_f64(n)
            .map(MetaValue::Number)
            .unwrap_or(MetaValue::Null)
    }
}

/// Flat, deterministic-order key/value mapping.
pub type Metadata = BTreeMap<String, MetaValue>;

/// Decode any metadata shape into a uniform mapping.
///
/// - object: each entry kept; nested arrays/objects are flattened to their
///   compact JSON text
/// - string: parsed as JSON; if it holds an object that object is used,
///   otherwise the result is empty
/// - anything else: empty
pub fn normalize_metadata(raw: &Value) -> Metadata {
    match raw {
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| (k.clone(), leaf(v)))
            .collect(),
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(inner @ Value::Object(_)) => normalize_metadata(&inner),
            _ => Metadata::new(),
        },
        _ => Metadata::new(),
    }
}

fn leaf(v: &Value) -> MetaValue {
    match v {
        Value::Null => MetaValue::Null,
        Value::Bool(b) => MetaValue::Bool(*b),
        Value::Number(n) => MetaValue::Number(n.clone()),
        Value::String(s) => MetaValue::Text(s.clone()),
        other => MetaValue::Text(other.to_string()),
    }
}

/// `deserialize_with` adapter: never trusts the stored shape.
pub fn deserialize<'de, D>(deserializer: D) -> Result<Metadata, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(normalize_metadata(&raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn object_is_kept() {
        let md = normalize_metadata(&json!({"reason": "late", "retries": 2, "vip": true}));
        assert_eq!(md.len(), 3);
        assert_eq!(md["reason"], MetaValue::from("late"));
        assert_eq!(md["retries"], MetaValue::from(2_i64));
        assert_eq!(md["vip"], MetaValue::Bool(true));
    }

    #[test]
    fn encoded_object_string_is_parsed() {
        let md = normalize_metadata(&json!("{\"notes\":\"fragile\"}"));
        assert_eq!(md["notes"].as_str(), Some("fragile"));
    }

    #[test]
    fn non_object_shapes_become_empty() {
        assert!(normalize_metadata(&json!(null)).is_empty());
        assert!(normalize_metadata(&json!("not json")).is_empty());
        assert!(normalize_metadata(&json!("[1,2]")).is_empty());
        assert!(normalize_metadata(&json!(42)).is_empty());
    }

    #[test]
    fn nested_values_flatten_to_json_text() {
        let md = normalize_metadata(&json!({"items": [1, 2], "ctx": {"a": 1}}));
        assert_eq!(md["items"].as_str(), Some("[1,2]"));
        assert_eq!(md["ctx"].as_str(), Some("{\"a\":1}"));
    }

    #[test]
    fn non_finite_float_becomes_null() {
        assert_eq!(MetaValue::from(f64::NAN), MetaValue::Null);
    }

    #[test]
    fn serializes_as_plain_json_object() {
        let mut md = Metadata::new();
        md.insert("reason".into(), "x".into());
        md.insert("flag".into(), MetaValue::Null);
        assert_eq!(
            serde_json::to_value(&md).unwrap(),
            json!({"flag": null, "reason": "x"})
        );
    }
}
