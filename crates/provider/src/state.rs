//! Terraform State Management
//!
//! Handles encoding and decoding of resource state using msgpack, plus the
//! attribute accessors the resources use to read declared configuration.

use std::collections::{BTreeSet, HashMap};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Dynamic value that can be encoded/decoded from Terraform state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DynamicValue {
    #[default]
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    List(Vec<DynamicValue>),
    Map(HashMap<String, DynamicValue>),
}

impl DynamicValue {
    pub fn is_null(&self) -> bool {
        matches!(self, DynamicValue::Null)
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            DynamicValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Whole numbers encoded as floats are accepted as integers.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DynamicValue::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| f as i64)
            }),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DynamicValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[DynamicValue]> {
        match self {
            DynamicValue::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&HashMap<String, DynamicValue>> {
        match self {
            DynamicValue::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&DynamicValue> {
        self.as_map()?.get(key)
    }

    /// Set an attribute, turning a null value into an empty map first.
    pub fn set(&mut self, key: &str, value: DynamicValue) {
        if self.is_null() {
            *self = DynamicValue::Map(HashMap::new());
        }
        if let DynamicValue::Map(m) = self {
            m.insert(key.to_string(), value);
        }
    }
}

/// Decode a Terraform DynamicValue from msgpack bytes
pub fn decode_dynamic_value(data: &[u8]) -> Result<DynamicValue> {
    if data.is_empty() {
        return Ok(DynamicValue::Null);
    }

    rmp_serde::from_slice(data).context("Failed to decode msgpack state")
}

/// Encode a value to Terraform DynamicValue bytes
pub fn encode_dynamic_value(value: &DynamicValue) -> Result<Vec<u8>> {
    rmp_serde::to_vec(value).context("Failed to encode msgpack state")
}

/// Helper to extract a string attribute from a DynamicValue
pub fn get_string_attr(value: &DynamicValue, key: &str) -> String {
    value.get(key)
        .and_then(|v| v.as_string())
        .unwrap_or("")
        .to_string()
}

/// Helper to extract an optional string attribute; empty strings count as unset
pub fn get_optional_string_attr(value: &DynamicValue, key: &str) -> Option<String> {
    value.get(key)
        .and_then(|v| match v {
            DynamicValue::String(s) if !s.is_empty() => Some(s.clone()),
            _ => None,
        })
}

/// Helper to extract an optional integer attribute
pub fn get_optional_int_attr(value: &DynamicValue, key: &str) -> Option<i64> {
    value.get(key).and_then(|v| v.as_i64())
}

/// Helper to extract an optional bool attribute
pub fn get_optional_bool_attr(value: &DynamicValue, key: &str) -> Option<bool> {
    value.get(key).and_then(|v| v.as_bool())
}

/// Helper to extract a set of strings; null and missing both give an empty set
pub fn get_string_set_attr(value: &DynamicValue, key: &str) -> BTreeSet<String> {
    value.get(key)
        .and_then(|v| v.as_list())
        .map(|items| {
            items.iter()
                .filter_map(|i| i.as_string())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Whether an attribute differs between two states.
///
/// Missing, null and empty-string values are all treated as "unset".
pub fn attr_changed(prior: &DynamicValue, planned: &DynamicValue, key: &str) -> bool {
    fn normalized(v: Option<&DynamicValue>) -> Option<&DynamicValue> {
        match v {
            None | Some(DynamicValue::Null) => None,
            Some(DynamicValue::String(s)) if s.is_empty() => None,
            Some(other) => Some(other),
        }
    }

    normalized(prior.get(key)) != normalized(planned.get(key))
}

/// Create a DynamicValue map with the given attributes
pub fn make_state(attrs: Vec<(&str, DynamicValue)>) -> DynamicValue {
    let mut map = HashMap::new();
    for (key, value) in attrs {
        map.insert(key.to_string(), value);
    }
    DynamicValue::Map(map)
}

/// Create a string DynamicValue
pub fn string_value(s: impl Into<String>) -> DynamicValue {
    DynamicValue::String(s.into())
}

/// Create a number DynamicValue from i64
pub fn int_value(n: i64) -> DynamicValue {
    DynamicValue::Number(serde_json::Number::from(n))
}

/// String value, or null when absent or blank
pub fn optional_string_value(s: Option<&str>) -> DynamicValue {
    match s {
        Some(s) if !s.trim().is_empty() => string_value(s),
        _ => null_value(),
    }
}

/// Integer value, or null when absent
pub fn optional_int_value(n: Option<i64>) -> DynamicValue {
    n.map(int_value).unwrap_or(DynamicValue::Null)
}

/// Sorted list of strings, or null for an empty set
pub fn string_set_value(items: &BTreeSet<String>) -> DynamicValue {
    if items.is_empty() {
        return null_value();
    }
    DynamicValue::List(items.iter().map(string_value).collect())
}

/// Create a null DynamicValue
pub fn null_value() -> DynamicValue {
    DynamicValue::Null
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn from_json(v: serde_json::Value) -> DynamicValue {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn test_msgpack_state_roundtrip() {
        let state = make_state(vec![
            ("id", string_value("42")),
            ("site_id", int_value(1)),
            ("tenant_id", null_value()),
            ("tags", DynamicValue::List(vec![string_value("a"), string_value("b")])),
        ]);

        let bytes = encode_dynamic_value(&state).unwrap();
        let decoded = decode_dynamic_value(&bytes).unwrap();
        assert_eq!(decoded, state);
        assert!(decode_dynamic_value(&[]).unwrap().is_null());
    }

    #[test]
    fn test_attribute_accessors() {
        let config = from_json(json!({
            "name": "sw1",
            "serial": "",
            "site_id": 3,
            "role_id": 2.0,
            "tenant_id": null,
            "tags": ["b", "a", "b"]
        }));

        assert_eq!(get_string_attr(&config, "name"), "sw1");
        assert_eq!(get_string_attr(&config, "missing"), "");
        assert_eq!(get_optional_string_attr(&config, "serial"), None);
        assert_eq!(get_optional_int_attr(&config, "site_id"), Some(3));
        assert_eq!(get_optional_int_attr(&config, "role_id"), Some(2));
        assert_eq!(get_optional_int_attr(&config, "tenant_id"), None);

        let tags = get_string_set_attr(&config, "tags");
        assert_eq!(tags.into_iter().collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(get_string_set_attr(&config, "tenant_id").is_empty());
    }

    #[test]
    fn test_attr_changed_treats_unset_forms_alike() {
        let prior = from_json(json!({"comments": "", "serial": "abc", "tenant_id": 4}));
        let planned = from_json(json!({"comments": null, "serial": "abc"}));

        assert!(!attr_changed(&prior, &planned, "comments"));
        assert!(!attr_changed(&prior, &planned, "serial"));
        assert!(attr_changed(&prior, &planned, "tenant_id"));
        assert!(!attr_changed(&prior, &planned, "location_id"));
    }

    #[test]
    fn test_value_builders() {
        assert!(optional_string_value(Some("  ")).is_null());
        assert_eq!(optional_string_value(Some("x")), string_value("x"));
        assert!(optional_int_value(None).is_null());
        assert!(string_set_value(&BTreeSet::new()).is_null());

        let mut state = DynamicValue::Null;
        state.set("id", string_value("7"));
        assert_eq!(get_string_attr(&state, "id"), "7");
    }
}
