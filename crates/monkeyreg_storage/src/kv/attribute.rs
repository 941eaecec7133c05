//! Attribute values of the remote key-value table.

use crate::error::{StorageError, StorageResult};
use crate::item::{Item, CANONICAL_FIELDS};
use serde_json::{Number, Value};
use std::collections::BTreeMap;

/// A stored item of the remote table, keyed by attribute name.
pub type KvItem = BTreeMap<String, AttributeValue>;

/// A single attribute value as the remote table represents it.
///
/// Numbers travel as decimal text (`N`) with arbitrary precision, the way
/// hosted key-value stores encode them on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    /// String.
    S(String),
    /// Number, as decimal text.
    N(String),
    /// Boolean.
    Bool(bool),
    /// Explicit null.
    Null,
}

impl AttributeValue {
    /// Creates a string attribute.
    pub fn s(value: impl Into<String>) -> Self {
        Self::S(value.into())
    }

    /// Returns the string payload of an `S` attribute.
    #[must_use]
    pub fn as_s(&self) -> Option<&str> {
        match self {
            Self::S(s) => Some(s),
            _ => None,
        }
    }

    /// Converts a canonical JSON value to an attribute.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::MalformedItem`] for arrays and objects,
    /// which the canonical form never contains.
    pub fn from_json(value: &Value) -> StorageResult<Self> {
        match value {
            Value::Null => Ok(Self::Null),
            Value::Bool(b) => Ok(Self::Bool(*b)),
            Value::Number(n) => Ok(Self::N(n.to_string())),
            Value::String(s) => Ok(Self::S(s.clone())),
            Value::Array(_) | Value::Object(_) => Err(StorageError::malformed_item(
                "nested values are not part of the record form",
            )),
        }
    }

    /// Converts the attribute back to a plain JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::MalformedItem`] if a number cannot be
    /// represented as a finite JSON number.
    pub fn to_json(&self) -> StorageResult<Value> {
        match self {
            Self::S(s) => Ok(Value::String(s.clone())),
            Self::N(n) => normalize_number(n),
            Self::Bool(b) => Ok(Value::Bool(*b)),
            Self::Null => Ok(Value::Null),
        }
    }
}

/// Normalizes decimal text to a plain JSON number.
///
/// Integral values become integers (`"3"`, `"3.0"` and `"3E0"` all become
/// `3`); everything else becomes a float.
///
/// # Errors
///
/// Returns [`StorageError::MalformedItem`] if the text is not a finite number.
pub fn normalize_number(text: &str) -> StorageResult<Value> {
    let text = text.trim();
    if let Ok(int) = text.parse::<i64>() {
        return Ok(Value::from(int));
    }

    let float: f64 = text
        .parse()
        .map_err(|_| StorageError::malformed_item(format!("not a number: {text:?}")))?;

    // `i64::MAX as f64` rounds up to 2^63, which is already out of range.
    if float.fract() == 0.0 && float >= i64::MIN as f64 && float < i64::MAX as f64 {
        return Ok(Value::from(float as i64));
    }

    Number::from_f64(float)
        .map(Value::Number)
        .ok_or_else(|| StorageError::malformed_item(format!("non-finite number: {text:?}")))
}

/// Converts a canonical item to remote attributes.
///
/// # Errors
///
/// Returns an error if any field holds a nested value.
pub fn to_kv_item(item: &Item) -> StorageResult<KvItem> {
    item.iter()
        .map(|(key, value)| Ok((key.clone(), AttributeValue::from_json(value)?)))
        .collect()
}

/// Converts remote attributes to a canonical item, skipping `excluded`
/// attribute names.
///
/// Canonical fields come first in their serialization order, followed by
/// any other attributes in name order.
///
/// # Errors
///
/// Returns an error if a number attribute cannot be normalized.
pub fn from_kv_item(item: &KvItem, excluded: &[&str]) -> StorageResult<Item> {
    let mut out = Item::new();
    for key in CANONICAL_FIELDS {
        if let Some(value) = item.get(key) {
            out.insert(key.to_string(), value.to_json()?);
        }
    }
    for (key, value) in item {
        if out.contains_key(key) || excluded.contains(&key.as_str()) {
            continue;
        }
        out.insert(key.clone(), value.to_json()?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    proptest! {
        #[test]
        fn integers_survive_decimal_text(n in any::<i64>()) {
            prop_assert_eq!(normalize_number(&n.to_string()).unwrap(), json!(n));
        }

        #[test]
        fn integral_floats_become_integers(n in -1_000_000i64..1_000_000) {
            prop_assert_eq!(normalize_number(&format!("{n}.0")).unwrap(), json!(n));
        }

        #[test]
        fn fractions_stay_floats(x in -1e6f64..1e6) {
            prop_assume!(x.fract() != 0.0);
            let value = normalize_number(&x.to_string()).unwrap();
            prop_assert!(value.is_f64());
            prop_assert_eq!(value.as_f64(), Some(x));
        }
    }

    #[test]
    fn integral_numbers_become_integers() {
        assert_eq!(normalize_number("22").unwrap(), json!(22));
        assert_eq!(normalize_number("22.0").unwrap(), json!(22));
        assert_eq!(normalize_number("2.2E1").unwrap(), json!(22));
        assert_eq!(normalize_number("-4").unwrap(), json!(-4));
    }

    #[test]
    fn fractional_numbers_become_floats() {
        assert_eq!(normalize_number("2.5").unwrap(), json!(2.5));
    }

    #[test]
    fn integers_beyond_i64_stay_floats() {
        for text in ["9223372036854775808", "9.3e18", "1e19"] {
            let value = normalize_number(text).unwrap();
            assert!(value.is_f64(), "{text} should stay a float, got {value}");
        }
        assert_eq!(
            normalize_number("-9223372036854775808").unwrap(),
            json!(i64::MIN)
        );
    }

    #[test]
    fn invalid_numbers_are_malformed() {
        assert!(matches!(
            normalize_number("abc"),
            Err(StorageError::MalformedItem { .. })
        ));
        assert!(matches!(
            normalize_number("NaN"),
            Err(StorageError::MalformedItem { .. })
        ));
    }

    #[test]
    fn nested_values_are_rejected() {
        assert!(AttributeValue::from_json(&json!([1, 2])).is_err());
        assert!(AttributeValue::from_json(&json!({"a": 1})).is_err());
    }

    #[test]
    fn item_conversion_restores_canonical_order_and_strips() {
        let item = json!({
            "id": "m1",
            "name": "luna",
            "category": "marmoset",
            "age": 2,
            "note": "mango",
            "last_check_time": null,
            "created_at": "2026-01-01T00:00:00Z",
            "updated_at": "2026-01-01T00:00:00Z",
        })
        .as_object()
        .cloned()
        .unwrap();

        let mut stored = to_kv_item(&item).unwrap();
        assert_eq!(stored["age"], AttributeValue::N("2".into()));
        stored.insert("PK".into(), AttributeValue::s("MONKEY#m1"));

        let back = from_kv_item(&stored, &["PK"]).unwrap();
        assert_eq!(back, item);
        let keys: Vec<_> = back.keys().map(String::as_str).collect();
        assert_eq!(keys, CANONICAL_FIELDS.to_vec());
    }
}
