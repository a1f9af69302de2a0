//! Raw stored values
//!
//! Every backend stores and returns [`RawValue`]s. The set of variants is
//! closed; anything that does not fit one of the serializable shapes can be
//! kept in memory as an [`OpaqueValue`], which backends that persist to
//! bytes will refuse to store.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Preference key type
pub type PreferenceKey = String;

/// Exported view of a backend: key to raw value
pub type PreferencesDictionary = BTreeMap<PreferenceKey, RawValue>;

/// A dynamically typed stored value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RawValue {
    /// UTF-8 string
    String(String),
    /// Signed 64-bit integer
    Integer(i64),
    /// IEEE-754 double
    Float(f64),
    /// Boolean
    Bool(bool),
    /// Opaque binary blob
    Data(Vec<u8>),
    /// Ordered list
    Array(Vec<RawValue>),
    /// String-keyed mapping
    Dictionary(BTreeMap<String, RawValue>),
    /// In-memory platform object; never serialized
    #[serde(skip)]
    Opaque(OpaqueValue),
}

impl RawValue {
    /// Name of the variant, used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            RawValue::String(_) => "string",
            RawValue::Integer(_) => "integer",
            RawValue::Float(_) => "float",
            RawValue::Bool(_) => "bool",
            RawValue::Data(_) => "data",
            RawValue::Array(_) => "array",
            RawValue::Dictionary(_) => "dictionary",
            RawValue::Opaque(_) => "opaque",
        }
    }

    /// Borrow as a string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            RawValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer value; floats with no fractional part also qualify
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            RawValue::Integer(i) => Some(*i),
            // Whole floats in [-2^63, 2^63) only
            RawValue::Float(f) if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < -(i64::MIN as f64) => {
                Some(*f as i64)
            }
            _ => None,
        }
    }

    /// Floating point value; integers widen
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RawValue::Float(f) => Some(*f),
            RawValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Boolean value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            RawValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Borrow binary data
    pub fn as_data(&self) -> Option<&[u8]> {
        match self {
            RawValue::Data(d) => Some(d),
            _ => None,
        }
    }

    /// Borrow list elements
    pub fn as_array(&self) -> Option<&[RawValue]> {
        match self {
            RawValue::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Borrow the nested mapping
    pub fn as_dictionary(&self) -> Option<&BTreeMap<String, RawValue>> {
        match self {
            RawValue::Dictionary(d) => Some(d),
            _ => None,
        }
    }

    /// Downcast an opaque value
    pub fn as_opaque<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        match self {
            RawValue::Opaque(o) => o.downcast(),
            _ => None,
        }
    }

    /// Convert from a JSON document
    ///
    /// JSON `null` has no raw counterpart and yields `None`; nulls nested in
    /// arrays or objects are dropped.
    pub fn from_json(value: serde_json::Value) -> Option<Self> {
        use serde_json::Value;

        match value {
            Value::Null => None,
            Value::Bool(b) => Some(RawValue::Bool(b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(RawValue::Integer(i)),
                None => n.as_f64().map(RawValue::Float),
            },
            Value::String(s) => Some(RawValue::String(s)),
            Value::Array(items) => Some(RawValue::Array(
                items.into_iter().filter_map(RawValue::from_json).collect(),
            )),
            Value::Object(map) => Some(RawValue::Dictionary(
                map.into_iter()
                    .filter_map(|(k, v)| RawValue::from_json(v).map(|v| (k, v)))
                    .collect(),
            )),
        }
    }

    /// Convert to a JSON document
    ///
    /// Binary data becomes an array of byte values. Opaque values have no
    /// JSON form and yield `None`.
    pub fn to_json(&self) -> Option<serde_json::Value> {
        use serde_json::Value;

        Some(match self {
            RawValue::String(s) => Value::String(s.clone()),
            RawValue::Integer(i) => Value::from(*i),
            RawValue::Float(f) => Value::from(*f),
            RawValue::Bool(b) => Value::Bool(*b),
            RawValue::Data(d) => Value::Array(d.iter().map(|b| Value::from(*b)).collect()),
            RawValue::Array(items) => {
                Value::Array(items.iter().map(|v| v.to_json()).collect::<Option<Vec<_>>>()?)
            }
            RawValue::Dictionary(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| v.to_json().map(|v| (k.clone(), v)))
                    .collect::<Option<serde_json::Map<_, _>>>()?,
            ),
            RawValue::Opaque(_) => return None,
        })
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::String(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::String(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Integer(value)
    }
}

impl From<i32> for RawValue {
    fn from(value: i32) -> Self {
        RawValue::Integer(value.into())
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Float(value)
    }
}

impl From<f32> for RawValue {
    fn from(value: f32) -> Self {
        RawValue::Float(value.into())
    }
}

impl From<bool> for RawValue {
    fn from(value: bool) -> Self {
        RawValue::Bool(value)
    }
}

impl From<Vec<u8>> for RawValue {
    fn from(value: Vec<u8>) -> Self {
        RawValue::Data(value)
    }
}

impl From<Vec<RawValue>> for RawValue {
    fn from(value: Vec<RawValue>) -> Self {
        RawValue::Array(value)
    }
}

impl From<BTreeMap<String, RawValue>> for RawValue {
    fn from(value: BTreeMap<String, RawValue>) -> Self {
        RawValue::Dictionary(value)
    }
}

impl From<OpaqueValue> for RawValue {
    fn from(value: OpaqueValue) -> Self {
        RawValue::Opaque(value)
    }
}

/// Shared in-memory object stored as a raw value
///
/// Two opaque values are equal only when they point at the same allocation.
#[derive(Clone)]
pub struct OpaqueValue(Arc<dyn Any + Send + Sync>);

impl OpaqueValue {
    /// Wrap an object
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Downcast to a concrete type
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.0.clone().downcast::<T>().ok()
    }
}

impl PartialEq for OpaqueValue {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for OpaqueValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OpaqueValue(..)")
    }
}

impl Default for OpaqueValue {
    fn default() -> Self {
        Self(Arc::new(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_views() {
        assert_eq!(RawValue::Integer(3).as_f64(), Some(3.0));
        assert_eq!(RawValue::Float(4.0).as_i64(), Some(4));
        assert_eq!(RawValue::Float(4.5).as_i64(), None);
        assert_eq!(RawValue::from("x").as_i64(), None);
    }

    #[test]
    fn test_out_of_range_float_is_not_integer() {
        assert_eq!(RawValue::Float(1e30).as_i64(), None);
        assert_eq!(RawValue::Float(-1e30).as_i64(), None);
        assert_eq!(RawValue::Float(9_223_372_036_854_775_808.0).as_i64(), None);
        assert_eq!(RawValue::Float(-9_223_372_036_854_775_808.0).as_i64(), Some(i64::MIN));
        assert_eq!(RawValue::Float(f64::INFINITY).as_i64(), None);
    }

    #[test]
    fn test_json_bridge() {
        let raw = RawValue::from_json(json!({"name": "Alice", "age": 30, "tags": ["a", null]}))
            .unwrap();
        let map = raw.as_dictionary().unwrap();
        assert_eq!(map["name"], RawValue::from("Alice"));
        assert_eq!(map["age"], RawValue::Integer(30));
        assert_eq!(map["tags"], RawValue::Array(vec![RawValue::from("a")]));

        assert_eq!(raw.to_json().unwrap(), json!({"name": "Alice", "age": 30, "tags": ["a"]}));
        assert!(RawValue::from_json(json!(null)).is_none());
    }

    #[test]
    fn test_opaque_identity() {
        let a = OpaqueValue::new(String::from("token"));
        let b = a.clone();
        let c = OpaqueValue::new(String::from("token"));
        assert_eq!(a, b);
        assert_ne!(a, c);

        let raw = RawValue::Opaque(a);
        assert_eq!(raw.as_opaque::<String>().as_deref(), Some(&"token".to_string()));
        assert!(raw.as_opaque::<i32>().is_none());
        assert!(raw.to_json().is_none());
    }

    #[test]
    fn test_opaque_is_not_serializable() {
        let raw = RawValue::Array(vec![RawValue::Opaque(OpaqueValue::new(1u8))]);
        assert!(serde_json::to_vec(&raw).is_err());
        assert!(serde_json::to_vec(&RawValue::Integer(1)).is_ok());
    }
}
