//! Conversion between typed values and raw stored values

use serde::{de::DeserializeOwned, Serialize};
use std::collections::BTreeMap;

use crate::value::RawValue;

/// A type that can be read from and written to a raw value
///
/// Both directions are partial: a raw value of the wrong shape reads as
/// `None`, and a value with no raw representation writes as `None`.
pub trait PreferenceValue: Sized {
    /// Convert from a stored value
    fn from_raw(raw: RawValue) -> Option<Self>;

    /// Convert into a storable value
    fn into_raw(self) -> Option<RawValue>;
}

impl PreferenceValue for RawValue {
    fn from_raw(raw: RawValue) -> Option<Self> {
        Some(raw)
    }

    fn into_raw(self) -> Option<RawValue> {
        Some(self)
    }
}

impl PreferenceValue for String {
    fn from_raw(raw: RawValue) -> Option<Self> {
        match raw {
            RawValue::String(s) => Some(s),
            _ => None,
        }
    }

    fn into_raw(self) -> Option<RawValue> {
        Some(RawValue::String(self))
    }
}

impl PreferenceValue for bool {
    fn from_raw(raw: RawValue) -> Option<Self> {
        raw.as_bool()
    }

    fn into_raw(self) -> Option<RawValue> {
        Some(RawValue::Bool(self))
    }
}

impl PreferenceValue for f64 {
    fn from_raw(raw: RawValue) -> Option<Self> {
        raw.as_f64()
    }

    fn into_raw(self) -> Option<RawValue> {
        Some(RawValue::Float(self))
    }
}

impl PreferenceValue for f32 {
    fn from_raw(raw: RawValue) -> Option<Self> {
        raw.as_f64().map(|f| f as f32)
    }

    fn into_raw(self) -> Option<RawValue> {
        Some(RawValue::Float(self.into()))
    }
}

macro_rules! integer_preference_value {
    ($($ty:ty),*) => {
        $(
            impl PreferenceValue for $ty {
                fn from_raw(raw: RawValue) -> Option<Self> {
                    raw.as_i64().and_then(|i| <$ty>::try_from(i).ok())
                }

                fn into_raw(self) -> Option<RawValue> {
                    i64::try_from(self).ok().map(RawValue::Integer)
                }
            }
        )*
    };
}

integer_preference_value!(i8, i16, i32, i64, u8, u16, u32, u64, isize, usize);

impl<T: PreferenceValue> PreferenceValue for Vec<T> {
    fn from_raw(raw: RawValue) -> Option<Self> {
        match raw {
            RawValue::Array(items) => items.into_iter().map(T::from_raw).collect(),
            _ => None,
        }
    }

    fn into_raw(self) -> Option<RawValue> {
        self.into_iter()
            .map(T::into_raw)
            .collect::<Option<Vec<_>>>()
            .map(RawValue::Array)
    }
}

impl<T: PreferenceValue> PreferenceValue for BTreeMap<String, T> {
    fn from_raw(raw: RawValue) -> Option<Self> {
        match raw {
            RawValue::Dictionary(map) => map
                .into_iter()
                .map(|(k, v)| T::from_raw(v).map(|v| (k, v)))
                .collect(),
            _ => None,
        }
    }

    fn into_raw(self) -> Option<RawValue> {
        self.into_iter()
            .map(|(k, v)| v.into_raw().map(|v| (k, v)))
            .collect::<Option<BTreeMap<_, _>>>()
            .map(RawValue::Dictionary)
    }
}

/// Binary blob stored as raw data
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bytes(pub Vec<u8>);

impl PreferenceValue for Bytes {
    fn from_raw(raw: RawValue) -> Option<Self> {
        match raw {
            RawValue::Data(d) => Some(Bytes(d)),
            _ => None,
        }
    }

    fn into_raw(self) -> Option<RawValue> {
        Some(RawValue::Data(self.0))
    }
}

/// Any serde type, stored through its JSON shape
///
/// The value is stored as a nested raw value (dictionary, array, ...) rather
/// than as a string, so it can be combined with [`Transformation::Archive`](crate::Transformation::Archive)
/// to obtain a binary blob.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Json<T>(pub T);

impl<T: Serialize + DeserializeOwned> PreferenceValue for Json<T> {
    fn from_raw(raw: RawValue) -> Option<Self> {
        let json = raw.to_json()?;
        serde_json::from_value(json)
            .map_err(|e| tracing::debug!("Stored value does not decode: {}", e))
            .ok()
            .map(Json)
    }

    fn into_raw(self) -> Option<RawValue> {
        let json = serde_json::to_value(&self.0)
            .map_err(|e| tracing::warn!("Value does not encode: {}", e))
            .ok()?;
        RawValue::from_json(json)
    }
}
