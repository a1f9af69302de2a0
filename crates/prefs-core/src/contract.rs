//! The key-value contract shared by every backend and combinator
//!
//! Backends implement the minimal [`Preferences`] / [`MutablePreferences`]
//! pair. Typed convenience accessors live in the blanket extension traits
//! [`PreferencesExt`] and [`MutablePreferencesExt`] and only ever call the
//! minimal methods.

use serde::{de::DeserializeOwned, Serialize};

use crate::archive;
use crate::error::{PrefsError, Result};
use crate::value::{PreferencesDictionary, RawValue};

/// Read access to a key-value backend
pub trait Preferences: Send + Sync {
    /// Get the raw value stored for a key
    fn get(&self, key: &str) -> Option<RawValue>;

    /// Export every key and value
    fn export(&self) -> PreferencesDictionary;

    /// Check whether a value exists for a key
    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// List known keys
    fn keys(&self) -> Vec<String> {
        self.export().into_keys().collect()
    }

    /// Writable view of this backend, if it supports mutation
    fn as_mutable(&self) -> Option<&dyn MutablePreferences> {
        None
    }
}

/// Write access to a key-value backend
pub trait MutablePreferences: Preferences {
    /// Store a value, or remove the key when `value` is `None`
    fn set(&self, key: &str, value: Option<RawValue>);

    /// Remove the value for a key
    fn remove(&self, key: &str) {
        self.set(key, None);
    }

    /// Store every entry of a dictionary
    fn set_all(&self, values: PreferencesDictionary) {
        for (key, value) in values {
            self.set(&key, Some(value));
        }
    }

    /// Remove every key
    fn clear_all(&self) {
        for key in self.keys() {
            self.remove(&key);
        }
    }
}

/// Typed accessors over [`Preferences`]
pub trait PreferencesExt: Preferences {
    /// String value
    fn string(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            RawValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer value, `0` when absent or not an integer
    fn integer(&self, key: &str) -> i64 {
        self.get(key).and_then(|v| v.as_i64()).unwrap_or(0)
    }

    /// Single precision value, `0.0` when absent
    fn float(&self, key: &str) -> f32 {
        self.double(key) as f32
    }

    /// Double precision value, `0.0` when absent
    fn double(&self, key: &str) -> f64 {
        self.get(key).and_then(|v| v.as_f64()).unwrap_or(0.0)
    }

    /// Boolean value, `false` when absent
    fn bool(&self, key: &str) -> bool {
        self.get(key).and_then(|v| v.as_bool()).unwrap_or(false)
    }

    /// Binary value
    fn data(&self, key: &str) -> Option<Vec<u8>> {
        match self.get(key)? {
            RawValue::Data(d) => Some(d),
            _ => None,
        }
    }

    /// List value
    fn array(&self, key: &str) -> Option<Vec<RawValue>> {
        match self.get(key)? {
            RawValue::Array(a) => Some(a),
            _ => None,
        }
    }

    /// List value whose elements are all strings
    fn string_array(&self, key: &str) -> Option<Vec<String>> {
        self.array(key)?
            .into_iter()
            .map(|v| match v {
                RawValue::String(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    /// Nested mapping value
    fn dictionary_value(&self, key: &str) -> Option<PreferencesDictionary> {
        match self.get(key)? {
            RawValue::Dictionary(d) => Some(d),
            _ => None,
        }
    }

    /// Decode a value written with [`MutablePreferencesExt::set_archived`]
    fn unarchive_object(&self, key: &str) -> Option<RawValue> {
        archive::unarchive(self.data(key)?.as_slice())
    }

    /// Decode a JSON blob written with [`MutablePreferencesExt::set_encodable`]
    fn decodable<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key) {
            None => Ok(None),
            Some(RawValue::Data(bytes)) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Some(_) => Err(PrefsError::TypeMismatch { key: key.to_string(), expected: "data" }),
        }
    }

    /// Writable view, or an error for read-only backends
    fn try_as_mutable(&self) -> Result<&dyn MutablePreferences> {
        self.as_mutable().ok_or(PrefsError::ReadOnly)
    }
}

impl<P: Preferences + ?Sized> PreferencesExt for P {}

/// Typed mutators over [`MutablePreferences`]
pub trait MutablePreferencesExt: MutablePreferences {
    /// Store any value convertible to a raw value
    fn set_value(&self, key: &str, value: impl Into<RawValue>) {
        self.set(key, Some(value.into()));
    }

    /// Store values pairwise with keys; extra entries on either side are ignored
    fn set_objects(&self, values: Vec<RawValue>, keys: &[&str]) {
        for (value, key) in values.into_iter().zip(keys) {
            self.set(key, Some(value));
        }
    }

    /// Archive a value into a binary blob, or remove the key for `None`
    fn set_archived(&self, key: &str, value: Option<&RawValue>) {
        match value {
            Some(value) => {
                let data = archive::archive(value);
                if data.is_none() {
                    tracing::warn!("Value for {} is not archivable, removing", key);
                }
                self.set(key, data.map(RawValue::Data));
            }
            None => self.remove(key),
        }
    }

    /// Store a serde value as a JSON blob, or remove the key for `None`
    fn set_encodable<T: Serialize>(&self, key: &str, value: Option<&T>) -> Result<()> {
        match value {
            Some(value) => {
                let bytes = serde_json::to_vec(value)?;
                self.set(key, Some(RawValue::Data(bytes)));
            }
            None => self.remove(key),
        }
        Ok(())
    }
}

impl<P: MutablePreferences + ?Sized> MutablePreferencesExt for P {}
