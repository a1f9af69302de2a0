//! Read-only adapters over plain Rust data
//!
//! - [`CollectionPreferences`]: a list of items, with closures extracting a
//!   key and a value from each item
//! - [`ReflectingPreferences`]: the top-level fields of a serializable struct

use parking_lot::RwLock;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::contract::Preferences;
use crate::value::{PreferencesDictionary, RawValue};

type MapKey<E> = Arc<dyn Fn(&E) -> String + Send + Sync>;
type MapValue<E> = Arc<dyn Fn(&E) -> RawValue + Send + Sync>;

/// Collection of items exposed as preferences
///
/// Lookups scan the items in order and the first item whose key matches
/// wins. In the export, later duplicates overwrite earlier ones.
pub struct CollectionPreferences<E> {
    items: Vec<E>,
    map_key: MapKey<E>,
    map_value: MapValue<E>,
}

impl<E> CollectionPreferences<E> {
    /// Wrap `items`, deriving each key and value with the given closures
    pub fn new<K, V>(items: Vec<E>, map_key: K, map_value: V) -> Self
    where
        K: Fn(&E) -> String + Send + Sync + 'static,
        V: Fn(&E) -> RawValue + Send + Sync + 'static,
    {
        Self { items, map_key: Arc::new(map_key), map_value: Arc::new(map_value) }
    }

    /// The wrapped items
    pub fn items(&self) -> &[E] {
        &self.items
    }
}

impl<E> Clone for CollectionPreferences<E>
where
    E: Clone,
{
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
            map_key: self.map_key.clone(),
            map_value: self.map_value.clone(),
        }
    }
}

impl<E> fmt::Debug for CollectionPreferences<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionPreferences")
            .field("len", &self.items.len())
            .finish_non_exhaustive()
    }
}

impl<E: Send + Sync> Preferences for CollectionPreferences<E> {
    fn get(&self, key: &str) -> Option<RawValue> {
        self.items
            .iter()
            .find(|item| (self.map_key)(*item) == key)
            .map(|item| (self.map_value)(item))
    }

    fn export(&self) -> PreferencesDictionary {
        self.items
            .iter()
            .map(|item| ((self.map_key)(item), (self.map_value)(item)))
            .collect()
    }
}

/// Fields of a serializable value exposed as preferences
///
/// Keys are the serialized field names. Fields that serialize to `null`
/// read as absent. A value that does not serialize to a JSON object exposes
/// no keys.
#[derive(Debug, Default)]
pub struct ReflectingPreferences<T> {
    value: RwLock<T>,
}

impl<T: Serialize> ReflectingPreferences<T> {
    /// Reflect `value`
    pub fn new(value: T) -> Self {
        Self { value: RwLock::new(value) }
    }

    /// Replace the reflected value
    pub fn replace(&self, value: T) -> T {
        std::mem::replace(&mut *self.value.write(), value)
    }

    /// Run `f` with the reflected value
    pub fn with_value<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&*self.value.read())
    }

    fn fields(&self) -> PreferencesDictionary {
        match serde_json::to_value(&*self.value.read()) {
            Ok(serde_json::Value::Object(fields)) => fields
                .into_iter()
                .filter_map(|(k, v)| RawValue::from_json(v).map(|v| (k, v)))
                .collect(),
            Ok(_) => PreferencesDictionary::new(),
            Err(e) => {
                tracing::warn!("Failed to reflect value: {}", e);
                PreferencesDictionary::new()
            }
        }
    }
}

impl<T: Serialize + Send + Sync> Preferences for ReflectingPreferences<T> {
    fn get(&self, key: &str) -> Option<RawValue> {
        self.fields().remove(key)
    }

    fn export(&self) -> PreferencesDictionary {
        self.fields()
    }
}
