//! Typed preference handles
//!
//! A handle binds a backend, a key and a transformation. It keeps no copy of
//! the value: every access goes back to the backend.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::contract::{MutablePreferences, Preferences};
use crate::convert::PreferenceValue;
use crate::transformation::Transformation;
use crate::value::RawValue;

/// Callback invoked with `(old, new)` after each committed change
pub type ChangeCallback<T> = Arc<dyn Fn(Option<T>, Option<T>) + Send + Sync>;

/// Read access shared by both handle kinds
pub trait ReadablePreference<T: PreferenceValue> {
    /// The key bound to this handle
    fn key(&self) -> &str;

    /// Current value, read through the transformation
    fn value(&self) -> Option<T>;

    /// Whether the backend holds a raw value for the key
    fn has_value(&self) -> bool;

    /// Whether the transformed value is absent
    fn is_empty(&self) -> bool {
        self.value().is_none()
    }
}

/// Read-only typed handle
pub struct Preference<T> {
    preferences: Arc<dyn Preferences>,
    key: String,
    transformation: Transformation,
    _marker: PhantomData<fn() -> T>,
}

impl<T: PreferenceValue> Preference<T> {
    /// Bind a key of a backend
    pub fn new(preferences: Arc<dyn Preferences>, key: impl Into<String>) -> Self {
        Self::with_transformation(preferences, key, Transformation::Identity)
    }

    /// Bind a key of a backend through a transformation
    pub fn with_transformation(
        preferences: Arc<dyn Preferences>,
        key: impl Into<String>,
        transformation: Transformation,
    ) -> Self {
        Self { preferences, key: key.into(), transformation, _marker: PhantomData }
    }

    /// The transformation applied to stored values
    pub fn transformation(&self) -> &Transformation {
        &self.transformation
    }
}

impl<T: PreferenceValue> ReadablePreference<T> for Preference<T> {
    fn key(&self) -> &str {
        &self.key
    }

    fn value(&self) -> Option<T> {
        self.transformation
            .get(&self.key, self.preferences.as_ref())
            .and_then(T::from_raw)
    }

    fn has_value(&self) -> bool {
        self.preferences.contains(&self.key)
    }
}

impl<T> Clone for Preference<T> {
    fn clone(&self) -> Self {
        Self {
            preferences: self.preferences.clone(),
            key: self.key.clone(),
            transformation: self.transformation.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: PreferenceValue + PartialEq> PartialEq for Preference<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value() == other.value()
    }
}

/// Writable typed handle
pub struct MutablePreference<T> {
    preferences: Arc<dyn MutablePreferences>,
    key: String,
    transformation: Transformation,
    on_change: Option<ChangeCallback<T>>,
}

impl<T: PreferenceValue> MutablePreference<T> {
    /// Bind a key of a mutable backend
    pub fn new(preferences: Arc<dyn MutablePreferences>, key: impl Into<String>) -> Self {
        Self::with_transformation(preferences, key, Transformation::Identity)
    }

    /// Bind a key of a mutable backend through a transformation
    pub fn with_transformation(
        preferences: Arc<dyn MutablePreferences>,
        key: impl Into<String>,
        transformation: Transformation,
    ) -> Self {
        Self { preferences, key: key.into(), transformation, on_change: None }
    }

    /// The transformation applied to stored values
    pub fn transformation(&self) -> &Transformation {
        &self.transformation
    }

    /// Register a callback fired after every committed change
    pub fn on_change<F>(mut self, callback: F) -> Self
    where
        F: Fn(Option<T>, Option<T>) + Send + Sync + 'static,
    {
        self.on_change = Some(Arc::new(callback));
        self
    }

    /// New handle on the same key with a change callback
    pub fn did_set<F>(&self, callback: F) -> Self
    where
        F: Fn(Option<T>, Option<T>) + Send + Sync + 'static,
    {
        Self::with_transformation(self.preferences.clone(), self.key.clone(), self.transformation.clone())
            .on_change(callback)
    }

    /// Store a value, or remove it for `None`
    pub fn set(&self, value: Option<T>) {
        let raw = value.and_then(T::into_raw);
        self.notify(|| self.transformation.set(&self.key, raw, self.preferences.as_ref()));
    }

    /// Store a value
    pub fn set_value(&self, value: T) {
        self.set(Some(value));
    }

    /// Remove the stored value
    pub fn clear(&self) {
        self.notify(|| self.preferences.remove(&self.key));
    }

    /// Replace the value with the result of `f`
    pub fn apply<F>(&self, f: F)
    where
        F: FnOnce(Option<T>) -> Option<T>,
    {
        self.set(f(self.value()));
    }

    /// Handle of another type on the same key
    ///
    /// The current value is mapped through `f` and written once, right away;
    /// later reads of either handle see whatever the backend holds.
    pub fn transform<U, F>(&self, f: F) -> MutablePreference<U>
    where
        U: PreferenceValue,
        F: FnOnce(Option<T>) -> Option<U>,
    {
        let mapped = MutablePreference::<U>::with_transformation(
            self.preferences.clone(),
            self.key.clone(),
            self.transformation.clone(),
        );
        mapped.set(f(self.value()));
        mapped
    }

    /// Handle that reads `fallback` whenever `when` holds for the stored value
    ///
    /// Only reads are affected; writes go through the existing transformation.
    /// Raw values that do not convert to `T` are returned untouched.
    pub fn ensure<F>(&self, when: F, fallback: T) -> Self
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(Option<&T>) -> bool + Send + Sync + 'static,
    {
        let substitute = Transformation::on_read(move |raw: Option<RawValue>| match raw {
            None if when(None) => fallback.clone().into_raw(),
            None => None,
            Some(raw) => match T::from_raw(raw.clone()) {
                Some(typed) if when(Some(&typed)) => fallback.clone().into_raw(),
                _ => Some(raw),
            },
        });
        Self::with_transformation(
            self.preferences.clone(),
            self.key.clone(),
            self.transformation.clone().compose(substitute),
        )
    }

    /// Handle that reads `fallback` while no value is stored
    pub fn when_nil(&self, fallback: T) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        self.ensure(|value| value.is_none(), fallback)
    }

    /// Store `value` only when nothing is stored yet
    pub fn assign_if_absent<F>(&self, value: F)
    where
        F: FnOnce() -> T,
    {
        if !self.has_value() {
            self.set(Some(value()));
        }
    }

    fn notify<F: FnOnce()>(&self, change: F) {
        let old = match self.on_change {
            Some(_) => self.value(),
            None => None,
        };
        change();
        if let Some(callback) = &self.on_change {
            callback(old, self.value());
        }
    }
}

impl<T: PreferenceValue> ReadablePreference<T> for MutablePreference<T> {
    fn key(&self) -> &str {
        &self.key
    }

    fn value(&self) -> Option<T> {
        self.transformation
            .get(&self.key, self.preferences.as_ref())
            .and_then(T::from_raw)
    }

    fn has_value(&self) -> bool {
        self.preferences.contains(&self.key)
    }
}

impl<T> Clone for MutablePreference<T> {
    fn clone(&self) -> Self {
        Self {
            preferences: self.preferences.clone(),
            key: self.key.clone(),
            transformation: self.transformation.clone(),
            on_change: self.on_change.clone(),
        }
    }
}

impl<T: PreferenceValue + PartialEq> PartialEq for MutablePreference<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value() == other.value()
    }
}

/// Handle constructors for shared backends
pub trait PreferenceHandles {
    /// Read-only handle on `key`
    fn preference<T: PreferenceValue>(&self, key: &str) -> Preference<T>;
}

impl<P: Preferences + 'static> PreferenceHandles for Arc<P> {
    fn preference<T: PreferenceValue>(&self, key: &str) -> Preference<T> {
        Preference::new(self.clone(), key)
    }
}

/// Handle constructors for shared mutable backends
pub trait MutablePreferenceHandles {
    /// Writable handle on `key`
    fn mutable_preference<T: PreferenceValue>(&self, key: &str) -> MutablePreference<T>;
}

impl<P: MutablePreferences + 'static> MutablePreferenceHandles for Arc<P> {
    fn mutable_preference<T: PreferenceValue>(&self, key: &str) -> MutablePreference<T> {
        MutablePreference::new(self.clone(), key)
    }
}
