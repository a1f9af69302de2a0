//! Value transformation pipeline
//!
//! A [`Transformation`] converts between the raw value held by a backend and
//! the value handed to callers. `reverse` runs on reads, `forward` on writes.
//! Both are total: failure is `None`, which a write turns into a removal.

use std::fmt;
use std::sync::Arc;

use crate::archive;
use crate::contract::{MutablePreferences, Preferences};
use crate::convert::PreferenceValue;
use crate::value::RawValue;

/// Closure applied to a raw value in one direction
pub type TransformFn = Arc<dyn Fn(Option<RawValue>) -> Option<RawValue> + Send + Sync>;

/// Bidirectional value codec
#[derive(Clone, Default)]
pub enum Transformation {
    /// Values pass through unchanged
    #[default]
    Identity,
    /// Values are stored as a binary archive
    Archive,
    /// User supplied closures; a missing forward closure passes values through
    Closures {
        /// Applied before storing
        forward: Option<TransformFn>,
        /// Applied after reading
        reverse: TransformFn,
    },
    /// Chain of transformations; reads apply head to tail, writes tail to head
    Compose(Vec<Transformation>),
}

impl Transformation {
    /// Transformation from a pair of closures
    pub fn closures<F, R>(forward: F, reverse: R) -> Self
    where
        F: Fn(Option<RawValue>) -> Option<RawValue> + Send + Sync + 'static,
        R: Fn(Option<RawValue>) -> Option<RawValue> + Send + Sync + 'static,
    {
        Transformation::Closures { forward: Some(Arc::new(forward)), reverse: Arc::new(reverse) }
    }

    /// Transformation that only rewrites values on read
    pub fn on_read<R>(reverse: R) -> Self
    where
        R: Fn(Option<RawValue>) -> Option<RawValue> + Send + Sync + 'static,
    {
        Transformation::Closures { forward: None, reverse: Arc::new(reverse) }
    }

    /// Transformation between two typed representations
    ///
    /// `to_stored` runs on writes and `from_stored` on reads; values that do
    /// not convert become `None`.
    pub fn typed<S, V, F, R>(to_stored: F, from_stored: R) -> Self
    where
        S: PreferenceValue + 'static,
        V: PreferenceValue + 'static,
        F: Fn(V) -> Option<S> + Send + Sync + 'static,
        R: Fn(S) -> Option<V> + Send + Sync + 'static,
    {
        Self::closures(
            move |raw| raw.and_then(V::from_raw).and_then(&to_stored).and_then(S::into_raw),
            move |raw| raw.and_then(S::from_raw).and_then(&from_stored).and_then(V::into_raw),
        )
    }

    /// Convert a stored value for reading
    pub fn reverse(&self, raw: Option<RawValue>) -> Option<RawValue> {
        match self {
            Transformation::Identity => raw,
            Transformation::Archive => match raw {
                Some(RawValue::Data(data)) => archive::unarchive(&data),
                _ => None,
            },
            Transformation::Closures { reverse, .. } => reverse(raw),
            Transformation::Compose(ts) => ts.iter().fold(raw, |value, t| t.reverse(value)),
        }
    }

    /// Convert a value for storing
    ///
    /// `Archive` drops values that cannot be archived.
    pub fn forward(&self, value: Option<RawValue>) -> Option<RawValue> {
        match self {
            Transformation::Identity => value,
            Transformation::Archive => value.and_then(|v| archive::archive(&v)).map(RawValue::Data),
            Transformation::Closures { forward, .. } => match forward {
                Some(forward) => forward(value),
                None => value,
            },
            Transformation::Compose(ts) => ts.iter().rev().fold(value, |value, t| t.forward(value)),
        }
    }

    /// Chain `next` after `self`
    ///
    /// Identity on either side yields the other transformation, and a
    /// composition on the left absorbs `next`.
    pub fn compose(self, next: Transformation) -> Transformation {
        if self.is_identity() {
            return next;
        }
        if next.is_identity() {
            return self;
        }
        match self {
            Transformation::Compose(mut ts) => {
                ts.push(next);
                Transformation::Compose(ts)
            }
            other => Transformation::Compose(vec![other, next]),
        }
    }

    /// Whether this transformation leaves values unchanged structurally
    pub fn is_identity(&self) -> bool {
        match self {
            Transformation::Identity => true,
            Transformation::Compose(ts) => ts.is_empty(),
            _ => false,
        }
    }

    /// Read `key` from a backend through this transformation
    pub fn get<P: Preferences + ?Sized>(&self, key: &str, prefs: &P) -> Option<RawValue> {
        self.reverse(prefs.get(key))
    }

    /// Write `value` to a backend through this transformation
    ///
    /// The key is removed when the transformed value is absent.
    pub fn set<P: MutablePreferences + ?Sized>(&self, key: &str, value: Option<RawValue>, prefs: &P) {
        match self.forward(value) {
            Some(transformed) => prefs.set(key, Some(transformed)),
            None => prefs.remove(key),
        }
    }
}

impl PartialEq for Transformation {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Transformation::Archive, Transformation::Archive) => true,
            // Closures and non-empty compositions are never compared
            _ => self.is_identity() && other.is_identity(),
        }
    }
}

impl fmt::Debug for Transformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transformation::Identity => f.write_str("Identity"),
            Transformation::Archive => f.write_str("Archive"),
            Transformation::Closures { forward, .. } => f
                .debug_struct("Closures")
                .field("forward", &forward.is_some())
                .finish_non_exhaustive(),
            Transformation::Compose(ts) => f.debug_tuple("Compose").field(ts).finish(),
        }
    }
}
