//! Core preferences layer for prefkit
//!
//! This crate provides the key-value contract shared by every preferences
//! backend, the in-memory backends, the composite and proxy combinators,
//! the value transformation pipeline and typed preference handles.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod archive;
pub mod buffer;
pub mod composite;
pub mod contract;
pub mod convert;
pub mod dictionary;
pub mod error;
pub mod ops;
pub mod preference;
pub mod proxy;
pub mod registry;
pub mod transformation;
pub mod value;

pub use adapters::{CollectionPreferences, ReflectingPreferences};
pub use buffer::BufferPreferences;
pub use composite::{CompositePreferences, MutableCompositePreferences};
pub use contract::{MutablePreferences, MutablePreferencesExt, Preferences, PreferencesExt};
pub use convert::{Bytes, Json, PreferenceValue};
pub use dictionary::{DictionaryPreferences, MutableDictionaryPreferences};
pub use error::{PrefsError, Result};
pub use ops::Appendable;
pub use preference::{
    MutablePreference, MutablePreferenceHandles, Preference, PreferenceHandles, ReadablePreference,
};
pub use proxy::{MutableProxyPreferences, ProxyEntry, ProxyPreferences};
pub use registry::{AnyKey, PreferencesRegistry, RegistryKey};
pub use transformation::Transformation;
pub use value::{OpaqueValue, PreferenceKey, PreferencesDictionary, RawValue};
