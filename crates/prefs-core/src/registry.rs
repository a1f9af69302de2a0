//! Registry of named backends
//!
//! Backends are registered under an [`AnyKey`], which wraps any hashable
//! value. Two keys are equal only when they wrap the same type and equal
//! values, so `AnyKey::new(1u8)` and `AnyKey::new(1u16)` never collide.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::contract::Preferences;
use crate::dictionary::MutableDictionaryPreferences;

/// Values usable as registry keys
pub trait RegistryKey: Hash + Eq + fmt::Debug + Send + Sync + 'static {}

impl<K: Hash + Eq + fmt::Debug + Send + Sync + 'static> RegistryKey for K {}

type HashFn = Arc<dyn Fn(&mut dyn Hasher) + Send + Sync>;
type EqFn = Arc<dyn Fn(&dyn Any) -> bool + Send + Sync>;

/// Type-erased hashable key
#[derive(Clone)]
pub struct AnyKey {
    underlying: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
    hash_fn: HashFn,
    eq_fn: EqFn,
}

impl AnyKey {
    /// Wrap a hashable value; wrapping an `AnyKey` returns it unchanged
    pub fn new<K: RegistryKey>(key: K) -> Self {
        if let Some(existing) = (&key as &dyn Any).downcast_ref::<AnyKey>() {
            return existing.clone();
        }
        let underlying: Arc<K> = Arc::new(key);
        let for_hash = underlying.clone();
        let for_eq = underlying.clone();
        Self {
            underlying,
            type_name: std::any::type_name::<K>(),
            hash_fn: Arc::new(move |mut state: &mut dyn Hasher| {
                std::any::TypeId::of::<K>().hash(&mut state);
                for_hash.hash(&mut state);
            }),
            eq_fn: Arc::new(move |other: &dyn Any| {
                other.downcast_ref::<K>().is_some_and(|o| o == &*for_eq)
            }),
        }
    }

    /// Borrow the wrapped value if it has type `K`
    pub fn downcast_ref<K: 'static>(&self) -> Option<&K> {
        self.underlying.downcast_ref::<K>()
    }

    /// Name of the wrapped type
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl PartialEq for AnyKey {
    fn eq(&self, other: &Self) -> bool {
        let other: &dyn Any = &*other.underlying;
        (self.eq_fn)(other)
    }
}

impl Eq for AnyKey {}

impl Hash for AnyKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let state: &mut dyn Hasher = state;
        (self.hash_fn)(state);
    }
}

impl fmt::Debug for AnyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AnyKey<{}>", self.type_name)
    }
}

/// Map of backends keyed by [`AnyKey`], with a designated shared backend
pub struct PreferencesRegistry {
    shared: RwLock<Arc<dyn Preferences>>,
    instances: RwLock<HashMap<AnyKey, Arc<dyn Preferences>>>,
}

impl Default for PreferencesRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PreferencesRegistry {
    /// Registry whose shared backend is an empty in-memory store
    pub fn new() -> Self {
        Self::with_shared(Arc::new(MutableDictionaryPreferences::new()))
    }

    /// Registry with an explicit shared backend
    pub fn with_shared(shared: Arc<dyn Preferences>) -> Self {
        Self { shared: RwLock::new(shared), instances: RwLock::new(HashMap::new()) }
    }

    /// The shared backend
    pub fn shared(&self) -> Arc<dyn Preferences> {
        self.shared.read().clone()
    }

    /// Replace the shared backend
    pub fn set_shared(&self, shared: Arc<dyn Preferences>) {
        *self.shared.write() = shared;
    }

    /// Register a backend, returning the one it replaces
    pub fn register(
        &self,
        key: impl RegistryKey,
        preferences: Arc<dyn Preferences>,
    ) -> Option<Arc<dyn Preferences>> {
        let key = AnyKey::new(key);
        tracing::debug!("Registering preferences under {:?}", key);
        self.instances.write().insert(key, preferences)
    }

    /// Backend registered under `key`
    pub fn instance(&self, key: impl RegistryKey) -> Option<Arc<dyn Preferences>> {
        self.instances.read().get(&AnyKey::new(key)).cloned()
    }

    /// Backend registered under `key`, registering one from `create` if absent
    pub fn instance_or_register<F>(&self, key: impl RegistryKey, create: F) -> Arc<dyn Preferences>
    where
        F: FnOnce() -> Arc<dyn Preferences>,
    {
        self.instances.write().entry(AnyKey::new(key)).or_insert_with(create).clone()
    }

    /// Remove the backend registered under `key`
    pub fn unregister(&self, key: impl RegistryKey) -> Option<Arc<dyn Preferences>> {
        let key = AnyKey::new(key);
        tracing::debug!("Unregistering preferences under {:?}", key);
        self.instances.write().remove(&key)
    }

    /// Number of registered backends
    pub fn len(&self) -> usize {
        self.instances.read().len()
    }

    /// Whether no backend is registered
    pub fn is_empty(&self) -> bool {
        self.instances.read().is_empty()
    }

    /// Registered keys
    pub fn keys(&self) -> Vec<AnyKey> {
        self.instances.read().keys().cloned().collect()
    }

    /// Remove every registered backend and restore an empty shared backend
    pub fn reset(&self) {
        self.instances.write().clear();
        self.set_shared(Arc::new(MutableDictionaryPreferences::new()));
    }
}

static GLOBAL: Lazy<PreferencesRegistry> = Lazy::new(PreferencesRegistry::new);

impl PreferencesRegistry {
    /// Process-wide registry
    ///
    /// Prefer passing a registry explicitly; tests that touch this one should
    /// call [`reset`](Self::reset) when done.
    pub fn global() -> &'static PreferencesRegistry {
        &GLOBAL
    }
}
