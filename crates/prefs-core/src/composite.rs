//! Composite preferences
//!
//! A composite aggregates an ordered list of backends. Reads scan the list
//! and the first backend holding a value wins. Writes go to the first
//! mutable backend, or to every mutable backend, depending on the
//! `affect_only_first_mutable` policy. The list is fixed at construction;
//! build a new composite to change it.

use std::sync::Arc;

use crate::contract::{MutablePreferences, Preferences};
use crate::value::{PreferencesDictionary, RawValue};

/// Read-only aggregation of backends with first-wins lookup
#[derive(Clone, Default)]
pub struct CompositePreferences {
    layers: Vec<Arc<dyn Preferences>>,
}

impl CompositePreferences {
    /// Create from an ordered list of backends
    pub fn new(layers: Vec<Arc<dyn Preferences>>) -> Self {
        Self { layers }
    }

    /// Backends in lookup order
    pub fn layers(&self) -> &[Arc<dyn Preferences>] {
        &self.layers
    }

    /// Number of backends that accept writes
    pub fn mutable_count(&self) -> usize {
        self.layers.iter().filter(|p| p.as_mutable().is_some()).count()
    }

    /// Number of read-only backends
    pub fn immutable_count(&self) -> usize {
        self.layers.len() - self.mutable_count()
    }

    /// First backend that defines `key`
    pub fn preferences_with(&self, key: &str) -> Option<&Arc<dyn Preferences>> {
        self.layers.iter().find(|p| p.contains(key))
    }

    /// First mutable backend that defines `key`
    pub fn mutable_preferences_with(&self, key: &str) -> Option<&dyn MutablePreferences> {
        self.layers
            .iter()
            .filter(|p| p.contains(key))
            .find_map(|p| p.as_mutable())
    }

    fn mutable_layers(&self) -> impl Iterator<Item = &dyn MutablePreferences> {
        self.layers.iter().filter_map(|p| p.as_mutable())
    }
}

impl FromIterator<Arc<dyn Preferences>> for CompositePreferences {
    fn from_iter<I: IntoIterator<Item = Arc<dyn Preferences>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl Preferences for CompositePreferences {
    fn get(&self, key: &str) -> Option<RawValue> {
        self.layers.iter().find_map(|p| p.get(key))
    }

    fn export(&self) -> PreferencesDictionary {
        // Fold from the tail so that earlier backends overwrite later ones
        let mut dico = PreferencesDictionary::new();
        for prefs in self.layers.iter().rev() {
            dico.extend(prefs.export());
        }
        dico
    }
}

/// Writable aggregation of backends
#[derive(Clone)]
pub struct MutableCompositePreferences {
    inner: CompositePreferences,
    affect_only_first_mutable: bool,
}

impl MutableCompositePreferences {
    /// Create a composite that writes to the first mutable backend only
    pub fn new(layers: Vec<Arc<dyn Preferences>>) -> Self {
        Self::with_policy(layers, true)
    }

    /// Create a composite with an explicit write policy
    pub fn with_policy(layers: Vec<Arc<dyn Preferences>>, affect_only_first_mutable: bool) -> Self {
        Self { inner: CompositePreferences::new(layers), affect_only_first_mutable }
    }

    /// Whether writes stop at the first mutable backend
    pub fn affect_only_first_mutable(&self) -> bool {
        self.affect_only_first_mutable
    }

    /// Read-only view of the same backends
    pub fn as_composite(&self) -> &CompositePreferences {
        &self.inner
    }

    /// Backends that receive writes under the current policy
    fn write_targets(&self) -> impl Iterator<Item = &dyn MutablePreferences> {
        let limit = if self.affect_only_first_mutable { 1 } else { usize::MAX };
        self.inner.mutable_layers().take(limit)
    }
}

impl Preferences for MutableCompositePreferences {
    fn get(&self, key: &str) -> Option<RawValue> {
        self.inner.get(key)
    }

    fn export(&self) -> PreferencesDictionary {
        self.inner.export()
    }

    fn as_mutable(&self) -> Option<&dyn MutablePreferences> {
        Some(self)
    }
}

impl MutablePreferences for MutableCompositePreferences {
    fn set(&self, key: &str, value: Option<RawValue>) {
        for prefs in self.write_targets() {
            prefs.set(key, value.clone());
        }
    }

    fn set_all(&self, values: PreferencesDictionary) {
        for prefs in self.write_targets() {
            prefs.set_all(values.clone());
        }
    }

    fn clear_all(&self) {
        let mut cleared = 0;
        for prefs in self.inner.mutable_layers() {
            prefs.clear_all();
            cleared += 1;
        }
        tracing::debug!("Cleared {} mutable backends", cleared);
    }
}
