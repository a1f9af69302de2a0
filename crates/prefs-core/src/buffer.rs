//! Buffered preferences with explicit commit and rollback
//!
//! A [`BufferPreferences`] snapshots a mutable backend, absorbs writes in
//! memory, and only touches the wrapped backend on [`commit`](BufferPreferences::commit).

use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::contract::{MutablePreferences, Preferences};
use crate::dictionary::MutableDictionaryPreferences;
use crate::value::{PreferencesDictionary, RawValue};

/// Write buffer in front of a mutable backend
pub struct BufferPreferences {
    buffered: Arc<dyn MutablePreferences>,
    buffer: MutableDictionaryPreferences,
    removed: Mutex<BTreeSet<String>>,
}

impl BufferPreferences {
    /// Create a buffer seeded with the backend's current content
    pub fn new(buffered: Arc<dyn MutablePreferences>) -> Self {
        let buffer = MutableDictionaryPreferences::with_dictionary(buffered.export());
        Self { buffered, buffer, removed: Mutex::new(BTreeSet::new()) }
    }

    /// Push buffered content to the backend
    ///
    /// Keys removed through the buffer since the last commit or rollback are
    /// removed from the backend as well. Keys the backend gained from other
    /// writers are left alone.
    pub fn commit(&self) {
        let content = self.buffer.export();
        let removed = std::mem::take(&mut *self.removed.lock());

        tracing::debug!("Committing {} buffered keys, removing {}", content.len(), removed.len());

        for key in removed {
            self.buffered.remove(&key);
        }
        self.buffered.set_all(content);
    }

    /// Discard buffered changes and reload from the backend
    pub fn rollback(&self) {
        tracing::debug!("Rolling back buffered preferences");
        self.removed.lock().clear();
        self.buffer.replace(self.buffered.export());
    }

    /// Check whether the buffer differs from the backend
    pub fn has_changes(&self) -> bool {
        self.buffer.export() != self.buffered.export()
    }
}

impl Preferences for BufferPreferences {
    fn get(&self, key: &str) -> Option<RawValue> {
        self.buffer.get(key)
    }

    fn export(&self) -> PreferencesDictionary {
        self.buffer.export()
    }

    fn contains(&self, key: &str) -> bool {
        self.buffer.contains(key)
    }

    fn as_mutable(&self) -> Option<&dyn MutablePreferences> {
        Some(self)
    }
}

impl MutablePreferences for BufferPreferences {
    fn set(&self, key: &str, value: Option<RawValue>) {
        let mut removed = self.removed.lock();
        if value.is_some() {
            removed.remove(key);
        } else {
            removed.insert(key.to_string());
        }
        self.buffer.set(key, value);
    }

    fn set_all(&self, values: PreferencesDictionary) {
        let mut removed = self.removed.lock();
        for key in values.keys() {
            removed.remove(key);
        }
        self.buffer.set_all(values);
    }

    fn clear_all(&self) {
        let mut removed = self.removed.lock();
        removed.extend(self.buffer.keys());
        self.buffer.clear_all();
    }
}
