//! Persistent key-value preferences
//!
//! This module provides a preferences backend on top of sled. Each key holds
//! the JSON encoding of one [`RawValue`]. The fallible `try_*` methods
//! surface storage errors; the [`Preferences`] implementation logs them and
//! reports absence instead.

use prefs_core::{MutablePreferences, Preferences, PreferencesDictionary, RawValue};
use sled::Db;
use std::sync::Arc;
use thiserror::Error;

/// Key-value store error types
#[derive(Debug, Error)]
pub enum KvError {
    /// Sled database error
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid key
    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

/// Result type for key-value operations
pub type Result<T> = std::result::Result<T, KvError>;

/// Key-value store configuration
#[derive(Debug, Clone)]
pub struct KvConfig {
    /// Database path
    pub path: String,
    /// Cache capacity in bytes
    pub cache_capacity: u64,
    /// Enable compression
    pub use_compression: bool,
    /// Flush interval in milliseconds (None for immediate flush)
    pub flush_every_ms: Option<u64>,
}

impl Default for KvConfig {
    fn default() -> Self {
        Self {
            path: "prefkit_kv.db".to_string(),
            cache_capacity: 16 * 1024 * 1024, // 16MB
            use_compression: true,
            flush_every_ms: Some(500),
        }
    }
}

impl KvConfig {
    /// Create a new configuration with a custom path
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into(), ..Default::default() }
    }

    /// Set cache capacity in bytes
    pub fn cache_capacity(mut self, bytes: u64) -> Self {
        self.cache_capacity = bytes;
        self
    }

    /// Enable or disable compression
    pub fn use_compression(mut self, enabled: bool) -> Self {
        self.use_compression = enabled;
        self
    }

    /// Set flush interval in milliseconds
    pub fn flush_every_ms(mut self, ms: Option<u64>) -> Self {
        self.flush_every_ms = ms;
        self
    }
}

/// Preferences persisted in a sled database
#[derive(Clone)]
pub struct KvPreferences {
    db: Arc<Db>,
}

impl KvPreferences {
    /// Open a store with configuration
    pub fn new(config: KvConfig) -> Result<Self> {
        let mut db_config = sled::Config::new()
            .path(&config.path)
            .cache_capacity(config.cache_capacity)
            .use_compression(config.use_compression);

        if let Some(ms) = config.flush_every_ms {
            db_config = db_config.flush_every_ms(Some(ms));
        }

        let db = db_config.open()?;
        tracing::debug!("Opened key-value preferences at {}", config.path);

        Ok(Self { db: Arc::new(db) })
    }

    /// Create a temporary store (for testing)
    pub fn in_memory() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Get the value stored for a key
    pub fn try_get(&self, key: &str) -> Result<Option<RawValue>> {
        match self.db.get(key.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Store a value
    pub fn try_set(&self, key: &str, value: &RawValue) -> Result<()> {
        if key.is_empty() {
            return Err(KvError::InvalidKey(key.to_string()));
        }
        let bytes = serde_json::to_vec(value)?;
        self.db.insert(key.as_bytes(), bytes)?;
        Ok(())
    }

    /// Remove a key, returning whether it existed
    pub fn try_remove(&self, key: &str) -> Result<bool> {
        Ok(self.db.remove(key.as_bytes())?.is_some())
    }

    /// Check if a key exists
    pub fn try_contains(&self, key: &str) -> Result<bool> {
        Ok(self.db.contains_key(key.as_bytes())?)
    }

    /// Get all keys with a given prefix
    pub fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();

        for item in self.db.scan_prefix(prefix.as_bytes()) {
            let (key, _) = item?;
            if let Ok(key_str) = String::from_utf8(key.to_vec()) {
                keys.push(key_str);
            }
        }

        Ok(keys)
    }

    /// Export every decodable entry
    pub fn try_export(&self) -> Result<PreferencesDictionary> {
        let mut data = PreferencesDictionary::new();

        for item in self.db.iter() {
            let (key, value) = item?;
            let Ok(key_str) = String::from_utf8(key.to_vec()) else {
                continue;
            };
            match serde_json::from_slice::<RawValue>(&value) {
                Ok(value) => {
                    data.insert(key_str, value);
                }
                Err(e) => tracing::warn!("Skipping undecodable value for {}: {}", key_str, e),
            }
        }

        Ok(data)
    }

    /// Atomically replace `old` with `new`
    ///
    /// Returns `Ok(false)` when the stored value was not `old`.
    pub fn compare_and_swap(
        &self,
        key: &str,
        old: Option<&RawValue>,
        new: Option<&RawValue>,
    ) -> Result<bool> {
        let old_bytes = old.map(serde_json::to_vec).transpose()?;
        let new_bytes = new.map(serde_json::to_vec).transpose()?;

        Ok(self
            .db
            .compare_and_swap(key.as_bytes(), old_bytes.as_deref(), new_bytes.as_deref())?
            .is_ok())
    }

    /// Remove all data
    pub fn clear(&self) -> Result<()> {
        self.db.clear()?;
        Ok(())
    }

    /// Flush pending writes to disk
    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }

    /// Get the number of keys in the store
    pub fn len(&self) -> usize {
        self.db.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }
}

impl Preferences for KvPreferences {
    fn get(&self, key: &str) -> Option<RawValue> {
        self.try_get(key)
            .map_err(|e| tracing::warn!("Failed to read {}: {}", key, e))
            .ok()
            .flatten()
    }

    fn export(&self) -> PreferencesDictionary {
        self.try_export()
            .map_err(|e| tracing::warn!("Failed to export preferences: {}", e))
            .unwrap_or_default()
    }

    fn contains(&self, key: &str) -> bool {
        // Undecodable entries read as absent, so they are not contained either
        self.get(key).is_some()
    }

    fn keys(&self) -> Vec<String> {
        self.keys_with_prefix("").unwrap_or_default()
    }

    fn as_mutable(&self) -> Option<&dyn MutablePreferences> {
        Some(self)
    }
}

impl MutablePreferences for KvPreferences {
    fn set(&self, key: &str, value: Option<RawValue>) {
        let result = match value {
            Some(value) => self.try_set(key, &value),
            None => self.try_remove(key).map(|_| ()),
        };
        if let Err(e) = result {
            tracing::warn!("Failed to write {}: {}", key, e);
        }
    }

    fn clear_all(&self) {
        if let Err(e) = self.clear() {
            tracing::warn!("Failed to clear preferences: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prefs_core::{MutablePreferencesExt, OpaqueValue, PreferencesExt};

    #[test]
    fn test_kv_store_creation() {
        let kv = KvPreferences::in_memory().unwrap();
        assert!(kv.is_empty());
    }

    #[test]
    fn test_set_and_get() {
        let kv = KvPreferences::in_memory().unwrap();

        kv.set_value("test_key", "test_value");
        assert_eq!(kv.string("test_key"), Some("test_value".to_string()));

        kv.try_set("count", &RawValue::Integer(42)).unwrap();
        assert_eq!(kv.try_get("count").unwrap(), Some(RawValue::Integer(42)));
    }

    #[test]
    fn test_nested_values() {
        let kv = KvPreferences::in_memory().unwrap();
        let mut dico = PreferencesDictionary::new();
        dico.insert("width".to_string(), RawValue::Integer(800));
        dico.insert("tags".to_string(), RawValue::Array(vec![RawValue::from("a")]));
        let value = RawValue::Dictionary(dico);

        kv.set("window", Some(value.clone()));
        assert_eq!(kv.get("window"), Some(value));
    }

    #[test]
    fn test_get_nonexistent() {
        let kv = KvPreferences::in_memory().unwrap();
        assert_eq!(kv.get("nonexistent"), None);
        assert!(!kv.contains("nonexistent"));
    }

    #[test]
    fn test_remove() {
        let kv = KvPreferences::in_memory().unwrap();

        kv.set_value("key", "value");
        assert!(kv.contains("key"));

        assert!(kv.try_remove("key").unwrap());
        assert!(!kv.contains("key"));
        assert!(!kv.try_remove("key").unwrap());
    }

    #[test]
    fn test_opaque_values_are_not_stored() {
        let kv = KvPreferences::in_memory().unwrap();
        kv.set("handle", Some(RawValue::Opaque(OpaqueValue::new(3u8))));
        assert!(!kv.contains("handle"));
        assert!(kv.try_set("handle", &RawValue::Opaque(OpaqueValue::new(3u8))).is_err());
    }

    #[test]
    fn test_undecodable_entry_is_absent() {
        let kv = KvPreferences::in_memory().unwrap();
        kv.db.insert("broken", &b"not json"[..]).unwrap();

        assert!(kv.try_contains("broken").unwrap());
        assert_eq!(kv.get("broken"), None);
        assert!(!kv.contains("broken"));
        assert!(kv.export().is_empty());
    }

    #[test]
    fn test_empty_key_rejected() {
        let kv = KvPreferences::in_memory().unwrap();
        assert!(matches!(kv.try_set("", &RawValue::Bool(true)), Err(KvError::InvalidKey(_))));
    }

    #[test]
    fn test_clear_all() {
        let kv = KvPreferences::in_memory().unwrap();

        kv.set_value("key1", "value1");
        kv.set_value("key2", "value2");
        assert_eq!(kv.len(), 2);

        kv.clear_all();
        assert!(kv.is_empty());
    }

    #[test]
    fn test_keys_with_prefix() {
        let kv = KvPreferences::in_memory().unwrap();

        kv.set_value("app.setting1", "value1");
        kv.set_value("app.setting2", "value2");
        kv.set_value("user.name", "Alice");

        let keys = kv.keys_with_prefix("app.").unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&"app.setting1".to_string()));
        assert_eq!(kv.keys().len(), 3);
    }

    #[test]
    fn test_export() {
        let kv = KvPreferences::in_memory().unwrap();
        kv.set_value("a", 1i64);
        kv.set_value("b", true);

        let exported = kv.export();
        assert_eq!(exported.len(), 2);
        assert_eq!(exported.get("b"), Some(&RawValue::Bool(true)));
    }

    #[test]
    fn test_compare_and_swap() {
        let kv = KvPreferences::in_memory().unwrap();
        kv.set_value("counter", 0i64);

        let zero = RawValue::Integer(0);
        let one = RawValue::Integer(1);
        assert!(kv.compare_and_swap("counter", Some(&zero), Some(&one)).unwrap());
        assert_eq!(kv.integer("counter"), 1);

        // Value has changed
        assert!(!kv.compare_and_swap("counter", Some(&zero), Some(&RawValue::Integer(2))).unwrap());
        assert_eq!(kv.integer("counter"), 1);
    }

    #[test]
    fn test_persistent_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.db");
        let config = KvConfig::new(path.to_string_lossy()).flush_every_ms(None);

        {
            let kv = KvPreferences::new(config.clone()).unwrap();
            kv.set_value("theme", "dark");
            kv.flush().unwrap();
        }

        let kv = KvPreferences::new(config).unwrap();
        assert_eq!(kv.string("theme"), Some("dark".to_string()));
    }
}
