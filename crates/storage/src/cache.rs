//! In-memory cache preferences
//!
//! This module provides a preferences backend with LRU eviction and TTL
//! support. Evicted or expired keys simply read as absent.

use lru::LruCache;
use parking_lot::Mutex;
use prefs_core::{MutablePreferences, Preferences, PreferencesDictionary, RawValue};
use std::num::NonZeroUsize;
use std::time::{Duration, SystemTime};

/// Cache entry with metadata
#[derive(Debug, Clone)]
struct CacheEntry {
    /// The cached value
    value: RawValue,
    /// When the entry expires (None = never)
    expires_at: Option<SystemTime>,
}

impl CacheEntry {
    fn new(value: RawValue, ttl: Option<Duration>) -> Self {
        let expires_at = ttl.map(|d| SystemTime::now() + d);

        Self { value, expires_at }
    }

    fn is_expired(&self) -> bool {
        if let Some(expires_at) = self.expires_at {
            SystemTime::now() > expires_at
        } else {
            false
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries
    pub max_entries: usize,
    /// Default TTL for entries
    pub default_ttl: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            default_ttl: None,
        }
    }
}

impl CacheConfig {
    /// Create a new cache configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum entries
    pub fn max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }

    /// Set default TTL
    pub fn default_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.default_ttl = ttl;
        self
    }
}

/// Preferences held in a bounded LRU cache
pub struct CachePreferences {
    cache: Mutex<LruCache<String, CacheEntry>>,
    config: CacheConfig,
}

impl Default for CachePreferences {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl CachePreferences {
    /// Create a new cache
    pub fn new(config: CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_entries).unwrap_or(NonZeroUsize::MIN);

        Self { cache: Mutex::new(LruCache::new(capacity)), config }
    }

    /// The cache configuration
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Store a value with an explicit TTL, overriding the default
    pub fn set_with_ttl(&self, key: impl Into<String>, value: RawValue, ttl: Option<Duration>) {
        let entry = CacheEntry::new(value, ttl);
        if let Some((evicted, _)) = self.cache.lock().push(key.into(), entry) {
            tracing::debug!("Cache entry {} replaced or evicted", evicted);
        }
    }

    /// Get the number of entries, expired ones included
    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    /// Check if cache is empty
    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }

    /// Remove expired entries
    pub fn evict_expired(&self) -> usize {
        let mut cache = self.cache.lock();

        let expired_keys: Vec<String> = cache
            .iter()
            .filter_map(|(k, v)| if v.is_expired() { Some(k.clone()) } else { None })
            .collect();

        for key in &expired_keys {
            cache.pop(key);
        }

        expired_keys.len()
    }
}

impl Preferences for CachePreferences {
    fn get(&self, key: &str) -> Option<RawValue> {
        let mut cache = self.cache.lock();

        let is_expired = cache.peek(key).map(|e| e.is_expired()).unwrap_or(false);
        if is_expired {
            cache.pop(key);
            return None;
        }

        cache.get(key).map(|entry| entry.value.clone())
    }

    fn export(&self) -> PreferencesDictionary {
        self.evict_expired();
        self.cache
            .lock()
            .iter()
            .map(|(k, entry)| (k.clone(), entry.value.clone()))
            .collect()
    }

    fn contains(&self, key: &str) -> bool {
        let mut cache = self.cache.lock();

        match cache.peek(key) {
            Some(entry) if entry.is_expired() => {
                cache.pop(key);
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    fn as_mutable(&self) -> Option<&dyn MutablePreferences> {
        Some(self)
    }
}

impl MutablePreferences for CachePreferences {
    fn set(&self, key: &str, value: Option<RawValue>) {
        match value {
            Some(value) => self.set_with_ttl(key, value, self.config.default_ttl),
            None => {
                self.cache.lock().pop(key);
            }
        }
    }

    fn clear_all(&self) {
        self.cache.lock().clear();
    }
}
