//! Namespacing proxies
//!
//! A proxy rewrites every key as `parent_key + separator + key` before
//! delegating to the wrapped backend, which lets one physical store be
//! partitioned into independent namespaces.
//!
//! When a separator is configured, [`ProxyPreferences::entry`] walks nested
//! namespaces: a miss on `a.b` yields a proxy scoped to `a.b.` instead of
//! nothing. Plain [`Preferences::get`] always reports a miss as `None`.

use std::sync::Arc;

use crate::contract::{MutablePreferences, Preferences};
use crate::value::{PreferencesDictionary, RawValue};

/// Result of a nested proxy lookup
pub enum ProxyEntry {
    /// A value is stored at the composed key
    Value(RawValue),
    /// No value; a proxy one namespace deeper
    Nested(ProxyPreferences),
}

impl ProxyEntry {
    /// Stored value, if any
    pub fn value(self) -> Option<RawValue> {
        match self {
            ProxyEntry::Value(v) => Some(v),
            ProxyEntry::Nested(_) => None,
        }
    }

    /// Nested proxy, if the lookup missed
    pub fn nested(self) -> Option<ProxyPreferences> {
        match self {
            ProxyEntry::Value(_) => None,
            ProxyEntry::Nested(p) => Some(p),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Namespace {
    parent_key: String,
    separator: Option<String>,
}

impl Namespace {
    fn prefix(&self) -> String {
        format!("{}{}", self.parent_key, self.separator.as_deref().unwrap_or(""))
    }

    fn compute_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix(), key)
    }

    fn inverse_key<'k>(&self, key: &'k str) -> Option<&'k str> {
        key.strip_prefix(self.prefix().as_str())
    }

    fn is_identity(&self) -> bool {
        self.parent_key.is_empty() && self.separator.as_deref().unwrap_or("").is_empty()
    }

    fn nested(&self, key: &str) -> Self {
        Self { parent_key: self.compute_key(key), separator: self.separator.clone() }
    }

    fn export_from(&self, source: PreferencesDictionary) -> PreferencesDictionary {
        if self.is_identity() {
            return source;
        }
        source
            .into_iter()
            .filter_map(|(key, value)| self.inverse_key(&key).map(|k| (k.to_string(), value)))
            .collect()
    }
}

/// Read-only proxy over another backend
#[derive(Clone)]
pub struct ProxyPreferences {
    proxiable: Arc<dyn Preferences>,
    namespace: Namespace,
}

impl ProxyPreferences {
    /// Proxy with the same keys and values
    pub fn identity(proxiable: Arc<dyn Preferences>) -> Self {
        Self::new(proxiable, "")
    }

    /// Proxy prefixing every key with `parent_key`
    pub fn new(proxiable: Arc<dyn Preferences>, parent_key: impl Into<String>) -> Self {
        Self {
            proxiable,
            namespace: Namespace { parent_key: parent_key.into(), separator: None },
        }
    }

    /// Proxy prefixing keys with `parent_key` and `separator`, allowing nested lookups
    pub fn with_separator(
        proxiable: Arc<dyn Preferences>,
        parent_key: impl Into<String>,
        separator: impl Into<String>,
    ) -> Self {
        Self {
            proxiable,
            namespace: Namespace {
                parent_key: parent_key.into(),
                separator: Some(separator.into()),
            },
        }
    }

    /// The key prefix
    pub fn parent_key(&self) -> &str {
        &self.namespace.parent_key
    }

    /// The separator, if nested lookups are enabled
    pub fn separator(&self) -> Option<&str> {
        self.namespace.separator.as_deref()
    }

    /// Key used in the wrapped backend for a local key
    pub fn compute_key(&self, key: &str) -> String {
        self.namespace.compute_key(key)
    }

    /// Look up a key, descending into a nested namespace on a miss
    ///
    /// Without a separator a miss is reported as `None`.
    pub fn entry(&self, key: &str) -> Option<ProxyEntry> {
        if let Some(value) = self.get(key) {
            return Some(ProxyEntry::Value(value));
        }
        self.namespace.separator.as_ref()?;
        Some(ProxyEntry::Nested(Self {
            proxiable: self.proxiable.clone(),
            namespace: self.namespace.nested(key),
        }))
    }
}

impl Preferences for ProxyPreferences {
    fn get(&self, key: &str) -> Option<RawValue> {
        self.proxiable.get(&self.compute_key(key))
    }

    fn export(&self) -> PreferencesDictionary {
        self.namespace.export_from(self.proxiable.export())
    }

    fn contains(&self, key: &str) -> bool {
        self.proxiable.contains(&self.compute_key(key))
    }
}

/// Writable proxy over a mutable backend
#[derive(Clone)]
pub struct MutableProxyPreferences {
    mutable: Arc<dyn MutablePreferences>,
    namespace: Namespace,
}

impl MutableProxyPreferences {
    /// Proxy prefixing every key with `parent_key`
    pub fn new(mutable: Arc<dyn MutablePreferences>, parent_key: impl Into<String>) -> Self {
        Self {
            mutable,
            namespace: Namespace { parent_key: parent_key.into(), separator: None },
        }
    }

    /// Proxy prefixing keys with `parent_key` and `separator`
    pub fn with_separator(
        mutable: Arc<dyn MutablePreferences>,
        parent_key: impl Into<String>,
        separator: impl Into<String>,
    ) -> Self {
        Self {
            mutable,
            namespace: Namespace {
                parent_key: parent_key.into(),
                separator: Some(separator.into()),
            },
        }
    }

    /// Key used in the wrapped backend for a local key
    pub fn compute_key(&self, key: &str) -> String {
        self.namespace.compute_key(key)
    }

    /// Writable proxy one namespace deeper
    pub fn child(&self, key: &str) -> Self {
        Self { mutable: self.mutable.clone(), namespace: self.namespace.nested(key) }
    }
}

impl Preferences for MutableProxyPreferences {
    fn get(&self, key: &str) -> Option<RawValue> {
        self.mutable.get(&self.compute_key(key))
    }

    fn export(&self) -> PreferencesDictionary {
        self.namespace.export_from(self.mutable.export())
    }

    fn contains(&self, key: &str) -> bool {
        self.mutable.contains(&self.compute_key(key))
    }

    fn as_mutable(&self) -> Option<&dyn MutablePreferences> {
        Some(self)
    }
}

impl MutablePreferences for MutableProxyPreferences {
    fn set(&self, key: &str, value: Option<RawValue>) {
        self.mutable.set(&self.compute_key(key), value);
    }

    fn set_all(&self, values: PreferencesDictionary) {
        if self.namespace.is_identity() {
            self.mutable.set_all(values);
            return;
        }
        let rewritten = values
            .into_iter()
            .map(|(key, value)| (self.compute_key(&key), value))
            .collect();
        self.mutable.set_all(rewritten);
    }

    fn clear_all(&self) {
        if self.namespace.is_identity() {
            self.mutable.clear_all();
            return;
        }
        for key in self.export().into_keys() {
            self.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::MutablePreferencesExt;
    use crate::dictionary::MutableDictionaryPreferences;

    fn store() -> Arc<MutableDictionaryPreferences> {
        let prefs = MutableDictionaryPreferences::new();
        prefs.set_value("app.k1", 1i64);
        prefs.set_value("other.k2", 2i64);
        Arc::new(prefs)
    }

    #[test]
    fn test_namespace_roundtrip() {
        let backend = Arc::new(MutableDictionaryPreferences::new());
        let proxy = MutableProxyPreferences::new(backend.clone(), "app.");

        proxy.set_value("k", "v");
        assert_eq!(backend.get("app.k"), Some(RawValue::from("v")));
        assert_eq!(proxy.get("k"), Some(RawValue::from("v")));
        assert!(proxy.contains("k"));
        assert!(!backend.contains("k"));
    }

    #[test]
    fn test_export_inversion() {
        let proxy = ProxyPreferences::new(store(), "app.");
        let mut expected = PreferencesDictionary::new();
        expected.insert("k1".to_string(), RawValue::Integer(1));
        assert_eq!(proxy.export(), expected);
    }

    #[test]
    fn test_identity_proxy_passes_through() {
        let backend = store();
        let proxy = ProxyPreferences::identity(backend.clone());
        assert_eq!(proxy.export(), backend.export());
        assert_eq!(proxy.get("app.k1"), Some(RawValue::Integer(1)));
    }

    #[test]
    fn test_separator_composes_keys() {
        let backend = Arc::new(MutableDictionaryPreferences::new());
        let proxy = MutableProxyPreferences::with_separator(backend.clone(), "app", ".");

        proxy.set_value("theme", "dark");
        assert_eq!(backend.get("app.theme"), Some(RawValue::from("dark")));

        let child = proxy.child("window");
        child.set_value("width", 800i64);
        assert_eq!(backend.get("app.window.width"), Some(RawValue::Integer(800)));
        assert_eq!(proxy.export().len(), 2);
    }

    #[test]
    fn test_entry_descends_on_miss() {
        let backend = Arc::new(MutableDictionaryPreferences::new());
        backend.set_value("a.b.c", 3i64);
        let proxy = ProxyPreferences::with_separator(backend.clone(), "a", ".");

        // Plain reads report a miss
        assert_eq!(proxy.get("b"), None);

        let nested = proxy.entry("b").and_then(ProxyEntry::nested).unwrap();
        assert_eq!(nested.parent_key(), "a.b");
        assert_eq!(nested.entry("c").and_then(ProxyEntry::value), Some(RawValue::Integer(3)));
    }

    #[test]
    fn test_entry_without_separator_misses() {
        let proxy = ProxyPreferences::new(store(), "app.");
        assert!(proxy.entry("missing").is_none());
        assert!(matches!(proxy.entry("k1"), Some(ProxyEntry::Value(RawValue::Integer(1)))));
    }

    #[test]
    fn test_set_all_rewrites_each_key() {
        let backend = Arc::new(MutableDictionaryPreferences::new());
        let proxy = MutableProxyPreferences::new(backend.clone(), "ns.");

        let mut values = PreferencesDictionary::new();
        values.insert("a".to_string(), RawValue::Integer(1));
        values.insert("b".to_string(), RawValue::Integer(2));
        proxy.set_all(values);

        assert_eq!(backend.get("ns.a"), Some(RawValue::Integer(1)));
        assert_eq!(backend.get("ns.b"), Some(RawValue::Integer(2)));
        assert!(!backend.contains("a"));
    }

    #[test]
    fn test_clear_all_stays_in_namespace() {
        let backend = store();
        let proxy = MutableProxyPreferences::new(backend.clone(), "app.");

        proxy.clear_all();
        assert!(!backend.contains("app.k1"));
        assert_eq!(backend.get("other.k2"), Some(RawValue::Integer(2)));
    }

    #[test]
    fn test_proxy_over_proxy() {
        let backend = Arc::new(MutableDictionaryPreferences::new());
        let outer = Arc::new(MutableProxyPreferences::new(backend.clone(), "user."));
        let inner = MutableProxyPreferences::new(outer, "alice.");

        inner.set_value("name", "Alice");
        assert_eq!(backend.get("user.alice.name"), Some(RawValue::from("Alice")));
        assert_eq!(inner.export().keys().collect::<Vec<_>>(), vec!["name"]);
    }
}
