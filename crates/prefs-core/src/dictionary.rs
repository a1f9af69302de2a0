//! In-memory dictionary backends

use parking_lot::RwLock;

use crate::contract::{MutablePreferences, Preferences};
use crate::value::{PreferencesDictionary, RawValue};

/// Read-only preferences over a fixed dictionary
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DictionaryPreferences {
    dico: PreferencesDictionary,
}

impl DictionaryPreferences {
    /// Create from a dictionary
    pub fn new(dico: PreferencesDictionary) -> Self {
        Self { dico }
    }

    /// Snapshot another backend
    pub fn from_preferences<P: Preferences + ?Sized>(prefs: &P) -> Self {
        Self { dico: prefs.export() }
    }

    /// Parse a JSON object; `None` when the document is not an object
    pub fn from_json_str(json: &str) -> Option<Self> {
        let value = serde_json::from_str::<serde_json::Value>(json)
            .map_err(|e| tracing::warn!("Invalid preferences document: {}", e))
            .ok()?;
        match RawValue::from_json(value)? {
            RawValue::Dictionary(dico) => Some(Self { dico }),
            _ => None,
        }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.dico.len()
    }

    /// Check if there are no entries
    pub fn is_empty(&self) -> bool {
        self.dico.is_empty()
    }

    /// Iterate over entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &RawValue)> {
        self.dico.iter()
    }
}

impl FromIterator<(String, RawValue)> for DictionaryPreferences {
    fn from_iter<I: IntoIterator<Item = (String, RawValue)>>(iter: I) -> Self {
        Self { dico: iter.into_iter().collect() }
    }
}

impl IntoIterator for DictionaryPreferences {
    type Item = (String, RawValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, RawValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.dico.into_iter()
    }
}

impl Preferences for DictionaryPreferences {
    fn get(&self, key: &str) -> Option<RawValue> {
        self.dico.get(key).cloned()
    }

    fn export(&self) -> PreferencesDictionary {
        self.dico.clone()
    }

    fn contains(&self, key: &str) -> bool {
        self.dico.contains_key(key)
    }
}

/// Mutable preferences over an in-memory dictionary
#[derive(Debug, Default)]
pub struct MutableDictionaryPreferences {
    dico: RwLock<PreferencesDictionary>,
}

impl MutableDictionaryPreferences {
    /// Create an empty dictionary
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from an initial dictionary
    pub fn with_dictionary(dico: PreferencesDictionary) -> Self {
        Self { dico: RwLock::new(dico) }
    }

    /// Replace the whole content
    pub fn replace(&self, dico: PreferencesDictionary) {
        *self.dico.write() = dico;
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.dico.read().len()
    }

    /// Check if there are no entries
    pub fn is_empty(&self) -> bool {
        self.dico.read().is_empty()
    }
}

impl FromIterator<(String, RawValue)> for MutableDictionaryPreferences {
    fn from_iter<I: IntoIterator<Item = (String, RawValue)>>(iter: I) -> Self {
        Self::with_dictionary(iter.into_iter().collect())
    }
}

impl Preferences for MutableDictionaryPreferences {
    fn get(&self, key: &str) -> Option<RawValue> {
        self.dico.read().get(key).cloned()
    }

    fn export(&self) -> PreferencesDictionary {
        self.dico.read().clone()
    }

    fn contains(&self, key: &str) -> bool {
        self.dico.read().contains_key(key)
    }

    fn as_mutable(&self) -> Option<&dyn MutablePreferences> {
        Some(self)
    }
}

impl MutablePreferences for MutableDictionaryPreferences {
    fn set(&self, key: &str, value: Option<RawValue>) {
        let mut dico = self.dico.write();
        match value {
            Some(value) => {
                dico.insert(key.to_string(), value);
            }
            None => {
                dico.remove(key);
            }
        }
    }

    fn set_all(&self, values: PreferencesDictionary) {
        self.dico.write().extend(values);
    }

    fn clear_all(&self) {
        self.dico.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::MutablePreferencesExt;

    fn sample() -> PreferencesDictionary {
        [
            ("theme".to_string(), RawValue::from("dark")),
            ("font_size".to_string(), RawValue::Integer(14)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_dictionary_reads() {
        let prefs = DictionaryPreferences::new(sample());
        assert_eq!(prefs.get("theme"), Some(RawValue::from("dark")));
        assert!(prefs.contains("font_size"));
        assert!(!prefs.contains("missing"));
        assert_eq!(prefs.len(), 2);
        assert!(prefs.as_mutable().is_none());
    }

    #[test]
    fn test_dictionary_from_json() {
        let prefs = DictionaryPreferences::from_json_str(r#"{"a": 1, "b": {"c": true}}"#).unwrap();
        assert_eq!(prefs.get("a"), Some(RawValue::Integer(1)));
        assert!(matches!(prefs.get("b"), Some(RawValue::Dictionary(_))));

        assert!(DictionaryPreferences::from_json_str("[1, 2]").is_none());
        assert!(DictionaryPreferences::from_json_str("not json").is_none());
    }

    #[test]
    fn test_snapshot_is_detached() {
        let source = MutableDictionaryPreferences::with_dictionary(sample());
        let snapshot = DictionaryPreferences::from_preferences(&source);

        source.set_value("theme", "light");
        assert_eq!(snapshot.get("theme"), Some(RawValue::from("dark")));
    }

    #[test]
    fn test_mutable_set_and_remove() {
        let prefs = MutableDictionaryPreferences::new();
        prefs.set("key", Some(RawValue::from("value")));
        assert_eq!(prefs.get("key"), Some(RawValue::from("value")));

        prefs.set("key", None);
        assert!(!prefs.contains("key"));

        prefs.set_all(sample());
        assert_eq!(prefs.len(), 2);

        prefs.clear_all();
        assert!(prefs.is_empty());
    }

    #[test]
    fn test_set_all_overwrites() {
        let prefs = MutableDictionaryPreferences::with_dictionary(sample());
        let mut update = PreferencesDictionary::new();
        update.insert("theme".to_string(), RawValue::from("light"));
        prefs.set_all(update);

        assert_eq!(prefs.get("theme"), Some(RawValue::from("light")));
        assert_eq!(prefs.get("font_size"), Some(RawValue::Integer(14)));
    }
}
