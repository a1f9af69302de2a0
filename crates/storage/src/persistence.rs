//! File-backed preferences
//!
//! This module keeps preferences in memory and persists them on demand to a
//! versioned, checksummed JSON file. Writing never happens implicitly: call
//! [`FilePreferences::write`] to save and [`FilePreferences::read`] to reload.

use prefs_core::{
    MutableDictionaryPreferences, MutablePreferences, Preferences, PreferencesDictionary, RawValue,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// File persistence error types
#[derive(Debug, Error)]
pub enum FileError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Corruption detected
    #[error("Corruption detected: {0}")]
    Corruption(String),

    /// Version mismatch
    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        /// Expected version
        expected: u32,
        /// Found version
        found: u32,
    },
}

/// Result type for file operations
pub type Result<T> = std::result::Result<T, FileError>;

/// Versioned file envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
struct VersionedState {
    /// Version number
    version: u32,
    /// Checksum for corruption detection
    checksum: String,
    /// The stored preferences
    data: PreferencesDictionary,
}

impl VersionedState {
    fn new(version: u32, data: PreferencesDictionary) -> Result<Self> {
        let checksum = checksum(&data)?;

        Ok(Self { version, checksum, data })
    }

    fn verify_checksum(&self) -> Result<()> {
        let computed = checksum(&self.data)?;

        if computed != self.checksum {
            return Err(FileError::Corruption(format!(
                "Checksum mismatch: expected {}, got {}",
                self.checksum, computed
            )));
        }

        Ok(())
    }
}

fn checksum(data: &PreferencesDictionary) -> Result<String> {
    let data_json = serde_json::to_string(data)?;
    Ok(format!("{:x}", md5::compute(&data_json)))
}

/// File preferences configuration
#[derive(Debug, Clone)]
pub struct FileConfig {
    /// Path to the preferences file
    pub path: PathBuf,
    /// Current file format version
    pub version: u32,
    /// Enable atomic writes with temp files
    pub atomic_writes: bool,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("preferences.json"),
            version: 1,
            atomic_writes: true,
        }
    }
}

impl FileConfig {
    /// Create a new configuration
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), ..Default::default() }
    }

    /// Set file format version
    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Enable or disable atomic writes
    pub fn atomic_writes(mut self, enabled: bool) -> Self {
        self.atomic_writes = enabled;
        self
    }
}

/// Preferences loaded from and saved to a file
pub struct FilePreferences {
    config: FileConfig,
    contents: MutableDictionaryPreferences,
    dirty: AtomicBool,
}

impl FilePreferences {
    /// Open the file, starting empty when it does not exist yet
    pub async fn open(config: FileConfig) -> Result<Self> {
        let prefs = Self::empty(config);
        prefs.read().await?;
        Ok(prefs)
    }

    /// Preferences bound to a file, without touching the disk
    pub fn empty(config: FileConfig) -> Self {
        Self {
            config,
            contents: MutableDictionaryPreferences::new(),
            dirty: AtomicBool::new(false),
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Whether values changed since the last read or write
    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Replace the in-memory values with the file contents
    ///
    /// A missing file yields empty preferences.
    pub async fn read(&self) -> Result<()> {
        let data = match self.load_from_disk().await {
            Ok(data) => data,
            Err(FileError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No preferences file at {}", self.config.path.display());
                PreferencesDictionary::new()
            }
            Err(e) => return Err(e),
        };

        self.contents.replace(data);
        self.dirty.store(false, Ordering::Release);
        Ok(())
    }

    /// Save the in-memory values to the file
    ///
    /// Changes made while the write is in flight keep the preferences dirty.
    pub async fn write(&self) -> Result<()> {
        self.dirty.store(false, Ordering::Release);

        let (versioned, json) = match self.encode() {
            Ok(encoded) => encoded,
            Err(e) => {
                self.dirty.store(true, Ordering::Release);
                return Err(e);
            }
        };

        let written = if self.config.atomic_writes {
            self.write_atomic(&json).await
        } else {
            fs::write(&self.config.path, json).await.map_err(FileError::from)
        };
        if let Err(e) = written {
            self.dirty.store(true, Ordering::Release);
            return Err(e);
        }

        tracing::debug!(
            "Wrote {} preferences to {}",
            versioned.data.len(),
            self.config.path.display()
        );
        Ok(())
    }

    /// Snapshot the contents as an envelope and its JSON text
    fn encode(&self) -> Result<(VersionedState, String)> {
        let versioned = VersionedState::new(self.config.version, self.contents.export())?;
        let json = serde_json::to_string_pretty(&versioned)?;
        Ok((versioned, json))
    }

    /// Remove the backing file and clear the in-memory values
    pub async fn delete(&self) -> Result<()> {
        self.contents.clear_all();

        match fs::remove_file(&self.config.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        self.dirty.store(false, Ordering::Release);
        Ok(())
    }

    /// Load preferences from disk
    async fn load_from_disk(&self) -> Result<PreferencesDictionary> {
        let contents = fs::read_to_string(&self.config.path).await?;

        let versioned: VersionedState = serde_json::from_str(&contents)?;

        // Verify checksum
        versioned.verify_checksum()?;

        // Check version
        if versioned.version != self.config.version {
            return Err(FileError::VersionMismatch {
                expected: self.config.version,
                found: versioned.version,
            });
        }

        Ok(versioned.data)
    }

    /// Write atomically using temp file + rename
    async fn write_atomic(&self, contents: &str) -> Result<()> {
        let temp_path = self.config.path.with_extension("tmp");

        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(contents.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &self.config.path).await?;

        Ok(())
    }
}

impl Preferences for FilePreferences {
    fn get(&self, key: &str) -> Option<RawValue> {
        self.contents.get(key)
    }

    fn export(&self) -> PreferencesDictionary {
        self.contents.export()
    }

    fn contains(&self, key: &str) -> bool {
        self.contents.contains(key)
    }

    fn as_mutable(&self) -> Option<&dyn MutablePreferences> {
        Some(self)
    }
}

impl MutablePreferences for FilePreferences {
    fn set(&self, key: &str, value: Option<RawValue>) {
        self.contents.set(key, value);
        self.dirty.store(true, Ordering::Release);
    }

    fn set_all(&self, values: PreferencesDictionary) {
        self.contents.set_all(values);
        self.dirty.store(true, Ordering::Release);
    }

    fn clear_all(&self) {
        self.contents.clear_all();
        self.dirty.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prefs_core::{MutablePreferencesExt, OpaqueValue, PreferencesExt};
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> FileConfig {
        FileConfig::new(dir.path().join("prefs.json"))
    }

    #[tokio::test]
    async fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = FilePreferences::open(config_in(&dir)).await.unwrap();

        assert!(prefs.export().is_empty());
        assert!(!prefs.has_unsaved_changes());
    }

    #[tokio::test]
    async fn test_write_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = FilePreferences::open(config_in(&dir)).await.unwrap();

        prefs.set_value("theme", "dark");
        prefs.set_value("font_size", 14i64);
        assert!(prefs.has_unsaved_changes());

        prefs.write().await.unwrap();
        assert!(!prefs.has_unsaved_changes());
        assert!(!dir.path().join("prefs.tmp").exists());

        let reopened = FilePreferences::open(config_in(&dir)).await.unwrap();
        assert_eq!(reopened.string("theme"), Some("dark".to_string()));
        assert_eq!(reopened.integer("font_size"), 14);
    }

    #[tokio::test]
    async fn test_set_does_not_write() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = FilePreferences::open(config_in(&dir)).await.unwrap();

        prefs.set_value("key", true);
        assert!(!prefs.path().exists());
    }

    #[tokio::test]
    async fn test_read_discards_unsaved_changes() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = FilePreferences::open(config_in(&dir)).await.unwrap();
        prefs.set_value("saved", 1i64);
        prefs.write().await.unwrap();

        prefs.set_value("unsaved", 2i64);
        prefs.read().await.unwrap();

        assert!(prefs.contains("saved"));
        assert!(!prefs.contains("unsaved"));
    }

    #[tokio::test]
    async fn test_non_atomic_write() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir).atomic_writes(false);
        let prefs = FilePreferences::open(config.clone()).await.unwrap();

        prefs.set_value("key", "value");
        prefs.write().await.unwrap();

        let reopened = FilePreferences::open(config).await.unwrap();
        assert_eq!(reopened.string("key"), Some("value".to_string()));
    }

    #[tokio::test]
    async fn test_version_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = FilePreferences::open(config_in(&dir).version(1)).await.unwrap();
        prefs.set_value("key", "value");
        prefs.write().await.unwrap();

        let result = FilePreferences::open(config_in(&dir).version(2)).await;
        assert!(matches!(result, Err(FileError::VersionMismatch { expected: 2, found: 1 })));
    }

    #[tokio::test]
    async fn test_corruption_detected() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let prefs = FilePreferences::open(config.clone()).await.unwrap();
        prefs.set_value("count", 1i64);
        prefs.write().await.unwrap();

        let contents = std::fs::read_to_string(&config.path).unwrap();
        std::fs::write(&config.path, contents.replace("1", "7")).unwrap();

        let result = FilePreferences::open(config).await;
        assert!(matches!(result, Err(FileError::Corruption(_))));
    }

    #[tokio::test]
    async fn test_opaque_value_fails_write() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = FilePreferences::open(config_in(&dir)).await.unwrap();
        prefs.set("handle", Some(RawValue::Opaque(OpaqueValue::new(1u8))));

        assert!(matches!(prefs.write().await, Err(FileError::Serialization(_))));
        assert!(prefs.has_unsaved_changes());
    }

    #[tokio::test]
    async fn test_failed_write_stays_dirty() {
        let dir = tempfile::tempdir().unwrap();
        let config = FileConfig::new(dir.path().join("missing").join("prefs.json"));
        let prefs = FilePreferences::empty(config);
        prefs.set_value("key", "value");

        assert!(matches!(prefs.write().await, Err(FileError::Io(_))));
        assert!(prefs.has_unsaved_changes());
    }

    #[tokio::test]
    async fn test_set_after_write_is_unsaved() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = FilePreferences::open(config_in(&dir)).await.unwrap();
        prefs.set_value("first", 1i64);
        prefs.write().await.unwrap();

        prefs.set_value("second", 2i64);
        assert!(prefs.has_unsaved_changes());

        let saved = FilePreferences::open(config_in(&dir)).await.unwrap();
        assert!(!saved.contains("second"));
    }

    #[tokio::test]
    async fn test_delete() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = FilePreferences::open(config_in(&dir)).await.unwrap();
        prefs.set_value("key", "value");
        prefs.write().await.unwrap();

        prefs.delete().await.unwrap();
        assert!(!prefs.path().exists());
        assert!(prefs.export().is_empty());

        // Deleting twice is fine
        prefs.delete().await.unwrap();
    }

    #[test]
    fn test_config_builder() {
        let config = FileConfig::new("/tmp/prefs.json").version(3).atomic_writes(false);

        assert_eq!(config.path, PathBuf::from("/tmp/prefs.json"));
        assert_eq!(config.version, 3);
        assert!(!config.atomic_writes);
    }
}
