//! String-keyed persistence for addresses, drafts, tabs and history.
//!
//! [`KeyValueStore`] is the synchronous get/set/remove/iterate contract the
//! rest of the crate persists through. Two implementations are provided:
//!
//! - [`MemoryStore`]: in-process map, used by tests and as a scratch store.
//! - [`FileStore`]: a single JSON object on disk, rewritten atomically on
//!   every mutation.
//!
//! Both accept an optional byte quota. A write that would push the total
//! size of all keys and values past the quota fails with
//! [`StoreError::QuotaExceeded`] and leaves the store unchanged.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Last address typed into the address bar.
pub const ADDRESS_KEY: &str = "address";

/// Last content of the outgoing message editor.
pub const INPUT_KEY: &str = "input";

/// Comma-joined list of tab ids known to have persisted content.
pub const SAVED_TABS_KEY: &str = "saved_tabs";

/// Prefix for the persisted content of a user tab.
pub const TAB_CONTENT_PREFIX: &str = "extra_storage_";

/// Prefix for entries of the received-message history.
pub const SAVED_MESSAGE_PREFIX: &str = "saved_message:";

/// Errors that can occur while reading or writing a store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The write would exceed the configured byte quota.
    #[error("storage quota exceeded: {needed} bytes needed, {quota} allowed")]
    QuotaExceeded {
        /// Total size the store would have after the write.
        needed: usize,
        /// Configured maximum.
        quota: usize,
    },

    /// The backing file could not be read or written.
    #[error("storage I/O error on {path}: {source}")]
    Io {
        /// File that was being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The backing file exists but does not hold a JSON object of strings.
    #[error("storage file {path} is corrupt: {source}")]
    Corrupt {
        /// File that failed to parse.
        path: PathBuf,
        /// Underlying parse error.
        source: serde_json::Error,
    },
}

/// Synchronous string-keyed key/value store.
pub trait KeyValueStore {
    /// Return the value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the value cannot be persisted.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the removal cannot be persisted.
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;

    /// All keys currently in the store, in ascending order.
    fn keys(&self) -> Vec<String>;

    /// Whether `key` has a value.
    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

/// Size in bytes of all keys and values, as counted against the quota.
fn total_size(entries: &BTreeMap<String, String>) -> usize {
    entries.iter().map(|(k, v)| k.len() + v.len()).sum()
}

/// Size the store would have after replacing `key` with `value`.
fn size_after_set(entries: &BTreeMap<String, String>, key: &str, value: &str) -> usize {
    let current = total_size(entries);
    let replaced = entries.get(key).map_or(0, |old| key.len() + old.len());
    current - replaced + key.len() + value.len()
}

fn check_quota(quota: Option<usize>, needed: usize) -> Result<(), StoreError> {
    match quota {
        Some(quota) if needed > quota => Err(StoreError::QuotaExceeded { needed, quota }),
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-memory store. Nothing survives the process.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
    quota: Option<usize>,
}

impl MemoryStore {
    /// Create an empty store without a quota.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store that rejects writes beyond `quota` bytes.
    #[must_use]
    pub const fn with_quota(quota: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            quota: Some(quota),
        }
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        check_quota(self.quota, size_after_set(&self.entries, key, value))?;
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

// ---------------------------------------------------------------------------
// FileStore
// ---------------------------------------------------------------------------

/// Store backed by a JSON file.
///
/// The whole map is held in memory and written back after each mutation
/// through a sibling temporary file followed by a rename, so a crash never
/// leaves a half-written file behind. If the write fails the in-memory map
/// is rolled back to its previous state.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
    quota: Option<usize>,
}

impl FileStore {
    /// Open the store at `path`, creating parent directories as needed.
    ///
    /// A missing file is treated as an empty store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the file or its directory cannot be
    /// accessed, or [`StoreError::Corrupt`] if the file is not a JSON
    /// object of strings.
    pub fn open(path: impl Into<PathBuf>, quota: Option<usize>) -> Result<Self, StoreError> {
        let path = path.into();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let entries = match std::fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => BTreeMap::new(),
            Ok(contents) => {
                serde_json::from_str(&contents).map_err(|source| StoreError::Corrupt {
                    path: path.clone(),
                    source,
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        tracing::debug!(path = %path.display(), entries = entries.len(), "opened file store");

        Ok(Self {
            path,
            entries,
            quota,
        })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(&self.entries).map_err(|source| {
            StoreError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        std::fs::write(&tmp, json).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        check_quota(self.quota, size_after_set(&self.entries, key, value))?;

        let previous = self.entries.insert(key.to_string(), value.to_string());
        if let Err(e) = self.flush() {
            match previous {
                Some(old) => self.entries.insert(key.to_string(), old),
                None => self.entries.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        let Some(previous) = self.entries.remove(key) else {
            return Ok(());
        };
        if let Err(e) = self.flush() {
            self.entries.insert(key.to_string(), previous);
            return Err(e);
        }
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}
