//! Durable key-value storage.
//!
//! Sessions and history go through the [`KeyValueStore`] port so the engine
//! never touches a concrete backend. [`MemoryStore`] backs tests and embedded
//! use; [`FileStore`] keeps one file per key in a directory. Both can enforce
//! a byte quota, which is how a full store shows up to callers.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

/// Errors from storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage quota exceeded: {needed} bytes needed, {available} available")]
    QuotaExceeded { needed: usize, available: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A synchronous string key-value store.
pub trait KeyValueStore: Send + Sync {
    /// Read the value for `key`, or `None` if it was never written.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

fn check_quota(quota: Option<usize>, used: usize, needed: usize) -> Result<(), StorageError> {
    match quota {
        Some(limit) if used + needed > limit => Err(StorageError::QuotaExceeded {
            needed,
            available: limit.saturating_sub(used),
        }),
        _ => Ok(()),
    }
}

/// In-memory store with an optional total byte quota.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit the total size of keys plus values to `bytes`.
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            quota: Some(bytes),
        }
    }

    /// Total bytes currently used by keys and values.
    pub fn used_bytes(&self) -> usize {
        self.lock().iter().map(|(k, v)| k.len() + v.len()).sum()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.lock();
        let used: usize = entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum();
        check_quota(self.quota, used, key.len() + value.len())?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.lock().remove(key);
        Ok(())
    }
}

/// Longest url-encoded key used verbatim as a file name.
const MAX_ENCODED_KEY: usize = 200;

/// How much of a long encoded key is kept in front of its digest.
const LONG_KEY_PREFIX: usize = 64;

/// File name holding `key`.
///
/// Short keys map to `<url-encoded key>.json`. Longer keys keep a readable
/// prefix followed by `%%` and the SHA-256 of the full key, which keeps the
/// name well under common 255-byte limits. Url-encoding never emits `%%`,
/// so the two forms cannot collide.
fn file_name_for(key: &str) -> String {
    let encoded = urlencoding::encode(key);
    if encoded.len() <= MAX_ENCODED_KEY {
        return format!("{encoded}.json");
    }

    // Encoded output is ASCII; only avoid splitting a `%XX` escape.
    let mut cut = LONG_KEY_PREFIX;
    if let Some(pos) = encoded[..cut].rfind('%') {
        if pos + 3 > cut {
            cut = pos;
        }
    }

    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    format!("{}%%{:x}.json", &encoded[..cut], hasher.finalize())
}

/// Directory-backed store: one `<url-encoded key>.json` file per key.
///
/// Keys too long for a file name are shortened with a digest.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    quota: Option<usize>,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, quota: None })
    }

    /// Limit the total size of all stored values to `bytes`.
    pub fn with_quota(mut self, bytes: usize) -> Self {
        self.quota = Some(bytes);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(file_name_for(key))
    }

    fn used_bytes_excluding(&self, exclude: &Path) -> Result<usize, StorageError> {
        let mut used = 0;
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path == exclude || path.extension().map(|e| e != "json").unwrap_or(true) {
                continue;
            }
            used += entry.metadata()?.len() as usize;
        }
        Ok(used)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        if self.quota.is_some() {
            let used = self.used_bytes_excluding(&path)?;
            check_quota(self.quota, used, value.len())?;
        }

        // Write-then-rename so a crash never leaves a half-written record.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
