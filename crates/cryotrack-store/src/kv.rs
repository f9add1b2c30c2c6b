//! Key-value persistence abstraction
//!
//! All durable state (inventory records, the sync queue, the checked-out
//! holding area) goes through [`KeyValueStore`]: a small string-keyed
//! store with JSON-encoded values. Two implementations are provided:
//! - [`MemoryStore`] for tests and ephemeral sessions
//! - [`JsonFileStore`] persisting one file per key under a directory
//!
//! A missing key reads as `None`; it is never an error.

use std::path::PathBuf;

use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{StoreError, StoreResult};

/// String-keyed store for raw JSON values
pub trait KeyValueStore: Send + Sync {
    /// Read the raw value at `key`, `None` when absent
    fn get_raw(&self, key: &str) -> StoreResult<Option<String>>;

    /// Write the raw value at `key`, replacing any existing value
    fn put_raw(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Remove `key`; removing an absent key is a no-op
    fn delete(&self, key: &str) -> StoreResult<()>;

    /// All keys currently present, in unspecified order
    fn keys(&self) -> StoreResult<Vec<String>>;
}

/// Read and decode the value at `key`
///
/// # Errors
/// Returns [`StoreError::Corrupt`] when the stored value does not decode.
pub fn get_typed<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> StoreResult<Option<T>> {
    match store.get_raw(key)? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StoreError::Corrupt {
                key: key.to_string(),
                source,
            }),
        None => Ok(None),
    }
}

/// Encode and write `value` at `key`
///
/// # Errors
/// Returns [`StoreError::Encode`] when the value does not serialize.
pub fn put_typed<T: Serialize>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> StoreResult<()> {
    let raw = serde_json::to_string(value).map_err(|source| StoreError::Encode {
        key: key.to_string(),
        source,
    })?;
    store.put_raw(key, &raw)
}

/// In-memory store backed by a concurrent map
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_raw(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.entries.get(key).map(|v| v.clone()))
    }

    fn put_raw(&self, key: &str, value: &str) -> StoreResult<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        Ok(self.entries.iter().map(|e| e.key().clone()).collect())
    }
}

/// File-backed store persisting one JSON file per key
///
/// Keys map to `<dir>/<escaped-key>.json`. Writes go through a temp file
/// and rename so a crash never leaves a half-written record.
#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Open a store rooted at `dir`, creating the directory if needed
    ///
    /// # Errors
    /// Returns an error when the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", escape_key(key)))
    }
}

// Keys may contain container ids and similar tokens; escape anything
// that is not filename-safe so keys round-trip through the filesystem.
fn escape_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c.to_string()
            } else {
                format!("%{:02X}", c as u32)
            }
        })
        .collect()
}

fn unescape_key(escaped: &str) -> String {
    let mut out = String::with_capacity(escaped.len());
    let mut chars = escaped.chars();
    while let Some(c) = chars.next() {
        if c == '%' {
            let hi = chars.next();
            let lo = chars.next();
            if let (Some(hi), Some(lo)) = (hi, lo) {
                if let Ok(code) = u32::from_str_radix(&format!("{hi}{lo}"), 16) {
                    if let Some(decoded) = char::from_u32(code) {
                        out.push(decoded);
                        continue;
                    }
                }
                out.push(c);
                out.push(hi);
                out.push(lo);
                continue;
            }
            out.push(c);
        } else {
            out.push(c);
        }
    }
    out
}

impl KeyValueStore for JsonFileStore {
    fn get_raw(&self, key: &str) -> StoreResult<Option<String>> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put_raw(&self, key: &str, value: &str) -> StoreResult<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        tracing::trace!(key, bytes = value.len(), "persisted record");
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        let mut keys = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(std::ffi::OsStr::to_str) {
                keys.push(unescape_key(stem));
            }
        }
        Ok(keys)
    }
}
