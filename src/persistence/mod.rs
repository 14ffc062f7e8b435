//! Key/value persistence
//!
//! Backends:
//! - `MemoryStorage`: tests and headless runs
//! - `FileStorage`: native, one JSON file per key
//! - `LocalStorage`: browser LocalStorage (wasm32 only)

use std::collections::HashMap;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend unavailable")]
    Unavailable,
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored value is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("storage rejected write for key {0}")]
    WriteRejected(String),
}

/// String key/value store, LocalStorage-shaped
pub trait Storage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove_item(&mut self, key: &str) -> Result<(), StorageError>;
}

/// Read and decode a JSON value; `Ok(None)` when the key is absent
pub fn load_json<T: DeserializeOwned>(storage: &dyn Storage, key: &str) -> Result<Option<T>, StorageError> {
    match storage.get_item(key)? {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

/// Encode and write a JSON value
pub fn save_json<T: Serialize>(storage: &mut dyn Storage, key: &str, value: &T) -> Result<(), StorageError> {
    let json = serde_json::to_string(value)?;
    storage.set_item(key, &json)
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    items: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<(), StorageError> {
        self.items.remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per key under a directory
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: std::path::PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl FileStorage {
    pub fn new(dir: impl Into<std::path::PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path(&self, key: &str) -> std::path::PathBuf {
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.path(key)) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        // Write-then-rename so a crash never leaves half a file behind
        let path = self.path(key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Browser LocalStorage
#[cfg(target_arch = "wasm32")]
pub struct LocalStorage {
    inner: web_sys::Storage,
}

#[cfg(target_arch = "wasm32")]
impl LocalStorage {
    /// `None` when storage is disabled (private mode, sandboxed iframe)
    pub fn open() -> Option<Self> {
        let inner = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten()?;
        Some(Self { inner })
    }
}

#[cfg(target_arch = "wasm32")]
impl Storage for LocalStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get_item(key).map_err(|_| StorageError::Unavailable)
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.inner
            .set_item(key, value)
            .map_err(|_| StorageError::WriteRejected(key.to_string()))
    }

    fn remove_item(&mut self, key: &str) -> Result<(), StorageError> {
        self.inner.remove_item(key).map_err(|_| StorageError::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        a: u32,
        b: String,
    }

    #[test]
    fn test_memory_round_trip_and_missing_key() {
        let mut storage = MemoryStorage::new();
        assert!(load_json::<Sample>(&storage, "k").unwrap().is_none());
        let value = Sample { a: 3, b: "x".into() };
        save_json(&mut storage, "k", &value).unwrap();
        assert_eq!(load_json::<Sample>(&storage, "k").unwrap(), Some(value));
        storage.remove_item("k").unwrap();
        assert!(storage.get_item("k").unwrap().is_none());
    }

    #[test]
    fn test_corrupt_value_is_an_error() {
        let mut storage = MemoryStorage::new();
        storage.set_item("k", "{oops").unwrap();
        assert!(matches!(
            load_json::<Sample>(&storage, "k"),
            Err(StorageError::Serialization(_))
        ));
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_file_storage() {
        let dir = std::env::temp_dir().join(format!("mc-storage-test-{}", std::process::id()));
        let mut storage = FileStorage::new(&dir).unwrap();
        assert!(storage.get_item("high/scores").unwrap().is_none());
        storage.set_item("high/scores", "[1,2]").unwrap();
        assert_eq!(storage.get_item("high/scores").unwrap().as_deref(), Some("[1,2]"));
        storage.remove_item("high/scores").unwrap();
        storage.remove_item("high/scores").unwrap();
        assert!(storage.get_item("high/scores").unwrap().is_none());
        let _ = std::fs::remove_dir_all(dir);
    }
}
