//! Storage adapter interface: `save(key, bytes)` / `load(key) → bytes?`. The
//! adapter is the sole owner of persisted bytes under a given key; the
//! engine never reaches past it to touch storage directly.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::PersistError;

pub trait StorageAdapter: Send + Sync {
    fn save(&self, key: &str, bytes: &[u8]) -> Result<(), PersistError>;
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, PersistError>;
}

/// Keyed blob store backed by the filesystem, one file per key under a root
/// directory. This is the default adapter outside of tests.
pub struct FileStorageAdapter {
    root: PathBuf,
}

impl FileStorageAdapter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let safe = key.replace(['/', '\\', ':'], "_");
        self.root.join(format!("{safe}.json"))
    }
}

impl StorageAdapter for FileStorageAdapter {
    fn save(&self, key: &str, bytes: &[u8]) -> Result<(), PersistError> {
        std::fs::create_dir_all(&self.root).map_err(|e| PersistError::Adapter(e.to_string()))?;
        let path = self.path_for(key);
        std::fs::write(&path, bytes).map_err(|e| PersistError::Adapter(e.to_string()))?;
        tracing::debug!(target: "persist", key, bytes = bytes.len(), "saved");
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, PersistError> {
        let path = self.path_for(key);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PersistError::Adapter(e.to_string())),
        }
    }
}

/// In-memory adapter used by tests and ephemeral sessions.
#[derive(Default)]
pub struct InMemoryStorageAdapter {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryStorageAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageAdapter for InMemoryStorageAdapter {
    fn save(&self, key: &str, bytes: &[u8]) -> Result<(), PersistError> {
        self.blobs
            .lock()
            .map_err(|_| PersistError::Adapter("poisoned in-memory store".to_string()))?
            .insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, PersistError> {
        let blobs = self
            .blobs
            .lock()
            .map_err(|_| PersistError::Adapter("poisoned in-memory store".to_string()))?;
        Ok(blobs.get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_adapter_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = FileStorageAdapter::new(dir.path());
        adapter.save("phototis:editor", b"hello").unwrap();
        let loaded = adapter.load("phototis:editor").unwrap();
        assert_eq!(loaded, Some(b"hello".to_vec()));
    }

    #[test]
    fn missing_key_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = FileStorageAdapter::new(dir.path());
        assert_eq!(adapter.load("missing").unwrap(), None);
    }

    #[test]
    fn in_memory_adapter_round_trips() {
        let adapter = InMemoryStorageAdapter::new();
        adapter.save("k", b"v").unwrap();
        assert_eq!(adapter.load("k").unwrap(), Some(b"v".to_vec()));
    }
}
