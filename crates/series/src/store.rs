//! String-keyed persistent storage for the cached series.

use common::{Error, Result};
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Minimal get/set/clear store holding string values.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    /// Remove every key.
    fn clear(&self) -> Result<()>;
}

/// In-process store. Contents are lost on exit.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.entries.clear();
        Ok(())
    }
}

/// Store backed by a single JSON object file.
///
/// Every mutation rewrites the whole file through a temp file + rename, so a
/// crash leaves either the old or the new contents on disk.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| {
                Error::Storage(format!("{} is not a JSON object of strings: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        debug!("Opened store {} with {} keys", path.display(), entries.len());
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    fn update(&self, apply: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| Error::Storage("store lock poisoned".into()))?;
        apply(&mut entries);
        let raw = serde_json::to_vec_pretty(&*entries)?;
        write_atomic(&self.path, &raw)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| Error::Storage("store lock poisoned".into()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn clear(&self) -> Result<()> {
        self.update(|entries| entries.clear())
    }
}

/// Write `contents` to `path` via a sibling temp file and rename.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_set_get_clear() {
        let store = MemoryStore::new();
        assert_eq!(store.get("timestamps").unwrap(), None);

        store.set("timestamps", "[]").unwrap();
        store.set("timestamps", "[\"a\"]").unwrap();
        assert_eq!(store.get("timestamps").unwrap().as_deref(), Some("[\"a\"]"));
        assert_eq!(store.len(), 1);

        store.clear().unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("temperatures").unwrap(), None);
        store.set("temperatures", "[70.0,71.5]").unwrap();
        drop(store);

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(
            reopened.get("temperatures").unwrap().as_deref(),
            Some("[70.0,71.5]")
        );

        reopened.clear().unwrap();
        let cleared = FileStore::open(&path).unwrap();
        assert_eq!(cleared.get("temperatures").unwrap(), None);
    }

    #[test]
    fn test_file_store_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "not json").unwrap();

        assert!(matches!(FileStore::open(&path), Err(Error::Storage(_))));
    }

    #[test]
    fn test_file_store_treats_empty_file_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "").unwrap();

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("timestamps").unwrap(), None);
    }
}
