//! Durable key-value side channel for small pieces of UI state.

use crate::error::{Result, RunlensError};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the default on-disk store inside the config directory.
pub const STATE_FILENAME: &str = "state.json";

/// String-keyed, string-valued storage.
pub trait KeyValueStore: fmt::Debug {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// In-process store. Contents are lost when dropped.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Store backed by one JSON object file.
///
/// The file is read once when opened and rewritten in full on every `set`.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FileStore {
    /// Open the store at `path`. A missing file opens an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = if path.exists() {
            let content = fs::read_to_string(&path)?;
            serde_json::from_str(&content).map_err(|e| {
                RunlensError::Store(format!("Failed to parse state file at {:?}: {}", path, e))
            })?
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, values })
    }

    /// Open the default store in the runlens config directory.
    pub fn open_default() -> Result<Self> {
        Self::open(crate::config::config_dir()?.join(STATE_FILENAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&self.values)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_file_store_persists_across_opens() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("sub").join("state.json");

        let mut store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("panel_width").unwrap(), None);
        store.set("panel_width", "320").unwrap();
        store.set("panel_collapsed", "true").unwrap();

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("panel_width").unwrap().as_deref(), Some("320"));
        assert_eq!(reopened.get("panel_collapsed").unwrap().as_deref(), Some("true"));
        assert_eq!(reopened.path(), path.as_path());
    }

    #[test]
    fn test_file_store_rejects_malformed_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("state.json");
        fs::write(&path, "[1, 2").unwrap();
        assert!(matches!(FileStore::open(&path), Err(RunlensError::Store(_))));
    }
}
