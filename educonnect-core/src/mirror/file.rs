//! File-backed key-value store. One file per key inside a data directory.
//!
//! Writes go to `<key>.json.tmp` and are renamed into place.

use std::fs;
use std::io;
use std::path::PathBuf;

use super::{KeyValueStore, MirrorError};

const EXTENSION: &str = "json";

#[derive(Clone, Debug)]
pub struct FileKeyValueStore {
    data_dir: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn data_dir(&self) -> &PathBuf {
        &self.data_dir
    }

    /// Returns the file path for `key`. Keys must be plain names.
    pub fn path(&self, key: &str) -> Result<PathBuf, MirrorError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(MirrorError::InvalidKey(key.to_string()));
        }
        Ok(self.data_dir.join(format!("{}.{}", key, EXTENSION)))
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, MirrorError> {
        let path = self.path(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(MirrorError::Io(path, e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), MirrorError> {
        let path = self.path(key)?;
        fs::create_dir_all(&self.data_dir)
            .map_err(|e| MirrorError::Io(self.data_dir.clone(), e))?;

        let tmp = path.with_extension(format!("{}.tmp", EXTENSION));
        fs::write(&tmp, value).map_err(|e| MirrorError::Io(tmp.clone(), e))?;
        fs::rename(&tmp, &path).map_err(|e| MirrorError::Io(path, e))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), MirrorError> {
        let path = self.path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(MirrorError::Io(path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (FileKeyValueStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = FileKeyValueStore::new(temp_dir.path().to_path_buf());
        (store, temp_dir)
    }

    #[test]
    fn test_get_missing_returns_none() {
        let (store, _temp) = test_store();
        assert_eq!(store.get("eduConnectData").unwrap(), None);
    }

    #[test]
    fn test_set_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("nested").join("data");
        let store = FileKeyValueStore::new(nested.clone());

        store.set("eduConnectData", "{}").unwrap();

        assert!(nested.join("eduConnectData.json").exists());
        assert!(!nested.join("eduConnectData.json.tmp").exists());
    }

    #[test]
    fn test_set_overwrites() {
        let (store, _temp) = test_store();
        store.set("k", "one").unwrap();
        store.set("k", "two").unwrap();
        assert_eq!(store.get("k").unwrap(), Some("two".to_string()));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let (store, _temp) = test_store();
        store.set("k", "v").unwrap();
        store.remove("k").unwrap();
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn test_rejects_path_like_keys() {
        let (store, _temp) = test_store();
        assert!(matches!(
            store.set("../escape", "x"),
            Err(MirrorError::InvalidKey(_))
        ));
        assert!(matches!(store.get(""), Err(MirrorError::InvalidKey(_))));
    }
}
