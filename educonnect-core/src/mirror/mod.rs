//! Local mirror of the application state.
//!
//! The whole [`ApplicationState`] is serialized as JSON under a single key
//! of a [`KeyValueStore`], overwriting the previous snapshot. A second key
//! holds the payload as it was before migrating it to the remote store.
//!
//! ```text
//! eduConnectData         -> {"institutions":[...],"teachers":[...],...}
//! eduConnectData_backup  -> pre-migration copy of eduConnectData
//! ```

mod file;
mod memory;

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::document::ApplicationState;

pub use file::FileKeyValueStore;
pub use memory::MemoryKeyValueStore;

/// Key of the live mirror.
pub const MIRROR_KEY: &str = "eduConnectData";
/// Key of the pre-migration backup.
pub const BACKUP_KEY: &str = "eduConnectData_backup";

#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("I/O error for {}: {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Invalid key '{0}'")]
    InvalidKey(String),

    #[error("Failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Persistent string key-value storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, MirrorError>;
    fn set(&self, key: &str, value: &str) -> Result<(), MirrorError>;
    fn remove(&self, key: &str) -> Result<(), MirrorError>;
}

#[derive(Clone)]
pub struct LocalMirror {
    store: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for LocalMirror {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalMirror").finish_non_exhaustive()
    }
}

impl LocalMirror {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Mirror backed by files under `data_dir`.
    pub fn in_dir(data_dir: PathBuf) -> Self {
        Self::new(Arc::new(FileKeyValueStore::new(data_dir)))
    }

    /// Mirror that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryKeyValueStore::new()))
    }

    /// Overwrites the stored snapshot with `state`.
    pub fn snapshot(&self, state: &ApplicationState) -> Result<(), MirrorError> {
        let payload = serde_json::to_string(state)?;
        self.store.set(MIRROR_KEY, &payload)
    }

    /// Loads the stored snapshot.
    ///
    /// Returns `None` when nothing is stored, when the store cannot be read,
    /// or when the payload is corrupt. Never fails.
    pub fn restore(&self) -> Option<ApplicationState> {
        let raw = match self.raw() {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Failed to read local mirror: {}", e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(state) => Some(state),
            Err(e) => {
                tracing::warn!("Ignoring corrupt local mirror: {}", e);
                None
            }
        }
    }

    /// The stored snapshot exactly as written.
    pub fn raw(&self) -> Result<Option<String>, MirrorError> {
        self.store.get(MIRROR_KEY)
    }

    /// Stores a pre-migration copy of a raw snapshot.
    pub fn backup(&self, raw_snapshot: &str) -> Result<(), MirrorError> {
        self.store.set(BACKUP_KEY, raw_snapshot)
    }

    /// The pre-migration copy, if one was made.
    pub fn restore_backup(&self) -> Result<Option<String>, MirrorError> {
        self.store.get(BACKUP_KEY)
    }

    /// Removes the live snapshot (the backup is kept).
    pub fn clear(&self) -> Result<(), MirrorError> {
        self.store.remove(MIRROR_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::CollectionName;
    use crate::document::Document;
    use serde_json::json;

    fn sample_state() -> ApplicationState {
        let mut state = ApplicationState::default();
        state.upsert_local(
            CollectionName::Institutions,
            Document::from_value(json!({"id": 1, "name": "Colegio"})).unwrap(),
        );
        state
    }

    #[test]
    fn test_restore_empty_is_none() {
        let mirror = LocalMirror::in_memory();
        assert!(mirror.restore().is_none());
    }

    #[test]
    fn test_snapshot_overwrites_and_restores() {
        let mirror = LocalMirror::in_memory();
        mirror.snapshot(&ApplicationState::default()).unwrap();
        mirror.snapshot(&sample_state()).unwrap();

        assert_eq!(mirror.restore(), Some(sample_state()));
    }

    #[test]
    fn test_corrupt_payload_restores_none() {
        let store = Arc::new(MemoryKeyValueStore::new());
        store.set(MIRROR_KEY, "{not json").unwrap();
        let mirror = LocalMirror::new(store);

        assert!(mirror.restore().is_none());
    }

    #[test]
    fn test_wrong_shape_restores_none() {
        let store = Arc::new(MemoryKeyValueStore::new());
        store.set(MIRROR_KEY, r#"{"teachers": "nope"}"#).unwrap();
        let mirror = LocalMirror::new(store);

        assert!(mirror.restore().is_none());
    }

    #[test]
    fn test_backup_uses_distinct_key() {
        let mirror = LocalMirror::in_memory();
        mirror.snapshot(&sample_state()).unwrap();
        let raw = mirror.raw().unwrap().unwrap();

        mirror.backup(&raw).unwrap();
        mirror.clear().unwrap();

        assert!(mirror.raw().unwrap().is_none());
        assert_eq!(mirror.restore_backup().unwrap(), Some(raw));
    }
}
