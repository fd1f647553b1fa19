//! Binary object storage seam.

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::MediaError;

/// Stores binary objects by path.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Uploads `bytes` to `path` and returns a download URL.
    async fn put(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<String, MediaError>;

    async fn delete(&self, path: &str) -> Result<(), MediaError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub metadata: BTreeMap<String, String>,
}

/// In-process object store. Paths can be made to fail on delete.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<String, StoredObject>>,
    failing_deletes: Mutex<HashSet<String>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, path: &str) -> Option<StoredObject> {
        self.objects.lock().await.get(path).cloned()
    }

    pub async fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.objects.lock().await.keys().cloned().collect();
        paths.sort();
        paths
    }

    pub async fn fail_delete(&self, path: impl Into<String>) {
        self.failing_deletes.lock().await.insert(path.into());
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<String, MediaError> {
        self.objects.lock().await.insert(
            path.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
                metadata: metadata.clone(),
            },
        );
        Ok(format!("memory://{}", path))
    }

    async fn delete(&self, path: &str) -> Result<(), MediaError> {
        if self.failing_deletes.lock().await.contains(path) {
            return Err(MediaError::Storage(format!("cannot delete {}", path)));
        }
        match self.objects.lock().await.remove(path) {
            Some(_) => Ok(()),
            None => Err(MediaError::Storage(format!("object not found: {}", path))),
        }
    }
}
