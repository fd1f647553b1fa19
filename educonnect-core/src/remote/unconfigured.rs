//! Stand-in backend for a process without project settings.

use async_trait::async_trait;
use serde_json::Value;

use super::{ConnectionSettings, FilterOp, InitError, PersistenceError, RemoteError, RemoteStore};
use crate::collection::CollectionName;
use crate::document::{DocId, Document};

/// A backend that never connects.
///
/// `connect` reports [`InitError::NotConfigured`], so the readiness gate
/// resolves as failed and every write falls back to the local mirror.
#[derive(Debug, Clone)]
pub struct UnconfiguredRemote {
    reason: String,
}

impl UnconfiguredRemote {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl RemoteStore for UnconfiguredRemote {
    async fn connect(&self, _settings: &ConnectionSettings) -> Result<(), InitError> {
        Err(InitError::NotConfigured(self.reason.clone()))
    }

    async fn enable_persistence(&self) -> Result<(), PersistenceError> {
        Err(PersistenceError::Unimplemented)
    }

    async fn add(
        &self,
        _collection: CollectionName,
        _doc: &Document,
    ) -> Result<DocId, RemoteError> {
        Err(RemoteError::NotConnected)
    }

    async fn get_all(&self, _collection: CollectionName) -> Result<Vec<Document>, RemoteError> {
        Err(RemoteError::NotConnected)
    }

    async fn get_where(
        &self,
        _collection: CollectionName,
        _field: &str,
        _op: FilterOp,
        _value: &Value,
    ) -> Result<Vec<Document>, RemoteError> {
        Err(RemoteError::NotConnected)
    }

    async fn update(
        &self,
        _collection: CollectionName,
        _doc_id: &DocId,
        _doc: &Document,
    ) -> Result<(), RemoteError> {
        Err(RemoteError::NotConnected)
    }

    async fn delete(
        &self,
        _collection: CollectionName,
        _doc_id: &DocId,
    ) -> Result<(), RemoteError> {
        Err(RemoteError::NotConnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_reports_not_configured() {
        let remote = UnconfiguredRemote::new("project_id missing");
        assert_eq!(
            remote.connect(&ConnectionSettings::default()).await,
            Err(InitError::NotConfigured("project_id missing".to_string()))
        );
        assert_eq!(
            remote.get_all(CollectionName::Posts).await,
            Err(RemoteError::NotConnected)
        );
    }
}
