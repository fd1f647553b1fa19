//! Connection lifecycle and collection-scoped operations.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::task::JoinHandle;

use super::{
    ConnectionSettings, FilterOp, InitError, PersistenceError, RemoteError, RemoteStore,
};
use crate::collection::CollectionName;
use crate::document::{DocId, Document};
use crate::readiness::{ReadinessGate, ReadinessState};

/// Owns a remote backend and resolves the readiness gate when the
/// connection comes up (or fails to).
#[derive(Clone)]
pub struct RemoteHandle {
    store: Arc<dyn RemoteStore>,
    gate: Arc<ReadinessGate>,
}

impl std::fmt::Debug for RemoteHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteHandle")
            .field("state", &self.gate.state())
            .finish()
    }
}

impl RemoteHandle {
    pub fn new(store: Arc<dyn RemoteStore>, gate: Arc<ReadinessGate>) -> Self {
        Self { store, gate }
    }

    pub fn gate(&self) -> &Arc<ReadinessGate> {
        &self.gate
    }

    /// Connects, then tries to enable offline persistence.
    ///
    /// Persistence problems only produce warnings. A connection failure
    /// resolves the gate as failed and is returned. Calling this again
    /// after a successful initialization does nothing.
    pub async fn initialize(&self) -> Result<(), InitError> {
        match self.gate.state() {
            ReadinessState::Ready => return Ok(()),
            ReadinessState::Failed => {
                return Err(InitError::Connection(
                    "initialization already failed".to_string(),
                ))
            }
            ReadinessState::NotStarted => {}
        }

        tracing::info!("Initializing remote store");

        if let Err(e) = self.store.connect(&ConnectionSettings::default()).await {
            tracing::error!("Failed to initialize remote store: {}", e);
            self.gate.mark_failed();
            return Err(e);
        }

        match self.store.enable_persistence().await {
            Ok(()) => tracing::info!("Offline persistence enabled"),
            Err(PersistenceError::FailedPrecondition) => {
                tracing::warn!("Offline persistence unavailable (another instance holds it)")
            }
            Err(PersistenceError::Unimplemented) => {
                tracing::warn!("Offline persistence not supported on this platform")
            }
            Err(e) => tracing::warn!("Offline persistence not enabled: {}", e),
        }

        self.gate.mark_ready();
        tracing::info!("Remote store ready");
        Ok(())
    }

    pub async fn add_document(
        &self,
        collection: CollectionName,
        doc: &Document,
    ) -> Result<DocId, RemoteError> {
        match self.store.add(collection, &doc.without_doc_id()).await {
            Ok(doc_id) => {
                tracing::debug!("Added document to {}: {}", collection, doc_id);
                Ok(doc_id)
            }
            Err(e) => {
                tracing::error!("Failed to add document to {}: {}", collection, e);
                Err(e)
            }
        }
    }

    pub async fn get_all_documents(
        &self,
        collection: CollectionName,
    ) -> Result<Vec<Document>, RemoteError> {
        match self.store.get_all(collection).await {
            Ok(docs) => {
                tracing::debug!("Fetched {} documents from {}", docs.len(), collection);
                Ok(docs)
            }
            Err(e) => {
                tracing::error!("Failed to fetch documents from {}: {}", collection, e);
                Err(e)
            }
        }
    }

    pub async fn get_documents_where(
        &self,
        collection: CollectionName,
        field: &str,
        op: FilterOp,
        value: &Value,
    ) -> Result<Vec<Document>, RemoteError> {
        match self.store.get_where(collection, field, op, value).await {
            Ok(docs) => {
                tracing::debug!(
                    "Fetched {} documents from {} where {} {} {}",
                    docs.len(),
                    collection,
                    field,
                    op,
                    value
                );
                Ok(docs)
            }
            Err(e) => {
                tracing::error!("Failed to filter documents in {}: {}", collection, e);
                Err(e)
            }
        }
    }

    pub async fn update_document(
        &self,
        collection: CollectionName,
        doc_id: &DocId,
        doc: &Document,
    ) -> Result<(), RemoteError> {
        match self
            .store
            .update(collection, doc_id, &doc.without_doc_id())
            .await
        {
            Ok(()) => {
                tracing::debug!("Updated document {} in {}", doc_id, collection);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to update document in {}: {}", collection, e);
                Err(e)
            }
        }
    }

    pub async fn delete_document(
        &self,
        collection: CollectionName,
        doc_id: &DocId,
    ) -> Result<(), RemoteError> {
        match self.store.delete(collection, doc_id).await {
            Ok(()) => {
                tracing::debug!("Deleted document {} from {}", doc_id, collection);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to delete document from {}: {}", collection, e);
                Err(e)
            }
        }
    }

    /// Delivers full snapshots of `collection` to `on_change`: one right
    /// away, then one whenever the contents change (checked every
    /// `interval`).
    ///
    /// The first error goes to `on_error` and ends the subscription; it is
    /// not restarted. Cancelling or dropping the returned [`Subscription`]
    /// stops delivery.
    pub fn subscribe<F, E>(
        &self,
        collection: CollectionName,
        interval: Duration,
        mut on_change: F,
        on_error: E,
    ) -> Subscription
    where
        F: FnMut(Vec<Document>) + Send + 'static,
        E: FnOnce(RemoteError) + Send + 'static,
    {
        let store = Arc::clone(&self.store);

        let task = tokio::spawn(async move {
            let mut last: Option<Vec<Document>> = None;
            loop {
                match store.get_all(collection).await {
                    Ok(docs) => {
                        if last.as_ref() != Some(&docs) {
                            on_change(docs.clone());
                            last = Some(docs);
                        }
                    }
                    Err(e) => {
                        tracing::error!("Subscription to {} failed: {}", collection, e);
                        on_error(e);
                        return;
                    }
                }
                tokio::time::sleep(interval).await;
            }
        });

        Subscription {
            collection,
            task,
            cancelled: false,
        }
    }
}

/// A live collection listener. Dropping it cancels the listener.
#[derive(Debug)]
pub struct Subscription {
    collection: CollectionName,
    task: JoinHandle<()>,
    cancelled: bool,
}

impl Subscription {
    pub fn collection(&self) -> CollectionName {
        self.collection
    }

    /// Returns true once the listener task has stopped (after an error or
    /// once a cancellation has taken effect).
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn cancel(&mut self) {
        if !self.cancelled {
            self.cancelled = true;
            self.task.abort();
            tracing::debug!("Cancelled subscription to {}", self.collection);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemoryRemote;
    use serde_json::json;
    use std::sync::Mutex;

    fn doc(value: Value) -> Document {
        Document::from_value(value).unwrap()
    }

    fn handle_with(remote: Arc<MemoryRemote>) -> RemoteHandle {
        RemoteHandle::new(remote, Arc::new(ReadinessGate::new()))
    }

    #[tokio::test]
    async fn test_initialize_marks_ready() {
        let handle = handle_with(Arc::new(MemoryRemote::new()));
        handle.initialize().await.unwrap();
        assert!(handle.gate().is_ready());

        // second call is a no-op
        handle.initialize().await.unwrap();
        assert!(handle.gate().is_ready());
    }

    #[tokio::test]
    async fn test_persistence_failures_are_not_fatal() {
        for error in [
            PersistenceError::FailedPrecondition,
            PersistenceError::Unimplemented,
            PersistenceError::Other("disk full".to_string()),
        ] {
            let remote = Arc::new(MemoryRemote::new());
            remote.fail_persistence(error).await;
            let handle = handle_with(remote);

            handle.initialize().await.unwrap();
            assert!(handle.gate().is_ready());
        }
    }

    #[tokio::test]
    async fn test_connect_failure_marks_failed() {
        let remote = Arc::new(MemoryRemote::new());
        remote.fail_connect("no network").await;
        let handle = handle_with(remote);

        let result = handle.initialize().await;
        assert!(matches!(result, Err(InitError::Connection(_))));
        assert_eq!(handle.gate().state(), ReadinessState::Failed);
    }

    #[tokio::test]
    async fn test_writes_strip_doc_id() {
        let remote = Arc::new(MemoryRemote::new());
        let handle = handle_with(Arc::clone(&remote));
        handle.initialize().await.unwrap();

        let stale = doc(json!({"docId": "stale", "id": 1}));
        let doc_id = handle
            .add_document(CollectionName::Posts, &stale)
            .await
            .unwrap();

        let stored = remote.documents(CollectionName::Posts).await;
        assert_eq!(stored[0].doc_id, Some(doc_id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscription_delivers_initial_and_changed_snapshots() {
        let remote = Arc::new(MemoryRemote::new());
        let handle = handle_with(Arc::clone(&remote));
        handle.initialize().await.unwrap();

        let seen: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut subscription = handle.subscribe(
            CollectionName::Posts,
            Duration::from_millis(100),
            move |docs| sink.lock().unwrap().push(docs.len()),
            |_| {},
        );

        tokio::time::sleep(Duration::from_millis(350)).await;
        remote
            .add(CollectionName::Posts, &doc(json!({"id": 1})))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(350)).await;

        assert_eq!(*seen.lock().unwrap(), vec![0, 1]);

        assert!(!subscription.is_finished());
        subscription.cancel();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(subscription.is_finished());

        remote
            .add(CollectionName::Posts, &doc(json!({"id": 2})))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(*seen.lock().unwrap(), vec![0, 1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscription_ends_on_error() {
        let remote = Arc::new(MemoryRemote::new());
        let handle = handle_with(Arc::clone(&remote));
        handle.initialize().await.unwrap();
        remote.set_unavailable(true).await;

        let errors = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&errors);
        let subscription = handle.subscribe(
            CollectionName::Teachers,
            Duration::from_millis(100),
            |_| {},
            move |_| *sink.lock().unwrap() += 1,
        );

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(*errors.lock().unwrap(), 1);
        assert!(subscription.is_finished());
    }
}
