//! In-process remote store.
//!
//! Keeps documents per collection in insertion order and evaluates filters
//! locally. Failures can be injected to exercise fallback paths.

use std::cmp::Ordering as CmpOrdering;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use super::{
    ConnectionSettings, FilterOp, InitError, PersistenceError, RemoteError, RemoteStore,
};
use crate::collection::CollectionName;
use crate::document::{DocId, Document};

#[derive(Debug, Default)]
struct Failures {
    connect: Option<String>,
    persistence: Option<PersistenceError>,
    all_operations: bool,
    collections: HashSet<CollectionName>,
}

#[derive(Debug, Default)]
pub struct MemoryRemote {
    documents: Mutex<HashMap<CollectionName, Vec<Document>>>,
    failures: Mutex<Failures>,
    latency: Mutex<Option<Duration>>,
    connected: AtomicBool,
    next_id: AtomicU64,
    writes: AtomicU64,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `connect` fail with the given message.
    pub async fn fail_connect(&self, message: impl Into<String>) {
        self.failures.lock().await.connect = Some(message.into());
    }

    /// Makes `enable_persistence` fail with the given error.
    pub async fn fail_persistence(&self, error: PersistenceError) {
        self.failures.lock().await.persistence = Some(error);
    }

    /// Makes every operation fail (or succeed again).
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.failures.lock().await.all_operations = unavailable;
    }

    /// Makes operations against one collection fail.
    pub async fn fail_collection(&self, collection: CollectionName) {
        self.failures.lock().await.collections.insert(collection);
    }

    /// Adds a delay before every operation completes.
    pub async fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock().await = latency;
    }

    /// Stores documents directly, bypassing connection state. Returns the
    /// assigned ids.
    pub async fn seed(&self, collection: CollectionName, docs: Vec<Document>) -> Vec<DocId> {
        let mut store = self.documents.lock().await;
        let entries = store.entry(collection).or_default();
        docs.into_iter()
            .map(|doc| {
                let doc_id = self.generate_id();
                entries.push(doc.without_doc_id().with_doc_id(doc_id.clone()));
                doc_id
            })
            .collect()
    }

    /// Snapshot of one collection, bypassing connection state.
    pub async fn documents(&self, collection: CollectionName) -> Vec<Document> {
        self.documents
            .lock()
            .await
            .get(&collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of successful add/update/delete calls.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn generate_id(&self) -> DocId {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        DocId::new(format!("mem-{:06}", n))
    }

    async fn before_operation(&self, collection: CollectionName) -> Result<(), RemoteError> {
        let latency = *self.latency.lock().await;
        if let Some(delay) = latency {
            tokio::time::sleep(delay).await;
        }

        if !self.connected.load(Ordering::SeqCst) {
            return Err(RemoteError::NotConnected);
        }

        let failures = self.failures.lock().await;
        if failures.all_operations || failures.collections.contains(&collection) {
            return Err(RemoteError::Unavailable(format!(
                "{} is unavailable",
                collection
            )));
        }
        Ok(())
    }
}

fn compare(left: &Value, right: &Value) -> Option<CmpOrdering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(_), Value::Number(_)) => compare(left, right) == Some(CmpOrdering::Equal),
        _ => left == right,
    }
}

fn matches_filter(doc: &Document, field: &str, op: FilterOp, value: &Value) -> bool {
    let Some(actual) = doc.get(field) else {
        return false;
    };

    match op {
        FilterOp::Equal => values_equal(actual, value),
        FilterOp::NotEqual => !values_equal(actual, value),
        FilterOp::LessThan => compare(actual, value) == Some(CmpOrdering::Less),
        FilterOp::LessThanOrEqual => matches!(
            compare(actual, value),
            Some(CmpOrdering::Less | CmpOrdering::Equal)
        ),
        FilterOp::GreaterThan => compare(actual, value) == Some(CmpOrdering::Greater),
        FilterOp::GreaterThanOrEqual => matches!(
            compare(actual, value),
            Some(CmpOrdering::Greater | CmpOrdering::Equal)
        ),
        FilterOp::ArrayContains => actual
            .as_array()
            .is_some_and(|items| items.iter().any(|item| values_equal(item, value))),
        FilterOp::In => value
            .as_array()
            .is_some_and(|options| options.iter().any(|option| values_equal(actual, option))),
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn connect(&self, _settings: &ConnectionSettings) -> Result<(), InitError> {
        if let Some(message) = self.failures.lock().await.connect.clone() {
            return Err(InitError::Connection(message));
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn enable_persistence(&self) -> Result<(), PersistenceError> {
        match self.failures.lock().await.persistence.clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn add(&self, collection: CollectionName, doc: &Document) -> Result<DocId, RemoteError> {
        self.before_operation(collection).await?;

        let doc_id = self.generate_id();
        self.documents
            .lock()
            .await
            .entry(collection)
            .or_default()
            .push(doc.without_doc_id().with_doc_id(doc_id.clone()));
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(doc_id)
    }

    async fn get_all(&self, collection: CollectionName) -> Result<Vec<Document>, RemoteError> {
        self.before_operation(collection).await?;
        Ok(self.documents(collection).await)
    }

    async fn get_where(
        &self,
        collection: CollectionName,
        field: &str,
        op: FilterOp,
        value: &Value,
    ) -> Result<Vec<Document>, RemoteError> {
        self.before_operation(collection).await?;

        Ok(self
            .documents(collection)
            .await
            .into_iter()
            .filter(|doc| matches_filter(doc, field, op, value))
            .collect())
    }

    async fn update(
        &self,
        collection: CollectionName,
        doc_id: &DocId,
        doc: &Document,
    ) -> Result<(), RemoteError> {
        self.before_operation(collection).await?;

        let mut store = self.documents.lock().await;
        let existing = store
            .get_mut(&collection)
            .and_then(|docs| docs.iter_mut().find(|d| d.doc_id.as_ref() == Some(doc_id)))
            .ok_or_else(|| RemoteError::NotFound(format!("{}/{}", collection, doc_id)))?;

        existing.merge(doc);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, collection: CollectionName, doc_id: &DocId) -> Result<(), RemoteError> {
        self.before_operation(collection).await?;

        if let Some(docs) = self.documents.lock().await.get_mut(&collection) {
            docs.retain(|d| d.doc_id.as_ref() != Some(doc_id));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
