//! Documents and the in-memory application state they live in.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::collection::CollectionName;

/// Field holding the application's own logical identifier.
pub const LOGICAL_ID_FIELD: &str = "id";

/// Opaque identifier assigned by the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocId(String);

impl DocId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A field map plus the remote identifier, when the document came from
/// the remote store.
///
/// Serializes flat: `{"docId": "...", "id": 1, "name": "..."}`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "docId", default, skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<DocId>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self {
            doc_id: None,
            fields,
        }
    }

    /// Builds a document from a JSON object. Returns `None` for any other
    /// JSON value.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => serde_json::from_value(Value::Object(map)).ok(),
            _ => None,
        }
    }

    pub fn with_doc_id(mut self, doc_id: DocId) -> Self {
        self.doc_id = Some(doc_id);
        self
    }

    /// The application's logical identifier (field `id`).
    pub fn logical_id(&self) -> Option<&Value> {
        self.fields.get(LOGICAL_ID_FIELD)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Copy of this document without its remote identifier, suitable for
    /// writing back to the remote store.
    pub fn without_doc_id(&self) -> Self {
        Self::new(self.fields.clone())
    }

    /// Overwrites every field present in `other`.
    pub fn merge(&mut self, other: &Document) {
        for (key, value) in &other.fields {
            self.fields.insert(key.clone(), value.clone());
        }
    }
}

/// The five ordered document sequences the application works against.
///
/// Serialized as the local mirror payload; absent collections load empty.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationState {
    pub institutions: Vec<Document>,
    pub teachers: Vec<Document>,
    pub students: Vec<Document>,
    pub posts: Vec<Document>,
    pub achievements: Vec<Document>,
}

/// Application state shared between the application and the coordinator.
///
/// The runtime may schedule tasks on several threads, so every mutation
/// goes through the lock.
pub type SharedState = Arc<RwLock<ApplicationState>>;

impl ApplicationState {
    pub fn collection(&self, name: CollectionName) -> &[Document] {
        match name {
            CollectionName::Institutions => &self.institutions,
            CollectionName::Teachers => &self.teachers,
            CollectionName::Students => &self.students,
            CollectionName::Posts => &self.posts,
            CollectionName::Achievements => &self.achievements,
        }
    }

    pub fn collection_mut(&mut self, name: CollectionName) -> &mut Vec<Document> {
        match name {
            CollectionName::Institutions => &mut self.institutions,
            CollectionName::Teachers => &mut self.teachers,
            CollectionName::Students => &mut self.students,
            CollectionName::Posts => &mut self.posts,
            CollectionName::Achievements => &mut self.achievements,
        }
    }

    /// Replaces every collection in one step.
    pub fn replace_all(&mut self, fresh: ApplicationState) {
        *self = fresh;
    }

    /// Finds a document by logical id.
    pub fn find(&self, name: CollectionName, logical_id: &Value) -> Option<&Document> {
        self.collection(name)
            .iter()
            .find(|doc| doc.logical_id() == Some(logical_id))
    }

    /// Inserts `doc`, or merges it into the document with the same logical
    /// id if one exists.
    pub fn upsert_local(&mut self, name: CollectionName, doc: Document) {
        let docs = self.collection_mut(name);
        let existing = doc
            .logical_id()
            .and_then(|id| docs.iter_mut().find(|d| d.logical_id() == Some(id)));

        match existing {
            Some(current) => current.merge(&doc),
            None => docs.push(doc),
        }
    }

    /// Records the remote identifier of the local document with the given
    /// logical id. Returns whether a document was found.
    pub fn assign_doc_id(
        &mut self,
        name: CollectionName,
        logical_id: &Value,
        doc_id: DocId,
    ) -> bool {
        match self
            .collection_mut(name)
            .iter_mut()
            .find(|d| d.logical_id() == Some(logical_id))
        {
            Some(doc) => {
                doc.doc_id = Some(doc_id);
                true
            }
            None => false,
        }
    }

    /// Removes every document with the given logical id. Returns whether
    /// anything was removed.
    pub fn remove_local(&mut self, name: CollectionName, logical_id: &Value) -> bool {
        let docs = self.collection_mut(name);
        let before = docs.len();
        docs.retain(|d| d.logical_id() != Some(logical_id));
        docs.len() != before
    }

    /// Number of documents per collection, in `CollectionName::ALL` order.
    pub fn counts(&self) -> Vec<(CollectionName, usize)> {
        CollectionName::ALL
            .into_iter()
            .map(|name| (name, self.collection(name).len()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        CollectionName::ALL
            .into_iter()
            .all(|name| self.collection(name).is_empty())
    }

    pub fn into_shared(self) -> SharedState {
        Arc::new(RwLock::new(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        Document::from_value(value).unwrap()
    }

    #[test]
    fn test_document_serializes_flat_with_doc_id() {
        let d = doc(json!({"id": 7, "name": "Ana"})).with_doc_id(DocId::from("abc"));
        let value = serde_json::to_value(&d).unwrap();
        assert_eq!(value, json!({"docId": "abc", "id": 7, "name": "Ana"}));
    }

    #[test]
    fn test_document_deserializes_doc_id_out_of_fields() {
        let d = doc(json!({"docId": "abc", "id": 7}));
        assert_eq!(d.doc_id, Some(DocId::from("abc")));
        assert!(!d.fields.contains_key("docId"));
        assert_eq!(d.logical_id(), Some(&json!(7)));
    }

    #[test]
    fn test_from_value_rejects_non_objects() {
        assert!(Document::from_value(json!([1, 2])).is_none());
        assert!(Document::from_value(json!("text")).is_none());
    }

    #[test]
    fn test_without_doc_id() {
        let d = doc(json!({"docId": "abc", "id": 1}));
        let stripped = d.without_doc_id();
        assert!(stripped.doc_id.is_none());
        assert_eq!(stripped.fields, d.fields);
    }

    #[test]
    fn test_state_missing_collections_default_empty() {
        let state: ApplicationState =
            serde_json::from_value(json!({"teachers": [{"id": 1}]})).unwrap();
        assert_eq!(state.teachers.len(), 1);
        assert!(state.institutions.is_empty());
        assert!(state.achievements.is_empty());
    }

    #[test]
    fn test_upsert_local_merges_by_logical_id() {
        let mut state = ApplicationState::default();
        state.upsert_local(
            CollectionName::Students,
            doc(json!({"id": 1, "name": "Ana", "grade": 3})),
        );
        state.upsert_local(CollectionName::Students, doc(json!({"id": 1, "grade": 4})));
        state.upsert_local(CollectionName::Students, doc(json!({"id": 2, "name": "Luis"})));

        assert_eq!(state.students.len(), 2);
        let ana = state.find(CollectionName::Students, &json!(1)).unwrap();
        assert_eq!(ana.get("grade"), Some(&json!(4)));
        assert_eq!(ana.get("name"), Some(&json!("Ana")));
    }

    #[test]
    fn test_assign_doc_id() {
        let mut state = ApplicationState::default();
        state.upsert_local(CollectionName::Posts, doc(json!({"id": 7, "title": "Feria"})));

        assert!(state.assign_doc_id(CollectionName::Posts, &json!(7), DocId::from("r1")));
        assert!(!state.assign_doc_id(CollectionName::Posts, &json!(8), DocId::from("r2")));

        let post = state.find(CollectionName::Posts, &json!(7)).unwrap();
        assert_eq!(post.doc_id, Some(DocId::from("r1")));
        assert_eq!(post.get("title"), Some(&json!("Feria")));
    }

    #[test]
    fn test_remove_local() {
        let mut state = ApplicationState::default();
        state.upsert_local(CollectionName::Posts, doc(json!({"id": "p1"})));

        assert!(!state.remove_local(CollectionName::Posts, &json!("p2")));
        assert!(state.remove_local(CollectionName::Posts, &json!("p1")));
        assert!(state.is_empty());
    }

    #[test]
    fn test_counts_in_collection_order() {
        let mut state = ApplicationState::default();
        state.upsert_local(CollectionName::Posts, doc(json!({"id": 1})));
        let counts = state.counts();
        assert_eq!(counts[0], (CollectionName::Institutions, 0));
        assert_eq!(counts[3], (CollectionName::Posts, 1));
    }
}
