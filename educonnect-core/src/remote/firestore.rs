//! Hosted document database over its REST API.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde_json::{json, Value};

use super::value::{decode_fields, encode_fields, encode_value};
use super::{
    ConnectionSettings, FilterOp, InitError, PersistenceError, RemoteConfig, RemoteError,
    RemoteStore,
};
use crate::collection::CollectionName;
use crate::document::{DocId, Document};

/// Default REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://firestore.googleapis.com/v1";

/// Documents fetched per list request.
const PAGE_SIZE: &str = "300";

/// REST client for the hosted document database.
///
/// A REST client keeps no local cache, so offline persistence is reported
/// as unimplemented.
#[derive(Debug)]
pub struct FirestoreRest {
    client: reqwest::Client,
    base_url: String,
    project_id: String,
    api_key: String,
    connected: AtomicBool,
}

impl FirestoreRest {
    /// Creates a client from project settings.
    pub fn from_config(config: &RemoteConfig) -> Result<Self, InitError> {
        let project_id = config
            .project_id
            .clone()
            .ok_or_else(|| InitError::NotConfigured("project_id missing".to_string()))?;
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| InitError::NotConfigured("api_key missing".to_string()))?;

        Ok(Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            project_id,
            api_key,
            connected: AtomicBool::new(false),
        })
    }

    /// Points the client at a different endpoint (e.g. a local emulator).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn database_path(&self) -> String {
        format!("projects/{}/databases/(default)", self.project_id)
    }

    fn documents_url(&self) -> String {
        format!(
            "{}/{}/documents",
            self.base_url.trim_end_matches('/'),
            self.database_path()
        )
    }

    fn collection_url(&self, collection: CollectionName) -> String {
        format!("{}/{}", self.documents_url(), collection.as_str())
    }

    fn document_url(&self, collection: CollectionName, doc_id: &DocId) -> String {
        format!(
            "{}/{}",
            self.collection_url(collection),
            urlencoding::encode(doc_id.as_str())
        )
    }

    fn ensure_connected(&self) -> Result<(), RemoteError> {
        if self.connected.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(RemoteError::NotConnected)
        }
    }

    /// Query parameters for a merging PATCH: one mask entry per field.
    fn update_query(&self, doc: &Document) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("key", self.api_key.clone()),
            ("currentDocument.exists", "true".to_string()),
        ];
        query.extend(
            doc.fields
                .keys()
                .map(|field| ("updateMask.fieldPaths", field_path(field))),
        );
        query
    }

    async fn list_page(
        &self,
        collection: CollectionName,
        page_token: Option<&str>,
    ) -> Result<Value, RemoteError> {
        let mut query = vec![("key", self.api_key.as_str()), ("pageSize", PAGE_SIZE)];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }

        let response = self
            .client
            .get(self.collection_url(collection))
            .query(&query)
            .send()
            .await?;

        Ok(check_status(response).await?.json().await?)
    }
}

/// Maps non-success responses to [`RemoteError`].
async fn check_status(response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or(body);

    if status == StatusCode::NOT_FOUND {
        Err(RemoteError::NotFound(message))
    } else {
        Err(RemoteError::Status {
            status: status.as_u16(),
            message,
        })
    }
}

/// Extracts the document id from a full resource name
/// (`projects/p/databases/(default)/documents/posts/<id>`).
fn doc_id_from_name(name: &str) -> Option<DocId> {
    name.rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
        .map(DocId::from)
}

fn parse_document(raw: &Value) -> Result<Document, RemoteError> {
    let name = raw["name"]
        .as_str()
        .ok_or_else(|| RemoteError::Decode("document without name".to_string()))?;
    let doc_id = doc_id_from_name(name)
        .ok_or_else(|| RemoteError::Decode(format!("bad document name {}", name)))?;
    let fields = decode_fields(raw.get("fields"))?;

    Ok(Document::new(fields).with_doc_id(doc_id))
}

/// Quotes a field name for use in a field path. Simple identifiers pass
/// through; anything else is wrapped in backticks.
fn field_path(field: &str) -> String {
    let mut chars = field.chars();
    let simple = matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric());
    if simple {
        return field.to_string();
    }

    let escaped = field.replace('\\', "\\\\").replace('`', "\\`");
    format!("`{}`", escaped)
}

fn where_query(collection: CollectionName, field: &str, op: FilterOp, value: &Value) -> Value {
    json!({
        "structuredQuery": {
            "from": [{ "collectionId": collection.as_str() }],
            "where": {
                "fieldFilter": {
                    "field": { "fieldPath": field_path(field) },
                    "op": op.wire_name(),
                    "value": encode_value(value),
                }
            }
        }
    })
}

#[async_trait]
impl RemoteStore for FirestoreRest {
    async fn connect(&self, settings: &ConnectionSettings) -> Result<(), InitError> {
        tracing::debug!(
            "Connecting to project {} (cache {:?})",
            self.project_id,
            settings.cache_size
        );

        let response = self
            .client
            .get(self.collection_url(CollectionName::Institutions))
            .query(&[("key", self.api_key.as_str()), ("pageSize", "1")])
            .send()
            .await
            .map_err(|e| InitError::Connection(e.to_string()))?;

        check_status(response)
            .await
            .map_err(|e| InitError::Connection(e.to_string()))?;

        self.connected.store(true, Ordering::Release);
        Ok(())
    }

    async fn enable_persistence(&self) -> Result<(), PersistenceError> {
        Err(PersistenceError::Unimplemented)
    }

    async fn add(&self, collection: CollectionName, doc: &Document) -> Result<DocId, RemoteError> {
        self.ensure_connected()?;

        let response = self
            .client
            .post(self.collection_url(collection))
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({ "fields": encode_fields(&doc.fields) }))
            .send()
            .await?;

        let created: Value = check_status(response).await?.json().await?;
        parse_document(&created)?
            .doc_id
            .ok_or_else(|| RemoteError::Decode("created document has no id".to_string()))
    }

    async fn get_all(&self, collection: CollectionName) -> Result<Vec<Document>, RemoteError> {
        self.ensure_connected()?;

        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self.list_page(collection, page_token.as_deref()).await?;
            if let Some(raw_docs) = page["documents"].as_array() {
                for raw in raw_docs {
                    documents.push(parse_document(raw)?);
                }
            }

            match page["nextPageToken"].as_str() {
                Some(token) if !token.is_empty() => page_token = Some(token.to_string()),
                _ => break,
            }
        }

        Ok(documents)
    }

    async fn get_where(
        &self,
        collection: CollectionName,
        field: &str,
        op: FilterOp,
        value: &Value,
    ) -> Result<Vec<Document>, RemoteError> {
        self.ensure_connected()?;

        let response = self
            .client
            .post(format!("{}:runQuery", self.documents_url()))
            .query(&[("key", self.api_key.as_str())])
            .json(&where_query(collection, field, op, value))
            .send()
            .await?;

        let results: Vec<Value> = check_status(response).await?.json().await?;
        results
            .iter()
            .filter_map(|entry| entry.get("document"))
            .map(parse_document)
            .collect()
    }

    async fn update(
        &self,
        collection: CollectionName,
        doc_id: &DocId,
        doc: &Document,
    ) -> Result<(), RemoteError> {
        self.ensure_connected()?;

        // A PATCH without a mask replaces the whole document.
        if doc.fields.is_empty() {
            return Ok(());
        }

        let response = self
            .client
            .patch(self.document_url(collection, doc_id))
            .query(&self.update_query(doc))
            .json(&json!({ "fields": encode_fields(&doc.fields) }))
            .send()
            .await?;

        check_status(response).await?;
        Ok(())
    }

    async fn delete(&self, collection: CollectionName, doc_id: &DocId) -> Result<(), RemoteError> {
        self.ensure_connected()?;

        let response = self
            .client
            .delete(self.document_url(collection, doc_id))
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?;

        check_status(response).await?;
        Ok(())
    }
}
