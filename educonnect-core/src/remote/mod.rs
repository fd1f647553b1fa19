//! Remote document store.
//!
//! [`RemoteStore`] is the backend seam; [`RemoteHandle`] wraps a backend
//! together with the readiness gate it resolves during initialization.
//!
//! Backends:
//! - [`FirestoreRest`]: the hosted document database over its REST API
//! - [`MemoryRemote`]: in-process store with failure injection

mod error;
mod firestore;
mod handle;
mod memory;
mod unconfigured;
mod value;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::collection::CollectionName;
use crate::document::{DocId, Document};

pub use error::{InitError, PersistenceError, RemoteError};
pub use firestore::FirestoreRest;
pub use handle::{RemoteHandle, Subscription};
pub use memory::MemoryRemote;
pub use unconfigured::UnconfiguredRemote;
pub use value::{decode_fields, encode_fields};

/// Hosted project settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub api_key: Option<String>,
    pub auth_domain: Option<String>,
    pub project_id: Option<String>,
    pub storage_bucket: Option<String>,
    pub messaging_sender_id: Option<String>,
    pub app_id: Option<String>,
}

impl RemoteConfig {
    /// Returns true if the document database can be reached (project id
    /// and api key present).
    pub fn is_configured(&self) -> bool {
        self.project_id.is_some() && self.api_key.is_some()
    }
}

/// Local cache size requested from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSize {
    Unlimited,
    Bytes(u64),
}

/// Settings applied when connecting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub cache_size: CacheSize,
    /// Share offline persistence across concurrently running instances.
    pub synchronize_tabs: bool,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            cache_size: CacheSize::Unlimited,
            synchronize_tabs: true,
        }
    }
}

/// Comparison used by filtered queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    ArrayContains,
    In,
}

impl FilterOp {
    /// Operator name in the REST query language.
    pub fn wire_name(&self) -> &'static str {
        match self {
            FilterOp::Equal => "EQUAL",
            FilterOp::NotEqual => "NOT_EQUAL",
            FilterOp::LessThan => "LESS_THAN",
            FilterOp::LessThanOrEqual => "LESS_THAN_OR_EQUAL",
            FilterOp::GreaterThan => "GREATER_THAN",
            FilterOp::GreaterThanOrEqual => "GREATER_THAN_OR_EQUAL",
            FilterOp::ArrayContains => "ARRAY_CONTAINS",
            FilterOp::In => "IN",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            FilterOp::Equal => "==",
            FilterOp::NotEqual => "!=",
            FilterOp::LessThan => "<",
            FilterOp::LessThanOrEqual => "<=",
            FilterOp::GreaterThan => ">",
            FilterOp::GreaterThanOrEqual => ">=",
            FilterOp::ArrayContains => "array-contains",
            FilterOp::In => "in",
        }
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for FilterOp {
    type Err = RemoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "==" => Ok(FilterOp::Equal),
            "!=" => Ok(FilterOp::NotEqual),
            "<" => Ok(FilterOp::LessThan),
            "<=" => Ok(FilterOp::LessThanOrEqual),
            ">" => Ok(FilterOp::GreaterThan),
            ">=" => Ok(FilterOp::GreaterThanOrEqual),
            "array-contains" => Ok(FilterOp::ArrayContains),
            "in" => Ok(FilterOp::In),
            other => Err(RemoteError::InvalidQuery(format!(
                "unsupported operator '{}'",
                other
            ))),
        }
    }
}

/// Backend operations against the remote document store.
///
/// Documents passed to `add` and `update` carry no `doc_id`; documents
/// returned by `get_all` and `get_where` always do.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Establishes the connection.
    async fn connect(&self, settings: &ConnectionSettings) -> Result<(), InitError>;

    /// Enables offline persistence. Failure never prevents use of the store.
    async fn enable_persistence(&self) -> Result<(), PersistenceError>;

    async fn add(&self, collection: CollectionName, doc: &Document)
        -> Result<DocId, RemoteError>;

    async fn get_all(&self, collection: CollectionName) -> Result<Vec<Document>, RemoteError>;

    async fn get_where(
        &self,
        collection: CollectionName,
        field: &str,
        op: FilterOp,
        value: &Value,
    ) -> Result<Vec<Document>, RemoteError>;

    /// Merges `doc`'s fields into an existing document.
    async fn update(
        &self,
        collection: CollectionName,
        doc_id: &DocId,
        doc: &Document,
    ) -> Result<(), RemoteError>;

    async fn delete(&self, collection: CollectionName, doc_id: &DocId) -> Result<(), RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_op_roundtrips_symbols() {
        for op in [
            FilterOp::Equal,
            FilterOp::NotEqual,
            FilterOp::LessThan,
            FilterOp::LessThanOrEqual,
            FilterOp::GreaterThan,
            FilterOp::GreaterThanOrEqual,
            FilterOp::ArrayContains,
            FilterOp::In,
        ] {
            assert_eq!(op.symbol().parse::<FilterOp>().unwrap(), op);
        }
    }

    #[test]
    fn test_filter_op_rejects_unknown() {
        assert!(matches!(
            "~=".parse::<FilterOp>(),
            Err(RemoteError::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_default_connection_settings() {
        let settings = ConnectionSettings::default();
        assert_eq!(settings.cache_size, CacheSize::Unlimited);
        assert!(settings.synchronize_tabs);
    }

    #[test]
    fn test_remote_config_is_configured() {
        let mut config = RemoteConfig::default();
        assert!(!config.is_configured());
        config.project_id = Some("educonnect".to_string());
        assert!(!config.is_configured());
        config.api_key = Some("key".to_string());
        assert!(config.is_configured());
    }
}
