//! Hosted object storage over its REST API.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Response;
use serde_json::{json, Value};

use super::{MediaError, ObjectStore};
use crate::remote::RemoteConfig;

/// Default REST endpoint.
pub const DEFAULT_STORAGE_URL: &str = "https://firebasestorage.googleapis.com/v0";

#[derive(Debug, Clone)]
pub struct FirebaseStorageRest {
    client: reqwest::Client,
    base_url: String,
    bucket: String,
}

impl FirebaseStorageRest {
    pub fn from_config(config: &RemoteConfig) -> Result<Self, MediaError> {
        let bucket = config
            .storage_bucket
            .clone()
            .ok_or_else(|| MediaError::NotConfigured("storage_bucket missing".to_string()))?;

        Ok(Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_STORAGE_URL.to_string(),
            bucket,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn bucket_url(&self) -> String {
        format!("{}/b/{}/o", self.base_url.trim_end_matches('/'), self.bucket)
    }

    /// Object URL; the path is encoded as a single segment.
    fn object_url(&self, path: &str) -> String {
        format!("{}/{}", self.bucket_url(), urlencoding::encode(path))
    }

    fn download_url(&self, path: &str, token: Option<&str>) -> String {
        match token {
            Some(token) => format!("{}?alt=media&token={}", self.object_url(path), token),
            None => format!("{}?alt=media", self.object_url(path)),
        }
    }
}

async fn check_status(response: Response) -> Result<Response, MediaError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(MediaError::Storage(format!("status {}: {}", status, body)))
}

fn http_err(e: reqwest::Error) -> MediaError {
    MediaError::Storage(e.to_string())
}

#[async_trait]
impl ObjectStore for FirebaseStorageRest {
    async fn put(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<String, MediaError> {
        let response = self
            .client
            .post(self.bucket_url())
            .query(&[("uploadType", "media"), ("name", path)])
            .header(CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(http_err)?;

        let uploaded: Value = check_status(response)
            .await?
            .json()
            .await
            .map_err(http_err)?;

        if !metadata.is_empty() {
            let response = self
                .client
                .patch(self.object_url(path))
                .json(&json!({ "metadata": metadata }))
                .send()
                .await
                .map_err(http_err)?;
            check_status(response).await?;
        }

        // Several comma-separated tokens may be returned; any of them works.
        let token = uploaded["downloadTokens"]
            .as_str()
            .and_then(|tokens| tokens.split(',').next());
        Ok(self.download_url(path, token))
    }

    async fn delete(&self, path: &str) -> Result<(), MediaError> {
        let response = self
            .client
            .delete(self.object_url(path))
            .send()
            .await
            .map_err(http_err)?;
        check_status(response).await?;
        Ok(())
    }
}
