//! Post attachments: images, a video, and files.
//!
//! Attachments arrive as `data:` URLs, are checked against per-kind size
//! limits, and are stored under
//! `posts/{postId}/{images|videos|files}/{generatedName}`.

mod data_url;
mod storage_rest;
mod store;

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use data_url::{content_type_for, decode_data_url, encode_data_url, unique_file_name};
pub use storage_rest::FirebaseStorageRest;
pub use store::{MemoryObjectStore, ObjectStore, StoredObject};

const MIB: u64 = 1024 * 1024;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MediaError {
    #[error("Invalid data URL: {0}")]
    InvalidDataUrl(String),

    #[error("{kind} {name} is {size} bytes, limit is {limit} bytes")]
    TooLarge {
        kind: MediaKind,
        name: String,
        size: u64,
        limit: u64,
    },

    #[error("Storage not configured: {0}")]
    NotConfigured(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    File,
}

impl MediaKind {
    /// Directory under the post's prefix.
    pub fn dir(&self) -> &'static str {
        match self {
            MediaKind::Image => "images",
            MediaKind::Video => "videos",
            MediaKind::File => "files",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Image => write!(f, "Image"),
            MediaKind::Video => write!(f, "Video"),
            MediaKind::File => write!(f, "File"),
        }
    }
}

/// Maximum decoded size per kind, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaLimits {
    pub image: u64,
    pub video: u64,
    pub file: u64,
}

impl Default for MediaLimits {
    fn default() -> Self {
        Self {
            image: 5 * MIB,
            video: 50 * MIB,
            file: 10 * MIB,
        }
    }
}

impl MediaLimits {
    pub fn for_kind(&self, kind: MediaKind) -> u64 {
        match kind {
            MediaKind::Image => self.image,
            MediaKind::Video => self.video,
            MediaKind::File => self.file,
        }
    }
}

/// An attachment selected for upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub name: String,
    /// `data:<mime>;base64,<payload>`
    pub data: String,
}

/// Everything selected for one post.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaSet {
    pub images: Vec<MediaItem>,
    pub video: Option<MediaItem>,
    pub files: Vec<MediaItem>,
}

impl MediaSet {
    pub fn len(&self) -> usize {
        self.images.len() + usize::from(self.video.is_some()) + self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedMedia {
    pub name: String,
    pub path: String,
    pub url: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub content_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadedMediaSet {
    pub images: Vec<UploadedMedia>,
    pub video: Option<UploadedMedia>,
    pub files: Vec<UploadedMedia>,
}

impl UploadedMediaSet {
    /// Storage paths of every attachment.
    pub fn paths(&self) -> Vec<&str> {
        self.images
            .iter()
            .chain(self.video.iter())
            .chain(self.files.iter())
            .map(|m| m.path.as_str())
            .filter(|p| !p.is_empty())
            .collect()
    }
}

/// Upload progress, reported after each attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub uploaded: usize,
    pub total: usize,
    pub label: String,
}

/// Outcome of deleting a post's attachments.
#[derive(Debug, Default)]
pub struct DeleteReport {
    pub deleted: Vec<String>,
    pub failed: Vec<(String, MediaError)>,
}

impl DeleteReport {
    pub fn all_deleted(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct MediaUploader {
    store: Arc<dyn ObjectStore>,
    limits: MediaLimits,
}

impl MediaUploader {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            limits: MediaLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: MediaLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn limits(&self) -> &MediaLimits {
        &self.limits
    }

    /// Uploads one attachment under `posts/{post_id}/{kind dir}/`.
    pub async fn upload(
        &self,
        post_id: &str,
        kind: MediaKind,
        item: &MediaItem,
    ) -> Result<UploadedMedia, MediaError> {
        tracing::info!("Uploading {} {}", kind, item.name);

        let (content_type, bytes) = decode_data_url(&item.data)?;
        let size = bytes.len() as u64;
        let limit = self.limits.for_kind(kind);
        if size > limit {
            return Err(MediaError::TooLarge {
                kind,
                name: item.name.clone(),
                size,
                limit,
            });
        }

        let path = format!(
            "posts/{}/{}/{}",
            post_id,
            kind.dir(),
            unique_file_name(&item.name)
        );

        let mut metadata = BTreeMap::new();
        if kind != MediaKind::Image {
            metadata.insert("originalName".to_string(), item.name.clone());
        }

        let url = self
            .store
            .put(&path, bytes, &content_type, &metadata)
            .await
            .inspect_err(|e| tracing::error!("Failed to upload {}: {}", item.name, e))?;

        tracing::info!("Uploaded {} to {}", item.name, path);
        Ok(UploadedMedia {
            name: item.name.clone(),
            path,
            url,
            size,
            content_type,
        })
    }

    /// Uploads images, then the video, then files, one at a time.
    ///
    /// `on_progress` is called after each upload. The first failure stops
    /// the upload; attachments already stored are left in place.
    pub async fn upload_all<P>(
        &self,
        post_id: &str,
        media: &MediaSet,
        mut on_progress: P,
    ) -> Result<UploadedMediaSet, MediaError>
    where
        P: FnMut(Progress),
    {
        let total = media.len();
        let mut uploaded = UploadedMediaSet::default();
        let mut count = 0;

        for image in &media.images {
            uploaded
                .images
                .push(self.upload(post_id, MediaKind::Image, image).await?);
            count += 1;
            on_progress(Progress {
                uploaded: count,
                total,
                label: format!("Image {}/{}", count, total),
            });
        }

        if let Some(video) = &media.video {
            uploaded.video = Some(self.upload(post_id, MediaKind::Video, video).await?);
            count += 1;
            on_progress(Progress {
                uploaded: count,
                total,
                label: "Video".to_string(),
            });
        }

        for file in &media.files {
            uploaded
                .files
                .push(self.upload(post_id, MediaKind::File, file).await?);
            count += 1;
            on_progress(Progress {
                uploaded: count,
                total,
                label: format!("File {}/{}", count, total),
            });
        }

        tracing::info!("Uploaded {} attachment(s) for post {}", count, post_id);
        Ok(uploaded)
    }

    /// Deletes every stored attachment concurrently and reports each path
    /// that could not be deleted.
    pub async fn delete_all(&self, media: &UploadedMediaSet) -> DeleteReport {
        let paths = media.paths();
        let results = join_all(paths.iter().map(|path| self.store.delete(path))).await;

        let mut report = DeleteReport::default();
        for (path, result) in paths.into_iter().zip(results) {
            match result {
                Ok(()) => report.deleted.push(path.to_string()),
                Err(e) => {
                    tracing::error!("Failed to delete {}: {}", path, e);
                    report.failed.push((path.to_string(), e));
                }
            }
        }

        tracing::info!(
            "Deleted {} attachment(s), {} failed",
            report.deleted.len(),
            report.failed.len()
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, mime: &str, len: usize) -> MediaItem {
        MediaItem {
            name: name.to_string(),
            data: encode_data_url(mime, &vec![7u8; len]),
        }
    }

    fn uploader() -> (MediaUploader, Arc<MemoryObjectStore>) {
        let store = Arc::new(MemoryObjectStore::new());
        (MediaUploader::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_progress_images_then_video() {
        let (uploader, store) = uploader();
        let media = MediaSet {
            images: vec![item("a.png", "image/png", 10), item("b.png", "image/png", 10)],
            video: Some(item("clip.mp4", "video/mp4", 20)),
            files: vec![],
        };

        let mut progress = Vec::new();
        let uploaded = uploader
            .upload_all("post-1", &media, |p| progress.push((p.uploaded, p.total)))
            .await
            .unwrap();

        assert_eq!(progress, vec![(1, 3), (2, 3), (3, 3)]);
        assert_eq!(uploaded.images.len(), 2);
        assert!(uploaded.video.is_some());
        assert_eq!(store.paths().await.len(), 3);
    }

    #[tokio::test]
    async fn test_upload_paths_and_metadata() {
        let (uploader, store) = uploader();
        let uploaded = uploader
            .upload("42", MediaKind::File, &item("plan.pdf", "application/pdf", 4))
            .await
            .unwrap();

        assert!(uploaded.path.starts_with("posts/42/files/plan_"));
        assert!(uploaded.path.ends_with(".pdf"));
        assert_eq!(uploaded.name, "plan.pdf");
        assert_eq!(uploaded.size, 4);
        assert_eq!(uploaded.content_type, "application/pdf");
        assert_eq!(uploaded.url, format!("memory://{}", uploaded.path));

        let stored = store.get(&uploaded.path).await.unwrap();
        assert_eq!(
            stored.metadata.get("originalName"),
            Some(&"plan.pdf".to_string())
        );
    }

    #[tokio::test]
    async fn test_oversized_upload_is_rejected() {
        let (uploader, store) = uploader();
        let uploader = uploader.with_limits(MediaLimits {
            image: 8,
            ..MediaLimits::default()
        });

        let result = uploader
            .upload("1", MediaKind::Image, &item("big.png", "image/png", 9))
            .await;

        assert!(matches!(
            result,
            Err(MediaError::TooLarge {
                kind: MediaKind::Image,
                size: 9,
                limit: 8,
                ..
            })
        ));
        assert!(store.paths().await.is_empty());
    }

    #[tokio::test]
    async fn test_upload_all_stops_at_first_failure() {
        let (uploader, _store) = uploader();
        let media = MediaSet {
            images: vec![MediaItem {
                name: "broken.png".to_string(),
                data: "not a data url".to_string(),
            }],
            video: None,
            files: vec![item("ok.txt", "text/plain", 2)],
        };

        let mut calls = 0;
        let result = uploader.upload_all("1", &media, |_| calls += 1).await;

        assert!(matches!(result, Err(MediaError::InvalidDataUrl(_))));
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn test_delete_all_reports_failed_paths() {
        let (uploader, store) = uploader();
        let media = MediaSet {
            images: vec![item("a.png", "image/png", 1)],
            video: None,
            files: vec![item("b.pdf", "application/pdf", 1)],
        };
        let uploaded = uploader.upload_all("9", &media, |_| {}).await.unwrap();
        let failing = uploaded.files[0].path.clone();
        store.fail_delete(failing.clone()).await;

        let report = uploader.delete_all(&uploaded).await;

        assert!(!report.all_deleted());
        assert_eq!(report.deleted, vec![uploaded.images[0].path.clone()]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, failing);
        assert_eq!(store.paths().await, vec![failing]);
    }

    #[tokio::test]
    async fn test_delete_all_empty_set() {
        let (uploader, _store) = uploader();
        let report = uploader.delete_all(&UploadedMediaSet::default()).await;
        assert!(report.all_deleted());
        assert!(report.deleted.is_empty());
    }

    #[test]
    fn test_uploaded_media_serializes_type_field() {
        let media = UploadedMedia {
            name: "a.png".to_string(),
            path: "posts/1/images/a.png".to_string(),
            url: "u".to_string(),
            size: 1,
            content_type: "image/png".to_string(),
        };
        let value = serde_json::to_value(&media).unwrap();
        assert_eq!(value["type"], "image/png");
    }
}
