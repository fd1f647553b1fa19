//! EduConnect Core Library
//!
//! Remote document sync with a local mirror fallback, and media storage
//! for post attachments.

pub mod collection;
pub mod document;
pub mod media;
pub mod mirror;
pub mod readiness;
pub mod remote;
pub mod sync;

pub use collection::{CollectionName, UnknownCollection};
pub use document::{ApplicationState, DocId, Document, SharedState, LOGICAL_ID_FIELD};
pub use media::{
    DeleteReport, FirebaseStorageRest, MediaError, MediaItem, MediaKind, MediaLimits, MediaSet,
    MediaUploader, MemoryObjectStore, ObjectStore, Progress, UploadedMedia, UploadedMediaSet,
};
pub use mirror::{LocalMirror, MirrorError};
pub use readiness::{ReadinessGate, ReadinessState};
pub use remote::{
    ConnectionSettings, FilterOp, FirestoreRest, InitError, MemoryRemote, RemoteConfig,
    RemoteError, RemoteHandle, RemoteStore, Subscription, UnconfiguredRemote,
};
pub use sync::{
    MigrationReport, SyncContext, SyncCoordinator, SyncError, SyncOptions, SyncPhase,
};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
