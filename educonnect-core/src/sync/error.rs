//! Sync error types.

use thiserror::Error;

use crate::remote::RemoteError;

/// Failures surfaced to callers of the coordinator.
///
/// Only `save` and migration return these; the other operations log and
/// report a sentinel instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    /// The remote store did not become ready in time.
    #[error("Remote store not ready")]
    NotReady,

    /// A remote operation failed. Local state was still mirrored.
    #[error("Remote operation failed: {0}")]
    Remote(#[from] RemoteError),
}
