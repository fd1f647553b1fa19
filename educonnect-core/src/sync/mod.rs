//! Readiness-gated dual-write synchronization.
//!
//! The [`SyncCoordinator`] decides, per operation, whether a write goes to
//! the remote store and the local mirror, or to the local mirror alone:
//!
//! 1. Wait (bounded) for the remote connection to become ready
//! 2. If ready, perform the remote operation
//! 3. Write the full application state to the local mirror, whether the
//!    remote write succeeded, failed, or was skipped
//!
//! Writes made while degraded are not replayed against the remote store
//! later.

mod coordinator;
mod error;
mod migrate;

use std::sync::Arc;
use std::time::Duration;

use crate::document::{ApplicationState, SharedState};
use crate::readiness::ReadinessGate;
use crate::remote::{RemoteHandle, RemoteStore};

pub use coordinator::SyncCoordinator;
pub use error::SyncError;
pub use migrate::MigrationReport;

/// How long an operation waits for the remote store by default.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(10);
/// How often subscriptions re-read a collection by default.
pub const DEFAULT_SNAPSHOT_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Upper bound on the readiness wait at the start of each operation.
    pub ready_timeout: Duration,
    /// Polling interval for collection subscriptions.
    pub snapshot_interval: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            ready_timeout: DEFAULT_READY_TIMEOUT,
            snapshot_interval: DEFAULT_SNAPSHOT_INTERVAL,
        }
    }
}

/// Where the coordinator stands with respect to the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// No operation has run yet.
    Uninitialized,
    /// An operation is waiting for the remote store.
    AwaitingRemote,
    /// The last operation reached the remote store.
    Ready,
    /// The last operation fell back to the local mirror. The next
    /// operation tries the remote store again.
    Degraded,
}

/// Process-wide handles the coordinator works with.
#[derive(Debug, Clone)]
pub struct SyncContext {
    pub remote: RemoteHandle,
    pub gate: Arc<ReadinessGate>,
    pub state: SharedState,
}

impl SyncContext {
    /// Wires a backend, a fresh readiness gate, and the application state.
    pub fn new(store: Arc<dyn RemoteStore>, state: ApplicationState) -> Self {
        let gate = Arc::new(ReadinessGate::new());
        Self {
            remote: RemoteHandle::new(store, Arc::clone(&gate)),
            gate,
            state: state.into_shared(),
        }
    }
}
