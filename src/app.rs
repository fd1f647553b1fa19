use std::sync::Arc;

use educonnect_core::{
    FirebaseStorageRest, FirestoreRest, LocalMirror, MemoryObjectStore, MemoryRemote,
    ObjectStore, RemoteStore, SyncContext, SyncCoordinator, UnconfiguredRemote,
};

use crate::config::Config;

/// Builds the coordinator for this process.
///
/// The local mirror seeds the application state. Remote initialization is
/// started in the background, so the first operation waits on readiness
/// rather than on `connect` itself. Missing project settings leave the
/// remote store failed and every write goes to the local mirror only.
pub fn start(config: &Config, offline: bool) -> SyncCoordinator {
    let store: Arc<dyn RemoteStore> = if offline {
        tracing::info!("Offline mode: using an in-process remote store");
        Arc::new(MemoryRemote::new())
    } else {
        match FirestoreRest::from_config(&config.remote) {
            Ok(client) => Arc::new(client),
            Err(e) => {
                tracing::warn!("{}; working from the local mirror", e);
                Arc::new(UnconfiguredRemote::new(e.to_string()))
            }
        }
    };

    let mirror = LocalMirror::in_dir(config.data_dir.value.clone());
    let state = mirror.restore().unwrap_or_default();

    let ctx = SyncContext::new(store, state);
    let remote = ctx.remote.clone();
    tokio::spawn(async move {
        // Failures resolve the gate and are logged by the handle.
        let _ = remote.initialize().await;
    });

    SyncCoordinator::new(ctx, mirror, config.sync.options())
}

/// Object storage for post attachments.
pub fn object_store(
    config: &Config,
    offline: bool,
) -> Result<Arc<dyn ObjectStore>, Box<dyn std::error::Error>> {
    if offline {
        return Ok(Arc::new(MemoryObjectStore::new()));
    }
    Ok(Arc::new(FirebaseStorageRest::from_config(&config.remote)?))
}
