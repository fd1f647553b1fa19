//! One-time copy of the local mirror into an empty remote store.

use super::{SyncCoordinator, SyncError};
use crate::collection::CollectionName;
use crate::document::ApplicationState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationReport {
    /// The local mirror is empty or unreadable.
    NothingToMigrate,
    /// The remote store already has institutions; nothing was copied.
    RemoteAlreadyPopulated,
    /// Documents copied per collection.
    Migrated(Vec<(CollectionName, usize)>),
}

impl SyncCoordinator {
    /// Copies every document in the local mirror to the remote store, if
    /// the remote store holds no institutions yet.
    ///
    /// Documents are added one at a time, collection by collection. After a
    /// complete copy the raw mirror payload is kept under the backup key.
    /// A failure part-way leaves the documents already added in place and
    /// no backup written.
    pub async fn migrate_from_mirror(&self) -> Result<MigrationReport, SyncError> {
        let raw = match self.mirror().raw() {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                tracing::info!("No local data to migrate");
                return Ok(MigrationReport::NothingToMigrate);
            }
            Err(e) => {
                tracing::warn!("Failed to read local mirror for migration: {}", e);
                return Ok(MigrationReport::NothingToMigrate);
            }
        };

        let local: ApplicationState = match serde_json::from_str(&raw) {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!("Local mirror is corrupt, not migrating: {}", e);
                return Ok(MigrationReport::NothingToMigrate);
            }
        };

        if !self
            .context()
            .gate
            .await_ready(self.options().ready_timeout)
            .await
        {
            return Err(SyncError::NotReady);
        }

        let remote = &self.context().remote;
        let existing = remote
            .get_all_documents(CollectionName::Institutions)
            .await?;
        if !existing.is_empty() {
            tracing::info!("Remote store already has data, skipping migration");
            return Ok(MigrationReport::RemoteAlreadyPopulated);
        }

        tracing::info!("Migrating local data to remote store");

        let mut migrated = Vec::new();
        for name in CollectionName::ALL {
            let docs = local.collection(name);
            for doc in docs {
                remote.add_document(name, doc).await?;
            }
            if !docs.is_empty() {
                tracing::info!("Migrated {} {}", docs.len(), name);
            }
            migrated.push((name, docs.len()));
        }

        if let Err(e) = self.mirror().backup(&raw) {
            tracing::warn!("Failed to back up local data after migration: {}", e);
        }

        tracing::info!("Migration complete");
        Ok(MigrationReport::Migrated(migrated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::mirror::LocalMirror;
    use crate::remote::MemoryRemote;
    use crate::sync::{SyncContext, SyncOptions};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;

    fn doc(value: Value) -> Document {
        Document::from_value(value).unwrap()
    }

    async fn coordinator_with(
        remote: Arc<MemoryRemote>,
        mirror: LocalMirror,
        initialize: bool,
    ) -> SyncCoordinator {
        let ctx = SyncContext::new(remote, ApplicationState::default());
        if initialize {
            ctx.remote.initialize().await.unwrap();
        }
        let options = SyncOptions {
            ready_timeout: Duration::from_millis(200),
            ..Default::default()
        };
        SyncCoordinator::new(ctx, mirror, options)
    }

    fn mirrored_state() -> ApplicationState {
        let mut state = ApplicationState::default();
        state.upsert_local(CollectionName::Institutions, doc(json!({"id": 1})));
        state.upsert_local(CollectionName::Teachers, doc(json!({"id": 10})));
        state.upsert_local(CollectionName::Teachers, doc(json!({"id": 11})));
        state.upsert_local(
            CollectionName::Posts,
            doc(json!({"docId": "old", "id": 20})),
        );
        state
    }

    #[tokio::test]
    async fn test_nothing_to_migrate() {
        let remote = Arc::new(MemoryRemote::new());
        let coordinator = coordinator_with(remote, LocalMirror::in_memory(), true).await;

        let report = coordinator.migrate_from_mirror().await.unwrap();
        assert_eq!(report, MigrationReport::NothingToMigrate);
    }

    #[tokio::test]
    async fn test_migrates_into_empty_remote_and_backs_up() {
        let mirror = LocalMirror::in_memory();
        mirror.snapshot(&mirrored_state()).unwrap();
        let raw = mirror.raw().unwrap().unwrap();

        let remote = Arc::new(MemoryRemote::new());
        let coordinator = coordinator_with(remote.clone(), mirror, true).await;

        let report = coordinator.migrate_from_mirror().await.unwrap();

        assert_eq!(
            report,
            MigrationReport::Migrated(vec![
                (CollectionName::Institutions, 1),
                (CollectionName::Teachers, 2),
                (CollectionName::Students, 0),
                (CollectionName::Posts, 1),
                (CollectionName::Achievements, 0),
            ])
        );
        assert_eq!(remote.documents(CollectionName::Teachers).await.len(), 2);
        let posts = remote.documents(CollectionName::Posts).await;
        assert_ne!(posts[0].doc_id.as_ref().map(|id| id.as_str()), Some("old"));
        assert_eq!(
            coordinator.mirror().restore_backup().unwrap(),
            Some(raw)
        );
    }

    #[tokio::test]
    async fn test_skips_when_remote_has_institutions() {
        let mirror = LocalMirror::in_memory();
        mirror.snapshot(&mirrored_state()).unwrap();

        let remote = Arc::new(MemoryRemote::new());
        remote
            .seed(CollectionName::Institutions, vec![doc(json!({"id": 99}))])
            .await;
        let coordinator = coordinator_with(remote.clone(), mirror, true).await;

        let report = coordinator.migrate_from_mirror().await.unwrap();

        assert_eq!(report, MigrationReport::RemoteAlreadyPopulated);
        assert!(remote.documents(CollectionName::Teachers).await.is_empty());
        assert!(coordinator.mirror().restore_backup().unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_requires_ready_remote() {
        let mirror = LocalMirror::in_memory();
        mirror.snapshot(&mirrored_state()).unwrap();

        let remote = Arc::new(MemoryRemote::new());
        let coordinator = coordinator_with(remote, mirror, false).await;

        assert_eq!(
            coordinator.migrate_from_mirror().await,
            Err(SyncError::NotReady)
        );
    }
}
