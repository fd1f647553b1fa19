//! The dual-write decision layer.

use serde_json::Value;
use tokio::sync::watch;

use super::{SyncContext, SyncError, SyncOptions, SyncPhase};
use crate::collection::CollectionName;
use crate::document::{ApplicationState, DocId, Document, LOGICAL_ID_FIELD};
use crate::mirror::LocalMirror;
use crate::remote::{FilterOp, RemoteError, Subscription};

#[derive(Clone, Copy)]
enum Mutation<'a> {
    Update(&'a Document),
    Delete,
}

impl Mutation<'_> {
    fn verb(&self) -> &'static str {
        match self {
            Mutation::Update(_) => "update",
            Mutation::Delete => "delete",
        }
    }
}

/// Routes application writes to the remote store and the local mirror.
///
/// Concurrent calls are not serialized: two saves against the same
/// collection race at the remote store, and callers that need ordering must
/// await one before issuing the next.
#[derive(Debug)]
pub struct SyncCoordinator {
    ctx: SyncContext,
    mirror: LocalMirror,
    options: SyncOptions,
    phase: watch::Sender<SyncPhase>,
}

impl SyncCoordinator {
    pub fn new(ctx: SyncContext, mirror: LocalMirror, options: SyncOptions) -> Self {
        let (phase, _) = watch::channel(SyncPhase::Uninitialized);
        Self {
            ctx,
            mirror,
            options,
            phase,
        }
    }

    pub fn context(&self) -> &SyncContext {
        &self.ctx
    }

    pub fn mirror(&self) -> &LocalMirror {
        &self.mirror
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    pub fn phase(&self) -> SyncPhase {
        *self.phase.borrow()
    }

    /// Receiver that observes every phase change.
    pub fn subscribe_phase(&self) -> watch::Receiver<SyncPhase> {
        self.phase.subscribe()
    }

    fn set_phase(&self, phase: SyncPhase) {
        self.phase.send_replace(phase);
    }

    /// Waits (bounded) for the remote store. Re-checked on every operation.
    async fn ensure_ready(&self) -> bool {
        self.set_phase(SyncPhase::AwaitingRemote);
        if self.ctx.gate.await_ready(self.options.ready_timeout).await {
            self.set_phase(SyncPhase::Ready);
            true
        } else {
            self.set_phase(SyncPhase::Degraded);
            false
        }
    }

    fn degrade(&self) {
        self.set_phase(SyncPhase::Degraded);
    }

    /// Writes the current application state to the local mirror. Failures
    /// are logged only.
    ///
    /// The state is copied out of the lock and written on the blocking pool.
    async fn write_through(&self) {
        let state = self.ctx.state.read().await.clone();
        let mirror = self.mirror.clone();

        match tokio::task::spawn_blocking(move || mirror.snapshot(&state)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!("Failed to write local mirror: {}", e),
            Err(e) => tracing::warn!("Local mirror write did not complete: {}", e),
        }
    }

    /// Saves `doc` as a new remote document.
    ///
    /// Returns `Ok(None)` when the remote store is not ready; the local
    /// mirror is written either way. On success the new id is recorded on
    /// the local document with the same logical id. A remote failure is returned after the
    /// local mirror has been written.
    pub async fn save(
        &self,
        collection: CollectionName,
        doc: &Document,
    ) -> Result<Option<DocId>, SyncError> {
        if !self.ensure_ready().await {
            tracing::warn!(
                "Remote not ready, saving {} to local mirror only",
                collection
            );
            self.write_through().await;
            return Ok(None);
        }

        match self.ctx.remote.add_document(collection, doc).await {
            Ok(doc_id) => {
                tracing::info!("Saved to {}: {}", collection, doc_id);
                if let Some(logical_id) = doc.logical_id() {
                    self.ctx
                        .state
                        .write()
                        .await
                        .assign_doc_id(collection, logical_id, doc_id.clone());
                }
                self.write_through().await;
                Ok(Some(doc_id))
            }
            Err(e) => {
                self.degrade();
                tracing::error!("Failed to save to {}: {}", collection, e);
                self.write_through().await;
                Err(SyncError::Remote(e))
            }
        }
    }

    /// Merges `doc` into the remote document whose `id` field equals
    /// `logical_id`.
    ///
    /// Returns `false` when the remote store is unavailable, when no
    /// document matches, or when the remote update fails.
    pub async fn update(
        &self,
        collection: CollectionName,
        logical_id: &Value,
        doc: &Document,
    ) -> bool {
        self.mutate(collection, logical_id, Mutation::Update(doc)).await
    }

    /// Deletes the remote document whose `id` field equals `logical_id`.
    ///
    /// Same outcomes as [`update`](Self::update).
    pub async fn delete(&self, collection: CollectionName, logical_id: &Value) -> bool {
        self.mutate(collection, logical_id, Mutation::Delete).await
    }

    async fn mutate(
        &self,
        collection: CollectionName,
        logical_id: &Value,
        mutation: Mutation<'_>,
    ) -> bool {
        if !self.ensure_ready().await {
            tracing::warn!(
                "Remote not ready, {} in {} kept in local mirror only",
                mutation.verb(),
                collection
            );
            self.write_through().await;
            return false;
        }

        let doc_id = match self.resolve(collection, logical_id).await {
            Ok(Some(doc_id)) => doc_id,
            Ok(None) => {
                tracing::debug!("No document with id {} in {}", logical_id, collection);
                return false;
            }
            Err(e) => {
                self.degrade();
                tracing::error!("Failed to look up {} in {}: {}", logical_id, collection, e);
                self.write_through().await;
                return false;
            }
        };

        let result = match mutation {
            Mutation::Update(doc) => {
                self.ctx
                    .remote
                    .update_document(collection, &doc_id, doc)
                    .await
            }
            Mutation::Delete => self.ctx.remote.delete_document(collection, &doc_id).await,
        };

        match result {
            Ok(()) => {
                tracing::info!("{} in {}: {}", mutation.verb(), collection, logical_id);
                self.write_through().await;
                true
            }
            Err(e) => {
                self.degrade();
                tracing::error!(
                    "Failed to {} {} in {}: {}",
                    mutation.verb(),
                    logical_id,
                    collection,
                    e
                );
                self.write_through().await;
                false
            }
        }
    }

    /// Maps a logical id to the remote document id. The first match wins.
    async fn resolve(
        &self,
        collection: CollectionName,
        logical_id: &Value,
    ) -> Result<Option<DocId>, RemoteError> {
        let matches = self
            .ctx
            .remote
            .get_documents_where(collection, LOGICAL_ID_FIELD, FilterOp::Equal, logical_id)
            .await?;

        if matches.len() > 1 {
            tracing::warn!(
                "{} documents in {} share id {}, using the first",
                matches.len(),
                collection,
                logical_id
            );
        }
        Ok(matches.into_iter().find_map(|doc| doc.doc_id))
    }

    /// Replaces the application state with the remote contents of all five
    /// collections.
    ///
    /// The collections are fetched concurrently and merged only if every
    /// fetch succeeds. When the remote store is unavailable or any fetch
    /// fails, the state is returned unchanged.
    pub async fn load_all(&self) -> ApplicationState {
        if !self.ensure_ready().await {
            tracing::warn!("Remote not ready, keeping local state");
            return self.ctx.state.read().await.clone();
        }

        let remote = &self.ctx.remote;
        let fetched = futures::try_join!(
            remote.get_all_documents(CollectionName::Institutions),
            remote.get_all_documents(CollectionName::Teachers),
            remote.get_all_documents(CollectionName::Students),
            remote.get_all_documents(CollectionName::Posts),
            remote.get_all_documents(CollectionName::Achievements),
        );

        let (institutions, teachers, students, posts, achievements) = match fetched {
            Ok(collections) => collections,
            Err(e) => {
                self.degrade();
                tracing::error!("Failed to load from remote, keeping local state: {}", e);
                return self.ctx.state.read().await.clone();
            }
        };

        let fresh = ApplicationState {
            institutions,
            teachers,
            students,
            posts,
            achievements,
        };

        let mut state = self.ctx.state.write().await;
        state.replace_all(fresh);
        for (name, count) in state.counts() {
            tracing::info!("Loaded {} {}", count, name);
        }
        state.clone()
    }

    /// Live listener on one collection using the configured interval.
    pub fn subscribe<F, E>(
        &self,
        collection: CollectionName,
        on_change: F,
        on_error: E,
    ) -> Subscription
    where
        F: FnMut(Vec<Document>) + Send + 'static,
        E: FnOnce(RemoteError) + Send + 'static,
    {
        self.ctx.remote.subscribe(
            collection,
            self.options.snapshot_interval,
            on_change,
            on_error,
        )
    }
}
