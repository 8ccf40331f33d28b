//! Publish Transaction Coordinator.
//!
//! Applies a collection's manifest to the live tree:
//!
//! 1. Load the persisted manifest, or build and persist a new one
//! 2. Apply operations in order from the first unconfirmed one, recording
//!    progress after each
//! 3. On success release all claims, mark PUBLISHED and drop the manifest
//! 4. On failure stop, mark ERRORED and keep claims and manifest for manual
//!    resolution
//!
//! Each operation is retried for transient errors within the configured
//! budget. Operations are idempotent on resume: a DELETE whose target is
//! already gone, or a MOVE whose source is gone and destination present,
//! counts as applied.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tracing::{error, info, info_span, warn, Instrument};

use crate::error::{EngineError, Result};
use crate::interfaces::{ContentError, ContentStore, Notifier};
use crate::model::{
    uri_from_live_path, CollectionId, CollectionStatus, EventType, FileOperation, OperationKind,
    PersistedManifest, WorkflowAction, SYSTEM_ACTOR,
};
use crate::services::{AuditLog, ContentLocks, ManifestBuilder};
use crate::storage::{CollectionStore, ManifestStore};
use crate::utils::retry::{run_with_retry, RetryPolicy};

/// Outcome of a successful publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub collection_id: CollectionId,
    /// Operations in the manifest.
    pub operations: usize,
    /// Operations applied by this call (excludes those confirmed before a
    /// resume).
    pub applied: usize,
    pub resumed: bool,
    pub claims_released: usize,
}

/// Collections being published by this process.
#[derive(Default)]
struct InFlight(Mutex<HashSet<CollectionId>>);

struct InFlightGuard {
    in_flight: Arc<InFlight>,
    collection_id: CollectionId,
}

impl InFlight {
    fn enter(self: &Arc<Self>, collection_id: CollectionId) -> Option<InFlightGuard> {
        let mut set = self.0.lock().unwrap_or_else(|e| e.into_inner());
        set.insert(collection_id).then(|| InFlightGuard {
            in_flight: self.clone(),
            collection_id,
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut set = self.in_flight.0.lock().unwrap_or_else(|e| e.into_inner());
        set.remove(&self.collection_id);
    }
}

pub struct Publisher {
    collections: Arc<dyn CollectionStore>,
    locks: ContentLocks,
    manifests: Arc<dyn ManifestStore>,
    builder: ManifestBuilder,
    content: Arc<dyn ContentStore>,
    notifier: Arc<dyn Notifier>,
    audit: AuditLog,
    policy: RetryPolicy,
    in_flight: Arc<InFlight>,
}

impl Publisher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        collections: Arc<dyn CollectionStore>,
        locks: ContentLocks,
        manifests: Arc<dyn ManifestStore>,
        builder: ManifestBuilder,
        content: Arc<dyn ContentStore>,
        notifier: Arc<dyn Notifier>,
        audit: AuditLog,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            collections,
            locks,
            manifests,
            builder,
            content,
            notifier,
            audit,
            policy,
            in_flight: Arc::new(InFlight::default()),
        }
    }

    /// Publish a QUEUED_FOR_PUBLISH collection.
    ///
    /// Fails with `PublishFailure` when an operation fails past its retry
    /// budget; the collection is then ERRORED. A storage error while
    /// recording progress leaves the collection QUEUED_FOR_PUBLISH so a later
    /// call resumes it.
    pub async fn publish(&self, collection_id: CollectionId) -> Result<PublishReport> {
        let _guard = self
            .in_flight
            .enter(collection_id)
            .ok_or(EngineError::PublishInProgress {
                collection: collection_id,
            })?;

        let collection = self
            .collections
            .get(collection_id)
            .await?
            .ok_or_else(|| EngineError::collection_not_found(collection_id))?;
        if collection.status != CollectionStatus::QueuedForPublish {
            return Err(EngineError::invalid_transition(
                collection_id,
                collection.status,
                WorkflowAction::CompletePublish,
            ));
        }

        let (persisted, resumed) = match self.manifests.load(collection_id).await? {
            Some(persisted) => (persisted, true),
            None => {
                let manifest = self.builder.build(collection_id).await?;
                let persisted = PersistedManifest::new(collection_id, manifest);
                self.manifests.save(&persisted).await?;
                (persisted, false)
            }
        };

        let total = persisted.manifest.len();
        let detail = if resumed {
            format!("resumed at operation {} of {total}", persisted.applied + 1)
        } else {
            format!("{total} operations")
        };
        info!(collection = %collection_id, operations = total, resumed, "Publish started");
        self.audit
            .emit(collection_id, EventType::PublishStarted, SYSTEM_ACTOR, Some(detail))
            .await;

        let mut applied = 0;
        for (index, operation) in persisted.manifest.operations.iter().enumerate() {
            if index < persisted.applied {
                continue;
            }
            let label = operation.to_string();
            let result = run_with_retry(&label, &self.policy, || self.apply(operation)).await;
            if let Err(e) = result {
                return Err(self.fail(collection_id, index, operation, e).await);
            }
            self.manifests.mark_applied(collection_id, index + 1).await?;
            applied += 1;
        }

        let claims_released = self.locks.release(collection_id).await?;
        let completed = self
            .collections
            .compare_and_set_status(
                collection_id,
                CollectionStatus::QueuedForPublish,
                CollectionStatus::Published,
            )
            .await?;
        if !completed {
            let now = self
                .collections
                .get(collection_id)
                .await?
                .map_or(CollectionStatus::QueuedForPublish, |c| c.status);
            return Err(EngineError::invalid_transition(
                collection_id,
                now,
                WorkflowAction::CompletePublish,
            ));
        }
        if let Err(e) = self.manifests.remove(collection_id).await {
            warn!(collection = %collection_id, error = %e, "Failed to drop published manifest");
        }

        info!(collection = %collection_id, operations = total, "Publish completed");
        self.audit
            .emit(
                collection_id,
                EventType::PublishCompleted,
                SYSTEM_ACTOR,
                Some(format!("{total} operations")),
            )
            .await;

        self.notify(collection_id, persisted.manifest.operations);

        Ok(PublishReport {
            collection_id,
            operations: total,
            applied,
            resumed,
            claims_released,
        })
    }

    /// Publish every QUEUED_FOR_PUBLISH collection, oldest first. Collections
    /// with a persisted manifest resume where they stopped.
    pub async fn publish_queued(&self) -> Result<Vec<(CollectionId, Result<PublishReport>)>> {
        let queued = self
            .collections
            .list_by_status(CollectionStatus::QueuedForPublish)
            .await?;

        let mut results = Vec::with_capacity(queued.len());
        for collection in queued {
            let result = self.publish(collection.id).await;
            if let Err(e) = &result {
                if !matches!(e, EngineError::PublishFailure { .. }) {
                    warn!(collection = %collection.id, error = %e, "Publish did not run");
                }
            }
            results.push((collection.id, result));
        }
        Ok(results)
    }

    /// Apply one operation once.
    async fn apply(&self, operation: &FileOperation) -> std::result::Result<(), ContentError> {
        let destination = operation.destination.as_str();
        match (operation.kind, operation.source.as_deref()) {
            (OperationKind::Copy, Some(source)) => {
                self.content.copy_to_live(source, destination).await
            }
            (OperationKind::Move, Some(source)) => {
                match self.content.move_in_live(source, destination).await {
                    Err(e @ (ContentError::NotFound(_) | ContentError::Conflict(_))) => {
                        let already_moved = !self.content.exists(source).await?
                            && self.content.exists(destination).await?;
                        if already_moved {
                            Ok(())
                        } else {
                            Err(e)
                        }
                    }
                    other => other,
                }
            }
            (OperationKind::Delete, _) => match self.content.delete_from_live(destination).await {
                Err(ContentError::NotFound(_)) => Ok(()),
                other => other,
            },
            (kind, None) => Err(ContentError::InvalidPath(format!(
                "{} without source: {destination}",
                kind.as_str()
            ))),
        }
    }

    /// Record the failure and move the collection to ERRORED. Claims and the
    /// persisted manifest stay in place.
    async fn fail(
        &self,
        collection_id: CollectionId,
        index: usize,
        operation: &FileOperation,
        cause: ContentError,
    ) -> EngineError {
        let detail = format!("{operation}: {cause}");
        error!(
            collection = %collection_id,
            operation = index,
            error = %cause,
            "Publish failed"
        );
        self.audit
            .emit(
                collection_id,
                EventType::PublishFailed,
                SYSTEM_ACTOR,
                Some(format!("operation {}: {detail}", index + 1)),
            )
            .await;

        match self
            .collections
            .compare_and_set_status(
                collection_id,
                CollectionStatus::QueuedForPublish,
                CollectionStatus::Errored,
            )
            .await
        {
            Ok(true) => {}
            Ok(false) => warn!(
                collection = %collection_id,
                "Collection left QUEUED_FOR_PUBLISH before it could be marked ERRORED"
            ),
            Err(e) => error!(
                collection = %collection_id,
                error = %e,
                "Failed to mark collection ERRORED"
            ),
        }

        EngineError::PublishFailure {
            collection: collection_id,
            operation: index,
            detail,
        }
    }

    /// Fire-and-forget downstream signals for the published operations.
    fn notify(&self, collection_id: CollectionId, operations: Vec<FileOperation>) {
        let notifier = self.notifier.clone();
        let task = async move {
            for operation in operations {
                let destination = uri_from_live_path(&operation.destination);
                let (published, deleted) = match operation.kind {
                    OperationKind::Copy => (destination, None),
                    OperationKind::Move => (
                        destination,
                        operation.source.as_deref().and_then(uri_from_live_path),
                    ),
                    OperationKind::Delete => (None, destination),
                };

                if let Some(uri) = published {
                    if let Err(e) = notifier.on_content_published(&uri, collection_id).await {
                        warn!(uri = %uri, error = %e, "Publish notification failed");
                    }
                }
                if let Some(uri) = deleted {
                    if let Err(e) = notifier.on_content_deleted(&uri, collection_id).await {
                        warn!(uri = %uri, error = %e, "Delete notification failed");
                    }
                }
            }
        };
        tokio::spawn(task.instrument(info_span!("notify", collection = %collection_id)));
    }
}
