//! Workflow State Machine.
//!
//! Every transition is a compare-and-set on the status it was validated
//! against, so of two concurrent requests for the same step at most one
//! succeeds; the loser sees `InvalidTransition` from the new status.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::error::{EngineError, Result};
use crate::interfaces::Permissions;
use crate::model::{
    decide_claim, ClaimDecision, Collection, CollectionId, CollectionStatus, EventType,
    WorkflowAction, SYSTEM_ACTOR,
};
use crate::services::{AuditLog, ContentLocks};
use crate::storage::{CollectionStore, ManifestStore};

/// How to leave ERRORED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Publish again, resuming from the first unconfirmed operation.
    Retry,
    /// Give up: soft-delete the collection and release its claims.
    Abandon,
}

#[derive(Clone)]
pub struct Workflow {
    collections: Arc<dyn CollectionStore>,
    locks: ContentLocks,
    manifests: Arc<dyn ManifestStore>,
    permissions: Arc<dyn Permissions>,
    audit: AuditLog,
}

impl Workflow {
    pub fn new(
        collections: Arc<dyn CollectionStore>,
        locks: ContentLocks,
        manifests: Arc<dyn ManifestStore>,
        permissions: Arc<dyn Permissions>,
        audit: AuditLog,
    ) -> Self {
        Self {
            collections,
            locks,
            manifests,
            permissions,
            audit,
        }
    }

    async fn load(&self, id: CollectionId) -> Result<Collection> {
        self.collections
            .get(id)
            .await?
            .ok_or_else(|| EngineError::collection_not_found(id))
    }

    /// Validate `action` against the stored status and apply it atomically.
    pub(crate) async fn transition(
        &self,
        id: CollectionId,
        action: WorkflowAction,
    ) -> Result<(CollectionStatus, CollectionStatus)> {
        let current = self.load(id).await?.status;
        let next = current
            .apply(action)
            .ok_or_else(|| EngineError::invalid_transition(id, current, action))?;

        if current != next
            && !self
                .collections
                .compare_and_set_status(id, current, next)
                .await?
        {
            let now = self.load(id).await?.status;
            debug!(
                collection = %id,
                %action,
                expected = %current,
                actual = %now,
                "Lost status race"
            );
            return Err(EngineError::invalid_transition(id, now, action));
        }

        Ok((current, next))
    }

    async fn require_approver(
        &self,
        id: CollectionId,
        actor: &str,
        action: WorkflowAction,
    ) -> Result<()> {
        if self.permissions.can_approve(actor, id).await {
            Ok(())
        } else {
            Err(EngineError::PermissionDenied {
                actor: actor.to_string(),
                action,
            })
        }
    }

    async fn require_publisher(
        &self,
        id: CollectionId,
        actor: &str,
        action: WorkflowAction,
    ) -> Result<()> {
        if self.permissions.can_publish(actor, id).await {
            Ok(())
        } else {
            Err(EngineError::PermissionDenied {
                actor: actor.to_string(),
                action,
            })
        }
    }

    /// Record a review of a CREATED collection.
    pub async fn review(&self, id: CollectionId, actor: &str, note: Option<String>) -> Result<()> {
        self.require_approver(id, actor, WorkflowAction::Review).await?;
        self.transition(id, WorkflowAction::Review).await?;
        self.audit.emit(id, EventType::Reviewed, actor, note).await;
        Ok(())
    }

    /// CREATED → APPROVED.
    ///
    /// Re-checks that every claim the collection holds is still its own
    /// before changing status.
    pub async fn approve(&self, id: CollectionId, actor: &str) -> Result<()> {
        self.require_approver(id, actor, WorkflowAction::Approve).await?;

        let collection = self.load(id).await?;
        if collection.status.apply(WorkflowAction::Approve).is_none() {
            return Err(EngineError::invalid_transition(
                id,
                collection.status,
                WorkflowAction::Approve,
            ));
        }
        for item in self.locks.held_by(id).await? {
            let holder = self.locks.holder_of(&item.uri).await?;
            if let Some(holder) = holder.filter(|h| h.collection_id != id) {
                if let ClaimDecision::Block(reason) = decide_claim(Some(&holder), &item) {
                    return Err(EngineError::LockConflict {
                        uri: item.uri,
                        reason,
                    });
                }
            }
        }

        self.transition(id, WorkflowAction::Approve).await?;
        info!(collection = %id, actor, "Collection approved");
        self.audit.emit(id, EventType::Approved, actor, None).await;
        Ok(())
    }

    /// APPROVED → CREATED, reopening the collection for content changes.
    pub async fn reopen(&self, id: CollectionId, actor: &str) -> Result<()> {
        self.require_approver(id, actor, WorkflowAction::Reopen).await?;
        self.transition(id, WorkflowAction::Reopen).await?;
        self.audit.emit(id, EventType::Reopened, actor, None).await;
        Ok(())
    }

    /// Manual publish trigger: APPROVED → QUEUED_FOR_PUBLISH.
    pub async fn queue_for_publish(&self, id: CollectionId, actor: &str) -> Result<()> {
        self.require_publisher(id, actor, WorkflowAction::Queue).await?;
        self.transition(id, WorkflowAction::Queue).await?;
        info!(collection = %id, actor, "Collection queued for publish");
        self.audit
            .emit(id, EventType::QueuedForPublish, actor, Some("manual".to_string()))
            .await;
        Ok(())
    }

    /// Queue every APPROVED scheduled collection whose publish date has
    /// passed. Returns the collections queued by this call.
    pub async fn queue_due(&self, now: DateTime<Utc>) -> Result<Vec<CollectionId>> {
        let approved = self
            .collections
            .list_by_status(CollectionStatus::Approved)
            .await?;

        let mut queued = Vec::new();
        for collection in approved.into_iter().filter(|c| c.is_due(now)) {
            let id = collection.id;
            let won = self
                .collections
                .compare_and_set_status(
                    id,
                    CollectionStatus::Approved,
                    CollectionStatus::QueuedForPublish,
                )
                .await?;
            if !won {
                continue;
            }
            info!(collection = %id, "Scheduled collection queued for publish");
            let detail = collection
                .publish_date
                .map(|date| format!("scheduled for {}", date.to_rfc3339()));
            self.audit
                .emit(id, EventType::QueuedForPublish, SYSTEM_ACTOR, detail)
                .await;
            queued.push(id);
        }
        Ok(queued)
    }

    /// Soft-delete a CREATED or APPROVED collection, releasing its claims.
    ///
    /// On a DELETED collection that still holds claims (an earlier delete or
    /// abandon failed to release them) the release is run again.
    pub async fn delete(&self, id: CollectionId, actor: &str) -> Result<()> {
        let collection = self.load(id).await?;
        if collection.status == CollectionStatus::Deleted
            && !self.locks.held_by(id).await?.is_empty()
        {
            let released = self.locks.release(id).await?;
            self.manifests.remove(id).await?;
            warn!(
                collection = %id,
                actor,
                released,
                "Released claims left by an interrupted delete"
            );
            return Ok(());
        }

        self.transition(id, WorkflowAction::Delete).await?;
        self.locks.release(id).await?;
        info!(collection = %id, actor, "Collection deleted");
        self.audit.emit(id, EventType::Deleted, actor, None).await;
        Ok(())
    }

    /// Manually resolve an ERRORED collection.
    pub async fn resolve(
        &self,
        id: CollectionId,
        actor: &str,
        resolution: Resolution,
    ) -> Result<()> {
        let action = match resolution {
            Resolution::Retry => WorkflowAction::Retry,
            Resolution::Abandon => WorkflowAction::Abandon,
        };
        self.require_publisher(id, actor, action).await?;
        self.transition(id, action).await?;

        match resolution {
            Resolution::Retry => {
                info!(collection = %id, actor, "Publish retry requested");
                self.audit.emit(id, EventType::PublishRetried, actor, None).await;
            }
            Resolution::Abandon => {
                self.locks.release(id).await?;
                self.manifests.remove(id).await?;
                info!(collection = %id, actor, "Failed publish abandoned");
                self.audit
                    .emit(
                        id,
                        EventType::Deleted,
                        actor,
                        Some("abandoned after failed publish".to_string()),
                    )
                    .await;
            }
        }
        Ok(())
    }
}
