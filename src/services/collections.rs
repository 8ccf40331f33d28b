//! Collection Store operations.
//!
//! Collection records plus the content membership they own. Every membership
//! change goes through [`ContentLocks`], so a claim and the collection's
//! membership entry change together.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{EngineError, NotFound, Result};
use crate::interfaces::{ContentError, ContentStore};
use crate::model::{
    live_path, workspace_path, ClaimDecision, ClaimKind, Collection, CollectionId,
    CollectionStatus, CollectionUpdate, ContentItem, ContentUri, EventType, NewCollection,
    WorkflowAction,
};
use crate::services::{AuditLog, ContentLocks};
use crate::storage::{CollectionStore, StorageError};

#[derive(Clone)]
pub struct CollectionService {
    store: Arc<dyn CollectionStore>,
    locks: ContentLocks,
    content: Arc<dyn ContentStore>,
    audit: AuditLog,
}

impl CollectionService {
    pub fn new(
        store: Arc<dyn CollectionStore>,
        locks: ContentLocks,
        content: Arc<dyn ContentStore>,
        audit: AuditLog,
    ) -> Self {
        Self {
            store,
            locks,
            content,
            audit,
        }
    }

    pub async fn create(&self, request: NewCollection, actor: &str) -> Result<Collection> {
        let collection = request.into_collection().map_err(EngineError::Validation)?;
        self.store
            .create(&collection)
            .await
            .map_err(duplicate_name_or_storage)?;

        info!(collection = %collection.id, name = %collection.name, "Collection created");
        self.audit
            .emit(collection.id, EventType::Created, actor, Some(collection.name.clone()))
            .await;
        Ok(collection)
    }

    /// Fails with `NotFound` if `id` is unknown.
    pub async fn get(&self, id: CollectionId) -> Result<Collection> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| EngineError::collection_not_found(id))
    }

    pub async fn list(&self) -> Result<Vec<Collection>> {
        Ok(self.store.list().await?)
    }

    pub async fn list_by_status(&self, status: CollectionStatus) -> Result<Vec<Collection>> {
        Ok(self.store.list_by_status(status).await?)
    }

    /// Change name, type, publish date or release link while CREATED or
    /// APPROVED.
    pub async fn update(
        &self,
        id: CollectionId,
        update: CollectionUpdate,
        actor: &str,
    ) -> Result<Collection> {
        let current = self.get(id).await?;
        if current.status.apply(WorkflowAction::Update).is_none() {
            return Err(EngineError::invalid_transition(
                id,
                current.status,
                WorkflowAction::Update,
            ));
        }

        let updated = update.apply_to(&current).map_err(EngineError::Validation)?;
        let applied = self
            .store
            .update_details(&updated)
            .await
            .map_err(duplicate_name_or_storage)?;
        if !applied {
            let now = self.get(id).await?;
            return Err(EngineError::invalid_transition(
                id,
                now.status,
                WorkflowAction::Update,
            ));
        }

        self.audit
            .emit(id, EventType::Updated, actor, Some(updated.name.clone()))
            .await;
        Ok(updated)
    }

    /// Claim `uri` for editing and store `bytes` in the collection's
    /// workspace.
    pub async fn add_content(
        &self,
        id: CollectionId,
        uri: &ContentUri,
        bytes: &[u8],
        actor: &str,
    ) -> Result<ClaimDecision> {
        let decision = self.locks.acquire_edit_claim(id, uri).await?;

        if let Err(e) = self.content.write_to_workspace(id, uri, bytes).await {
            if decision == ClaimDecision::Insert {
                self.locks.release_uris(id, std::slice::from_ref(uri)).await?;
            }
            return Err(e.into());
        }

        self.audit
            .emit(id, EventType::ContentAdded, actor, Some(uri.to_string()))
            .await;
        Ok(decision)
    }

    /// Claim `uri` for deletion on publish. A pending edit of the same URI by
    /// this collection is discarded.
    pub async fn mark_for_delete(
        &self,
        id: CollectionId,
        uri: &ContentUri,
        actor: &str,
    ) -> Result<ClaimDecision> {
        let decision = self.locks.acquire_delete_claim(id, uri).await?;
        if decision == ClaimDecision::Replace {
            self.discard_workspace(id, uri).await;
        }

        self.audit
            .emit(
                id,
                EventType::ContentMarkedForDelete,
                actor,
                Some(uri.to_string()),
            )
            .await;
        Ok(decision)
    }

    /// Move published content from `from` to `to` on publish.
    ///
    /// `from` must exist in the live tree and `to` must not. Both URIs are
    /// claimed in one step.
    pub async fn move_content(
        &self,
        id: CollectionId,
        from: &ContentUri,
        to: &ContentUri,
        actor: &str,
    ) -> Result<()> {
        if from == to {
            return Err(EngineError::Validation(format!(
                "cannot move {from} onto itself"
            )));
        }
        match self.content.read_version(from).await {
            Ok(_) => {}
            Err(ContentError::NotFound(_)) => {
                return Err(EngineError::NotFound(NotFound::Content {
                    collection: id,
                    uri: from.clone(),
                }))
            }
            Err(e) => return Err(e.into()),
        }
        if self.content.exists(&live_path(to)).await? {
            return Err(EngineError::Validation(format!(
                "cannot move {from} onto existing content {to}"
            )));
        }

        let decisions = self.locks.acquire_move_claim(id, from, to).await?;
        if decisions.first() == Some(&ClaimDecision::Replace) {
            self.discard_workspace(id, from).await;
        }

        self.audit
            .emit(
                id,
                EventType::ContentMoved,
                actor,
                Some(format!("{from} -> {to}")),
            )
            .await;
        Ok(())
    }

    /// Drop `uri` from the collection, releasing its claim. Removing either
    /// end of a move removes the whole move.
    pub async fn remove_content(
        &self,
        id: CollectionId,
        uri: &ContentUri,
        actor: &str,
    ) -> Result<()> {
        let collection = self.get(id).await?;
        if collection.status.apply(WorkflowAction::EditContent).is_none() {
            return Err(EngineError::invalid_transition(
                id,
                collection.status,
                WorkflowAction::EditContent,
            ));
        }

        let held = self.locks.held_by(id).await?;
        let Some(item) = held.iter().find(|i| &i.uri == uri) else {
            return Err(EngineError::NotFound(NotFound::Content {
                collection: id,
                uri: uri.clone(),
            }));
        };

        let mut uris = vec![uri.clone()];
        if let Some(from) = &item.moved_from {
            uris.push(from.clone());
        }
        uris.extend(
            held.iter()
                .filter(|i| i.moved_from.as_ref() == Some(uri))
                .map(|i| i.uri.clone()),
        );

        for u in &uris {
            self.discard_workspace(id, u).await;
        }
        self.locks.release_uris(id, &uris).await?;

        self.audit
            .emit(id, EventType::ContentRemoved, actor, Some(uri.to_string()))
            .await;
        Ok(())
    }

    /// Membership of the collection, including claims released on publish.
    pub async fn items(&self, id: CollectionId) -> Result<Vec<ContentItem>> {
        self.get(id).await?;
        self.locks.items_of(id).await
    }

    /// The collection's view of `uri`: its workspace copy if it has one,
    /// otherwise the live version (for a move destination, the live version
    /// of the move source).
    pub async fn read_content(&self, id: CollectionId, uri: &ContentUri) -> Result<Vec<u8>> {
        self.get(id).await?;
        let held = self.locks.held_by(id).await?;
        let item = held.iter().find(|i| &i.uri == uri);

        if let Some(item) = item {
            if item.kind == ClaimKind::PendingDelete {
                return Err(EngineError::NotFound(NotFound::Content {
                    collection: id,
                    uri: uri.clone(),
                }));
            }
            let workspace = workspace_path(id, uri);
            match self.content.read(&workspace).await {
                Ok(bytes) => return Ok(bytes),
                Err(ContentError::NotFound(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }

        let source = item.and_then(|i| i.moved_from.as_ref()).unwrap_or(uri);
        self.content.read_version(source).await.map_err(|e| match e {
            ContentError::NotFound(_) => EngineError::NotFound(NotFound::Content {
                collection: id,
                uri: uri.clone(),
            }),
            other => other.into(),
        })
    }

    async fn discard_workspace(&self, id: CollectionId, uri: &ContentUri) {
        if let Err(e) = self.content.discard_from_workspace(id, uri).await {
            warn!(collection = %id, uri = %uri, error = %e, "Failed to discard workspace copy");
        }
    }
}

fn duplicate_name_or_storage(e: StorageError) -> EngineError {
    match e {
        StorageError::DuplicateName(name) => EngineError::DuplicateName { name },
        other => other.into(),
    }
}
