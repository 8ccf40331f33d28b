//! Content Lock Table.
//!
//! Translates claim outcomes from the storage layer into engine errors. The
//! check-and-set itself happens inside [`LockTable::claim`].

use std::sync::Arc;

use tracing::debug;

use crate::error::{EngineError, Result};
use crate::model::{ClaimDecision, CollectionId, ContentItem, ContentUri, WorkflowAction};
use crate::storage::{ClaimOutcome, LockTable};

#[derive(Clone)]
pub struct ContentLocks {
    table: Arc<dyn LockTable>,
}

impl ContentLocks {
    pub fn new(table: Arc<dyn LockTable>) -> Self {
        Self { table }
    }

    /// Claim `uri` for editing.
    ///
    /// Re-claiming a URI this collection already edits returns
    /// `ClaimDecision::Unchanged`.
    pub async fn acquire_edit_claim(
        &self,
        collection_id: CollectionId,
        uri: &ContentUri,
    ) -> Result<ClaimDecision> {
        let request = ContentItem::editing(collection_id, uri.clone());
        self.claim_one(request).await
    }

    /// Claim `uri` for deletion.
    ///
    /// Fails with `ALREADY_MARKED_BY_THIS_COLLECTION` on a duplicate delete.
    /// An edit claim held by the same collection becomes a delete claim.
    pub async fn acquire_delete_claim(
        &self,
        collection_id: CollectionId,
        uri: &ContentUri,
    ) -> Result<ClaimDecision> {
        let request = ContentItem::pending_delete(collection_id, uri.clone());
        self.claim_one(request).await
    }

    /// Claim `from` for deletion and `to` for editing as one move, all or
    /// nothing.
    pub async fn acquire_move_claim(
        &self,
        collection_id: CollectionId,
        from: &ContentUri,
        to: &ContentUri,
    ) -> Result<Vec<ClaimDecision>> {
        let requests = [
            ContentItem::pending_delete(collection_id, from.clone()),
            ContentItem {
                moved_from: Some(from.clone()),
                ..ContentItem::editing(collection_id, to.clone())
            },
        ];
        self.claim(collection_id, &requests).await
    }

    async fn claim_one(&self, request: ContentItem) -> Result<ClaimDecision> {
        let collection_id = request.collection_id;
        let mut decisions = self.claim(collection_id, &[request]).await?;
        decisions
            .pop()
            .ok_or_else(|| EngineError::Validation("empty claim result".to_string()))
    }

    async fn claim(
        &self,
        collection_id: CollectionId,
        requests: &[ContentItem],
    ) -> Result<Vec<ClaimDecision>> {
        match self.table.claim(requests).await? {
            ClaimOutcome::Applied(decisions) => Ok(decisions),
            ClaimOutcome::Blocked { uri, reason } => {
                debug!(collection = %collection_id, uri = %uri, reason = %reason, "Claim blocked");
                Err(EngineError::LockConflict { uri, reason })
            }
            ClaimOutcome::NotEditable(status) => Err(EngineError::invalid_transition(
                collection_id,
                status,
                WorkflowAction::EditContent,
            )),
            ClaimOutcome::CollectionNotFound => Err(EngineError::collection_not_found(collection_id)),
        }
    }

    /// Release every claim the collection holds. Safe to call repeatedly.
    pub async fn release(&self, collection_id: CollectionId) -> Result<usize> {
        let released = self.table.release(collection_id).await?;
        if released > 0 {
            debug!(collection = %collection_id, released, "Claims released");
        }
        Ok(released)
    }

    /// Drop single URIs from the collection: membership and claim together.
    /// Safe to call repeatedly.
    pub async fn release_uris(
        &self,
        collection_id: CollectionId,
        uris: &[ContentUri],
    ) -> Result<usize> {
        Ok(self.table.remove(collection_id, uris).await?)
    }

    pub async fn holder_of(&self, uri: &ContentUri) -> Result<Option<ContentItem>> {
        Ok(self.table.holder_of(uri).await?)
    }

    /// Claims currently held by the collection, ordered by URI.
    pub async fn held_by(&self, collection_id: CollectionId) -> Result<Vec<ContentItem>> {
        Ok(self.table.held_by(collection_id).await?)
    }

    /// Membership of the collection, including released claims.
    pub async fn items_of(&self, collection_id: CollectionId) -> Result<Vec<ContentItem>> {
        Ok(self.table.items_of(collection_id).await?)
    }
}
