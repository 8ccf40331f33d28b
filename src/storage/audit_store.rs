//! AuditStore trait definition.

use async_trait::async_trait;

use super::Result;
use crate::model::{CollectionEvent, CollectionId, EventType};

/// Append-only store of collection lifecycle events.
///
/// Events are returned ordered by timestamp, ties broken by insertion order.
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append(&self, event: &CollectionEvent) -> Result<()>;

    async fn history(&self, collection_id: CollectionId) -> Result<Vec<CollectionEvent>>;

    /// Latest event of `event_type`, across all collections or within one.
    async fn most_recent_of_type(
        &self,
        event_type: EventType,
        collection_id: Option<CollectionId>,
    ) -> Result<Option<CollectionEvent>>;
}
