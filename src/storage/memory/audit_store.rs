//! In-memory AuditStore.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::model::{CollectionEvent, CollectionId, EventType};
use crate::storage::{AuditStore, Result, StorageError};

/// In-memory audit log; insertion order is the tie-breaker.
#[derive(Default)]
pub struct InMemoryAuditStore {
    events: RwLock<Vec<CollectionEvent>>,
    fail_on_append: RwLock<bool>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail_on_append(&self, fail: bool) {
        *self.fail_on_append.write().await = fail;
    }

    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn append(&self, event: &CollectionEvent) -> Result<()> {
        if *self.fail_on_append.read().await {
            return Err(StorageError::Unavailable("audit append disabled".to_string()));
        }
        self.events.write().await.push(event.clone());
        Ok(())
    }

    async fn history(&self, collection_id: CollectionId) -> Result<Vec<CollectionEvent>> {
        let events = self.events.read().await;
        let mut history: Vec<CollectionEvent> = events
            .iter()
            .filter(|e| e.collection_id == collection_id)
            .cloned()
            .collect();
        // Stable sort keeps insertion order for equal timestamps.
        history.sort_by_key(|e| e.timestamp);
        Ok(history)
    }

    async fn most_recent_of_type(
        &self,
        event_type: EventType,
        collection_id: Option<CollectionId>,
    ) -> Result<Option<CollectionEvent>> {
        let events = self.events.read().await;
        Ok(events
            .iter()
            .enumerate()
            .filter(|(_, e)| e.event_type == event_type)
            .filter(|(_, e)| collection_id.map_or(true, |id| e.collection_id == id))
            .max_by_key(|(position, e)| (e.timestamp, *position))
            .map(|(_, e)| e.clone()))
    }
}
