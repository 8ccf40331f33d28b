//! Audit Log.
//!
//! Best-effort recorder of collection lifecycle events. Recording never fails
//! the calling workflow step: persistence errors are logged and swallowed.

use std::sync::Arc;

use tracing::error;

use crate::error::Result;
use crate::model::{CollectionEvent, CollectionId, EventType};
use crate::storage::AuditStore;

/// Injected audit recorder. Cheap to clone.
#[derive(Clone)]
pub struct AuditLog {
    store: Arc<dyn AuditStore>,
}

impl AuditLog {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }

    /// Append an event. Failures are logged, never returned.
    pub async fn record(&self, event: CollectionEvent) {
        if let Err(e) = self.store.append(&event).await {
            error!(
                collection = %event.collection_id,
                event_type = %event.event_type,
                actor = %event.actor_email,
                error = %e,
                "Failed to record audit event"
            );
        }
    }

    pub(crate) async fn emit(
        &self,
        collection_id: CollectionId,
        event_type: EventType,
        actor: &str,
        detail: Option<String>,
    ) {
        let mut event = CollectionEvent::new(collection_id, event_type, actor);
        event.detail = detail;
        self.record(event).await;
    }

    /// Events of one collection in chronological order.
    pub async fn history(&self, collection_id: CollectionId) -> Result<Vec<CollectionEvent>> {
        Ok(self.store.history(collection_id).await?)
    }

    /// Latest event of `event_type`, optionally within one collection.
    pub async fn most_recent_event_of_type(
        &self,
        event_type: EventType,
        collection_id: Option<CollectionId>,
    ) -> Result<Option<CollectionEvent>> {
        Ok(self
            .store
            .most_recent_of_type(event_type, collection_id)
            .await?)
    }
}
