//! Downstream notification interface (search indexing, caches).

use async_trait::async_trait;

use crate::model::{CollectionId, ContentUri};

/// Errors raised by notification delivery. Never fail a publish.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Notification channel closed")]
    Closed,

    #[error("Notification delivery failed: {0}")]
    Delivery(String),
}

/// Fire-and-forget signals emitted after a collection is published.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn on_content_published(
        &self,
        uri: &ContentUri,
        collection_id: CollectionId,
    ) -> Result<(), NotifyError>;

    async fn on_content_deleted(
        &self,
        uri: &ContentUri,
        collection_id: CollectionId,
    ) -> Result<(), NotifyError>;
}
