//! Permissions interface.

use async_trait::async_trait;

use crate::model::CollectionId;

/// Capability checks delegated to the platform's role system.
#[async_trait]
pub trait Permissions: Send + Sync {
    async fn can_approve(&self, actor: &str, collection_id: CollectionId) -> bool;

    async fn can_publish(&self, actor: &str, collection_id: CollectionId) -> bool;
}
