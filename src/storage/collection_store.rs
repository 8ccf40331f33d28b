//! CollectionStore trait definition.

use async_trait::async_trait;

use super::Result;
use crate::model::{Collection, CollectionId, CollectionStatus};

/// Interface for collection records.
///
/// Collections are never physically deleted; DELETED is a status.
/// Names are unique case-insensitively among collections that are not
/// DELETED.
#[async_trait]
pub trait CollectionStore: Send + Sync {
    /// Store a new collection.
    ///
    /// Fails with `StorageError::DuplicateName` if the name is taken.
    async fn create(&self, collection: &Collection) -> Result<()>;

    async fn get(&self, id: CollectionId) -> Result<Option<Collection>>;

    /// All collections, oldest first.
    async fn list(&self) -> Result<Vec<Collection>>;

    /// Collections with `status`, oldest first.
    async fn list_by_status(&self, status: CollectionStatus) -> Result<Vec<Collection>>;

    /// Move `id` from `expected` to `next`.
    ///
    /// Returns `false` without writing if the stored status is not
    /// `expected`, so of two concurrent transitions at most one succeeds.
    async fn compare_and_set_status(
        &self,
        id: CollectionId,
        expected: CollectionStatus,
        next: CollectionStatus,
    ) -> Result<bool>;

    /// Overwrite name, type, publish date and release link, provided the
    /// stored status still equals `collection.status`.
    ///
    /// Returns `false` if the status changed underneath; fails with
    /// `StorageError::DuplicateName` if the new name is taken.
    async fn update_details(&self, collection: &Collection) -> Result<bool>;
}
