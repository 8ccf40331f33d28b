//! ManifestStore trait definition.

use async_trait::async_trait;

use super::Result;
use crate::model::{CollectionId, PersistedManifest};

/// Per-collection cache of the manifest being published.
///
/// Not authoritative: a manifest can always be rebuilt from the collection's
/// claims. It is persisted before the first operation is applied so that a
/// restarted coordinator resumes the same plan from the first unconfirmed
/// operation.
#[async_trait]
pub trait ManifestStore: Send + Sync {
    /// Store (or replace) a collection's manifest and progress.
    async fn save(&self, manifest: &PersistedManifest) -> Result<()>;

    async fn load(&self, collection_id: CollectionId) -> Result<Option<PersistedManifest>>;

    /// Record that operations `[0, applied)` are confirmed.
    async fn mark_applied(&self, collection_id: CollectionId, applied: usize) -> Result<()>;

    async fn remove(&self, collection_id: CollectionId) -> Result<()>;
}
