//! In-memory ManifestStore.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::model::{CollectionId, PersistedManifest};
use crate::storage::{ManifestStore, Result, StorageError};

#[derive(Default)]
pub struct InMemoryManifestStore {
    manifests: RwLock<HashMap<CollectionId, PersistedManifest>>,
    fail_on_save: RwLock<bool>,
    fail_on_remove: RwLock<bool>,
}

impl InMemoryManifestStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail_on_save(&self, fail: bool) {
        *self.fail_on_save.write().await = fail;
    }

    pub async fn set_fail_on_remove(&self, fail: bool) {
        *self.fail_on_remove.write().await = fail;
    }
}

#[async_trait]
impl ManifestStore for InMemoryManifestStore {
    async fn save(&self, manifest: &PersistedManifest) -> Result<()> {
        if *self.fail_on_save.read().await {
            return Err(StorageError::Unavailable("manifest save disabled".to_string()));
        }
        self.manifests
            .write()
            .await
            .insert(manifest.collection_id, manifest.clone());
        Ok(())
    }

    async fn load(&self, collection_id: CollectionId) -> Result<Option<PersistedManifest>> {
        Ok(self.manifests.read().await.get(&collection_id).cloned())
    }

    async fn mark_applied(&self, collection_id: CollectionId, applied: usize) -> Result<()> {
        let mut manifests = self.manifests.write().await;
        let manifest = manifests.get_mut(&collection_id).ok_or_else(|| {
            StorageError::Inconsistent(format!("no manifest saved for {collection_id}"))
        })?;
        manifest.applied = applied;
        Ok(())
    }

    async fn remove(&self, collection_id: CollectionId) -> Result<()> {
        if *self.fail_on_remove.read().await {
            return Err(StorageError::Unavailable("manifest remove disabled".to_string()));
        }
        self.manifests.write().await.remove(&collection_id);
        Ok(())
    }
}
