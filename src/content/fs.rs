//! Filesystem ContentStore.
//!
//! Each store path is a directory holding its payload in `data.json`, so a
//! URI may have child URIs (`/economy` and `/economy/gdp`). Writes go to a
//! temporary file in the target directory followed by a rename, so readers
//! never see a partial payload.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use crate::interfaces::content_store::{ContentError, ContentStore, Result};
use crate::model::{live_path, workspace_path, CollectionId, ContentUri};

const DATA_FILE: &str = "data.json";

pub struct FsContentStore {
    root: PathBuf,
}

impl FsContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Payload file for a store path. Rejects paths escaping the root.
    fn data_file(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        let valid = !path.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !valid {
            return Err(ContentError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(relative).join(DATA_FILE))
    }

    async fn write_atomic(&self, file: &Path, bytes: &[u8]) -> Result<()> {
        let dir = file
            .parent()
            .ok_or_else(|| ContentError::InvalidPath(file.display().to_string()))?;
        tokio::fs::create_dir_all(dir).await?;

        let temp = TempFile(dir.join(format!(".{DATA_FILE}.{}", Uuid::new_v4().simple())));
        tokio::fs::write(&temp.0, bytes).await?;
        tokio::fs::rename(&temp.0, file).await?;
        temp.persist();
        Ok(())
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let file = self.data_file(path)?;
        tokio::fs::read(&file).await.map_err(|e| not_found_or(e, path))
    }

    /// Remove the directory left behind by a payload, if now empty.
    async fn prune(file: &Path) {
        if let Some(dir) = file.parent() {
            let _ = tokio::fs::remove_dir(dir).await;
        }
    }
}

/// Temporary payload file, removed on drop unless persisted. Covers errors
/// and attempts cancelled by a timeout between write and rename.
struct TempFile(PathBuf);

impl TempFile {
    fn persist(self) {
        std::mem::forget(self);
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

fn not_found_or(e: std::io::Error, path: &str) -> ContentError {
    if e.kind() == ErrorKind::NotFound {
        ContentError::NotFound(path.to_string())
    } else {
        ContentError::Io(e)
    }
}

#[async_trait]
impl ContentStore for FsContentStore {
    async fn read_version(&self, uri: &ContentUri) -> Result<Vec<u8>> {
        self.read_file(&live_path(uri)).await
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.read_file(path).await
    }

    async fn write_to_workspace(
        &self,
        collection_id: CollectionId,
        uri: &ContentUri,
        bytes: &[u8],
    ) -> Result<()> {
        let file = self.data_file(&workspace_path(collection_id, uri))?;
        self.write_atomic(&file, bytes).await
    }

    async fn discard_from_workspace(
        &self,
        collection_id: CollectionId,
        uri: &ContentUri,
    ) -> Result<()> {
        let file = self.data_file(&workspace_path(collection_id, uri))?;
        match tokio::fs::remove_file(&file).await {
            Ok(()) => {
                Self::prune(&file).await;
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn copy_to_live(&self, source: &str, destination: &str) -> Result<()> {
        let bytes = self.read_file(source).await?;
        let file = self.data_file(destination)?;
        self.write_atomic(&file, &bytes).await?;
        debug!(source, destination, "copied to live");
        Ok(())
    }

    async fn move_in_live(&self, source: &str, destination: &str) -> Result<()> {
        let from = self.data_file(source)?;
        let to = self.data_file(destination)?;

        if tokio::fs::try_exists(&to).await? {
            return Err(ContentError::Conflict(destination.to_string()));
        }
        if !tokio::fs::try_exists(&from).await? {
            return Err(ContentError::NotFound(source.to_string()));
        }
        if let Some(dir) = to.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::rename(&from, &to)
            .await
            .map_err(|e| not_found_or(e, source))?;
        Self::prune(&from).await;
        debug!(source, destination, "moved in live");
        Ok(())
    }

    async fn delete_from_live(&self, path: &str) -> Result<()> {
        let file = self.data_file(path)?;
        tokio::fs::remove_file(&file)
            .await
            .map_err(|e| not_found_or(e, path))?;
        Self::prune(&file).await;
        debug!(path, "deleted from live");
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let file = self.data_file(path)?;
        Ok(tokio::fs::try_exists(&file).await?)
    }
}
