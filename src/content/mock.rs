//! In-memory ContentStore with failure injection.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::interfaces::content_store::{ContentError, ContentStore, Result};
use crate::model::{live_path, workspace_path, CollectionId, ContentUri};

#[derive(Default)]
struct Faults {
    /// Live operations attempted so far, failed attempts included.
    live_ops: usize,
    /// 1-based attempt number that fails with a permanent I/O error.
    fail_on_live_op: Option<usize>,
    /// Upcoming live attempts that fail as unavailable.
    transient_failures: usize,
    /// Sleep before every live attempt.
    delay: Option<Duration>,
}

/// Mock content store keeping payloads in a map keyed by store path.
#[derive(Default)]
pub struct MockContentStore {
    files: RwLock<BTreeMap<String, Vec<u8>>>,
    faults: Mutex<Faults>,
}

impl MockContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a payload at any store path.
    pub async fn insert(&self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.files.write().await.insert(path.into(), bytes.into());
    }

    /// Seed the live version of `uri`.
    pub async fn insert_live(&self, uri: &ContentUri, bytes: impl Into<Vec<u8>>) {
        self.insert(live_path(uri), bytes).await;
    }

    pub async fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.files.read().await.get(path).cloned()
    }

    /// All stored paths, sorted.
    pub async fn paths(&self) -> Vec<String> {
        self.files.read().await.keys().cloned().collect()
    }

    /// Make the `n`th live operation attempt (1-based, counted from now on)
    /// fail with a non-transient I/O error.
    pub async fn fail_on_live_op(&self, n: usize) {
        let mut faults = self.faults.lock().await;
        faults.fail_on_live_op = Some(faults.live_ops + n);
    }

    /// Make the next `count` live operation attempts fail as unavailable.
    pub async fn set_transient_failures(&self, count: usize) {
        self.faults.lock().await.transient_failures = count;
    }

    /// Delay every live operation attempt.
    pub async fn set_delay(&self, delay: Option<Duration>) {
        self.faults.lock().await.delay = delay;
    }

    /// Number of live operation attempts made.
    pub async fn live_ops(&self) -> usize {
        self.faults.lock().await.live_ops
    }

    pub async fn clear_faults(&self) {
        let mut faults = self.faults.lock().await;
        faults.fail_on_live_op = None;
        faults.transient_failures = 0;
        faults.delay = None;
    }

    /// Account for one live attempt, returning the injected failure if any.
    async fn live_attempt(&self, path: &str) -> Result<()> {
        let delay = {
            let mut faults = self.faults.lock().await;
            faults.live_ops += 1;
            if faults.fail_on_live_op == Some(faults.live_ops) {
                faults.fail_on_live_op = None;
                return Err(ContentError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("simulated I/O failure on {path}"),
                )));
            }
            if faults.transient_failures > 0 {
                faults.transient_failures -= 1;
                return Err(ContentError::Unavailable(format!(
                    "simulated outage on {path}"
                )));
            }
            faults.delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }
}

#[async_trait]
impl ContentStore for MockContentStore {
    async fn read_version(&self, uri: &ContentUri) -> Result<Vec<u8>> {
        self.read(&live_path(uri)).await
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.get(path)
            .await
            .ok_or_else(|| ContentError::NotFound(path.to_string()))
    }

    async fn write_to_workspace(
        &self,
        collection_id: CollectionId,
        uri: &ContentUri,
        bytes: &[u8],
    ) -> Result<()> {
        self.insert(workspace_path(collection_id, uri), bytes).await;
        Ok(())
    }

    async fn discard_from_workspace(
        &self,
        collection_id: CollectionId,
        uri: &ContentUri,
    ) -> Result<()> {
        self.files
            .write()
            .await
            .remove(&workspace_path(collection_id, uri));
        Ok(())
    }

    async fn copy_to_live(&self, source: &str, destination: &str) -> Result<()> {
        self.live_attempt(destination).await?;
        let mut files = self.files.write().await;
        let bytes = files
            .get(source)
            .cloned()
            .ok_or_else(|| ContentError::NotFound(source.to_string()))?;
        files.insert(destination.to_string(), bytes);
        Ok(())
    }

    async fn move_in_live(&self, source: &str, destination: &str) -> Result<()> {
        self.live_attempt(destination).await?;
        let mut files = self.files.write().await;
        if files.contains_key(destination) {
            return Err(ContentError::Conflict(destination.to_string()));
        }
        let bytes = files
            .remove(source)
            .ok_or_else(|| ContentError::NotFound(source.to_string()))?;
        files.insert(destination.to_string(), bytes);
        Ok(())
    }

    async fn delete_from_live(&self, path: &str) -> Result<()> {
        self.live_attempt(path).await?;
        self.files
            .write()
            .await
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| ContentError::NotFound(path.to_string()))
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.files.read().await.contains_key(path))
    }
}
