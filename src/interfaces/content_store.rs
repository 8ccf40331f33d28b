//! Content store interface.

use async_trait::async_trait;

use crate::model::{CollectionId, ContentUri};

/// Result type for content store operations.
pub type Result<T> = std::result::Result<T, ContentError>;

/// Errors that can occur while reading or mutating content.
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("Content not found: {0}")]
    NotFound(String),

    #[error("Invalid content path: {0}")]
    InvalidPath(String),

    #[error("Destination already exists: {0}")]
    Conflict(String),

    #[error("Content store unavailable: {0}")]
    Unavailable(String),

    #[error("Content operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContentError {
    /// Whether retrying the same operation may succeed.
    ///
    /// Retryable:
    /// - `Unavailable`: store momentarily unreachable
    /// - `Timeout`: operation exceeded its per-attempt budget
    /// - `Io` with an interrupted/timed-out/would-block kind
    ///
    /// Everything else (missing source, path conflict, permission problems)
    /// fails the same way on every attempt.
    pub fn is_transient(&self) -> bool {
        use std::io::ErrorKind;

        match self {
            ContentError::Unavailable(_) | ContentError::Timeout(_) => true,
            ContentError::Io(e) => matches!(
                e.kind(),
                ErrorKind::Interrupted | ErrorKind::TimedOut | ErrorKind::WouldBlock
            ),
            _ => false,
        }
    }
}

/// Interface over the raw content tree.
///
/// Paths are store-relative strings built by [`crate::model::live_path`] and
/// [`crate::model::workspace_path`]. Each mutating call must be atomic at the
/// storage layer: readers see either the old or the new payload, never a
/// partial one.
///
/// Implementations:
/// - `FsContentStore`: local filesystem
/// - `MockContentStore`: in-memory with failure injection for tests
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Read the live (published) version of `uri`.
    async fn read_version(&self, uri: &ContentUri) -> Result<Vec<u8>>;

    /// Read the payload at any store path.
    async fn read(&self, path: &str) -> Result<Vec<u8>>;

    /// Write `bytes` for `uri` into the collection's private workspace.
    async fn write_to_workspace(
        &self,
        collection_id: CollectionId,
        uri: &ContentUri,
        bytes: &[u8],
    ) -> Result<()>;

    /// Remove `uri` from the collection's workspace, if present.
    async fn discard_from_workspace(&self, collection_id: CollectionId, uri: &ContentUri)
        -> Result<()>;

    /// Copy a workspace path over a live path, replacing any existing payload.
    async fn copy_to_live(&self, source: &str, destination: &str) -> Result<()>;

    /// Move one live path to another. Fails with `Conflict` if the
    /// destination exists.
    async fn move_in_live(&self, source: &str, destination: &str) -> Result<()>;

    /// Delete a live path. Fails with `NotFound` if absent.
    async fn delete_from_live(&self, path: &str) -> Result<()>;

    async fn exists(&self, path: &str) -> Result<bool>;
}
