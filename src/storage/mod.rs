//! Storage implementations.
//!
//! This module contains:
//! - `LockTable` / `CollectionStore` traits: claims, membership and collection
//!   records (one backend struct implements both so a claim and its
//!   membership entry always change together)
//! - `AuditStore` trait: append-only lifecycle events
//! - `ManifestStore` trait: publish manifests persisted for crash resume
//! - Implementations: in-memory, SQLite

use std::sync::Arc;

use tracing::info;

use crate::config::{StorageConfig, StorageType};
use crate::model::{CollectionId, ParseError};

mod audit_store;
mod collection_store;
mod lock_table;
mod manifest_store;
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod schema;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use audit_store::AuditStore;
pub use collection_store::CollectionStore;
pub use lock_table::{ClaimOutcome, LockTable};
pub use manifest_store::ManifestStore;
pub use memory::{InMemoryAuditStore, InMemoryManifestStore, InMemoryStore};
#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteAuditStore, SqliteManifestStore, SqliteStore};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Collection not found: {0}")]
    NotFound(CollectionId),

    #[error("Collection name already in use: {0}")]
    DuplicateName(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Inconsistent state: {0}")]
    Inconsistent(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[cfg(feature = "sqlite")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<ParseError> for StorageError {
    fn from(e: ParseError) -> Self {
        StorageError::Corrupt(e.to_string())
    }
}

impl From<chrono::ParseError> for StorageError {
    fn from(e: chrono::ParseError) -> Self {
        StorageError::Corrupt(format!("timestamp: {e}"))
    }
}

impl From<uuid::Error> for StorageError {
    fn from(e: uuid::Error) -> Self {
        StorageError::Corrupt(format!("uuid: {e}"))
    }
}

/// The persistence handles the engine is composed from.
#[derive(Clone)]
pub struct Storage {
    pub locks: Arc<dyn LockTable>,
    pub collections: Arc<dyn CollectionStore>,
    pub audit: Arc<dyn AuditStore>,
    pub manifests: Arc<dyn ManifestStore>,
}

impl Storage {
    /// Volatile storage for tests and local experiments.
    pub fn in_memory() -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self {
            locks: store.clone(),
            collections: store,
            audit: Arc::new(InMemoryAuditStore::new()),
            manifests: Arc::new(InMemoryManifestStore::new()),
        }
    }
}

/// Initialize storage based on configuration.
pub async fn init_storage(config: &StorageConfig) -> Result<Storage> {
    info!("Storage: {:?} at {}", config.storage_type, config.path);

    match config.storage_type {
        StorageType::Memory => Ok(Storage::in_memory()),
        #[cfg(feature = "sqlite")]
        StorageType::Sqlite => {
            let pool = sqlite::connect(&config.path).await?;

            let store = Arc::new(SqliteStore::new(pool.clone()));
            store.init().await?;

            let audit = Arc::new(SqliteAuditStore::new(pool.clone()));
            audit.init().await?;

            let manifests = Arc::new(SqliteManifestStore::new(pool));
            manifests.init().await?;

            Ok(Storage {
                locks: store.clone(),
                collections: store,
                audit,
                manifests,
            })
        }
        #[cfg(not(feature = "sqlite"))]
        StorageType::Sqlite => {
            tracing::error!("SQLite storage requested but 'sqlite' feature is not enabled");
            Err(StorageError::Unavailable(
                "sqlite feature not enabled".to_string(),
            ))
        }
    }
}
