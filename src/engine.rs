//! Composition root.
//!
//! [`EngineBuilder`] wires storage and collaborators into the engine
//! components; [`Engine`] hands them out. Components share the same stores,
//! so every handle observes the same claims and statuses.
//!
//! ```ignore
//! let engine = EngineBuilder::new(Storage::in_memory(), Arc::new(MockContentStore::new()))
//!     .permissions(Arc::new(StaticPermissions::allow_all()))
//!     .build();
//!
//! let collection = engine
//!     .collections()
//!     .create(NewCollection::manual("budget"), "editor@example.com")
//!     .await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::config::{Config, SchedulerConfig};
use crate::content::FsContentStore;
use crate::error::Result;
use crate::interfaces::{ContentStore, Notifier, Permissions};
use crate::model::CollectionId;
use crate::notify::LoggingNotifier;
use crate::permissions::StaticPermissions;
use crate::services::{
    AuditLog, CollectionService, ContentLocks, ManifestBuilder, PublishReport, Publisher,
    Scheduler, SchedulerHandle, Workflow,
};
use crate::storage::{init_storage, Storage};
use crate::utils::retry::RetryPolicy;

/// Builder for [`Engine`].
///
/// Defaults: nobody may approve or publish, notifications go to the log,
/// retry policy from `PublishConfig::default()`.
pub struct EngineBuilder {
    storage: Storage,
    content: Arc<dyn ContentStore>,
    permissions: Arc<dyn Permissions>,
    notifier: Arc<dyn Notifier>,
    retry_policy: RetryPolicy,
    poll_interval: Duration,
}

impl EngineBuilder {
    pub fn new(storage: Storage, content: Arc<dyn ContentStore>) -> Self {
        Self {
            storage,
            content,
            permissions: Arc::new(StaticPermissions::deny_all()),
            notifier: Arc::new(LoggingNotifier),
            retry_policy: RetryPolicy::default(),
            poll_interval: SchedulerConfig::default().poll_interval(),
        }
    }

    pub fn permissions(mut self, permissions: Arc<dyn Permissions>) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn build(self) -> Engine {
        let Storage {
            locks: lock_table,
            collections: store,
            audit: audit_store,
            manifests,
        } = self.storage;

        let audit = AuditLog::new(audit_store);
        let locks = ContentLocks::new(lock_table.clone());
        let builder = ManifestBuilder::new(lock_table, self.content.clone());

        let collections = CollectionService::new(
            store.clone(),
            locks.clone(),
            self.content.clone(),
            audit.clone(),
        );
        let workflow = Workflow::new(
            store.clone(),
            locks.clone(),
            manifests.clone(),
            self.permissions,
            audit.clone(),
        );
        let publisher = Arc::new(Publisher::new(
            store,
            locks.clone(),
            manifests,
            builder.clone(),
            self.content,
            self.notifier,
            audit.clone(),
            self.retry_policy,
        ));

        Engine {
            collections,
            locks,
            workflow,
            builder,
            publisher,
            audit,
            poll_interval: self.poll_interval,
        }
    }
}

/// The composed collection lifecycle engine. Cheap to clone.
#[derive(Clone)]
pub struct Engine {
    collections: CollectionService,
    locks: ContentLocks,
    workflow: Workflow,
    builder: ManifestBuilder,
    publisher: Arc<Publisher>,
    audit: AuditLog,
    poll_interval: Duration,
}

impl Engine {
    /// Build an engine from configuration: configured storage backend,
    /// filesystem content store, static permissions and log notifications.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let storage = init_storage(&config.storage).await?;
        info!(root = %config.content.root, "Content store: filesystem");
        let content = Arc::new(FsContentStore::new(&config.content.root));

        Ok(EngineBuilder::new(storage, content)
            .permissions(Arc::new(StaticPermissions::from_config(&config.permissions)))
            .retry_policy(RetryPolicy::from_config(&config.publish))
            .poll_interval(config.scheduler.poll_interval())
            .build())
    }

    pub fn collections(&self) -> &CollectionService {
        &self.collections
    }

    pub fn locks(&self) -> &ContentLocks {
        &self.locks
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    pub fn manifests(&self) -> &ManifestBuilder {
        &self.builder
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Publish a QUEUED_FOR_PUBLISH collection.
    pub async fn publish(&self, collection_id: CollectionId) -> Result<PublishReport> {
        self.publisher.publish(collection_id).await
    }

    /// Resume or run every QUEUED_FOR_PUBLISH collection. Call once at
    /// startup before serving requests.
    pub async fn resume(&self) -> Result<Vec<(CollectionId, Result<PublishReport>)>> {
        self.publisher.publish_queued().await
    }

    pub fn scheduler(&self) -> Scheduler {
        Scheduler::new(
            self.workflow.clone(),
            self.publisher.clone(),
            self.poll_interval,
        )
    }

    /// Start the publish scheduler as a background task.
    pub fn spawn_scheduler(&self) -> SchedulerHandle {
        self.scheduler().spawn()
    }
}
