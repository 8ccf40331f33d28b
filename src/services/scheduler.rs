//! Automated publish scheduler.
//!
//! Each tick:
//! 1. Queues every APPROVED scheduled collection whose publish date has passed
//! 2. Publishes every QUEUED_FOR_PUBLISH collection, resuming interrupted
//!    publishes from their persisted manifest
//!
//! Runs as a long-lived background task alongside request handlers.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::error::{EngineError, Result};
use crate::model::CollectionId;
use crate::services::{Publisher, Workflow};

/// What one scheduler tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Scheduled collections moved to QUEUED_FOR_PUBLISH.
    pub queued: Vec<CollectionId>,
    pub published: Vec<CollectionId>,
    /// Collections whose publish failed and are now ERRORED.
    pub failed: Vec<CollectionId>,
    /// Collections left QUEUED_FOR_PUBLISH for a later tick.
    pub deferred: Vec<CollectionId>,
}

#[derive(Clone)]
pub struct Scheduler {
    workflow: Workflow,
    publisher: Arc<Publisher>,
    interval: Duration,
}

impl Scheduler {
    pub fn new(workflow: Workflow, publisher: Arc<Publisher>, interval: Duration) -> Self {
        Self {
            workflow,
            publisher,
            interval,
        }
    }

    /// Run one pass at `now`.
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<TickReport> {
        let queued = self.workflow.queue_due(now).await?;
        let mut report = TickReport {
            queued,
            ..TickReport::default()
        };

        for (id, result) in self.publisher.publish_queued().await? {
            match result {
                Ok(_) => report.published.push(id),
                Err(EngineError::PublishFailure { .. }) => report.failed.push(id),
                Err(_) => report.deferred.push(id),
            }
        }

        if !report.queued.is_empty() || !report.published.is_empty() || !report.failed.is_empty()
        {
            info!(
                queued = report.queued.len(),
                published = report.published.len(),
                failed = report.failed.len(),
                deferred = report.deferred.len(),
                "Scheduler tick"
            );
        }
        Ok(report)
    }

    /// Spawn the scheduler loop. The first tick runs immediately, which
    /// resumes publishes interrupted by a restart.
    pub fn spawn(self) -> SchedulerHandle {
        let (cancel_tx, mut cancel_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            info!(interval = ?self.interval, "Publish scheduler started");

            let mut delay = Duration::ZERO;
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {
                        if let Err(e) = self.tick(Utc::now()).await {
                            error!(error = %e, "Scheduler tick failed");
                        }
                        delay = self.interval;
                    }
                    changed = cancel_rx.changed() => {
                        if changed.is_err() || *cancel_rx.borrow() {
                            info!("Publish scheduler stopped");
                            break;
                        }
                    }
                }
            }
        });

        SchedulerHandle {
            cancel: cancel_tx,
            task,
        }
    }
}

/// Handle to a running scheduler task.
pub struct SchedulerHandle {
    cancel: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Signal the scheduler to stop after its current tick.
    pub fn stop(&self) {
        let _ = self.cancel.send(true);
    }

    /// Stop the scheduler and wait for it to exit.
    pub async fn shutdown(self) {
        self.stop();
        if let Err(e) = self.task.await {
            warn!(error = %e, "Publish scheduler task ended abnormally");
        }
    }
}
