//! galley-scheduler: publish scheduler daemon
//!
//! Resumes publishes interrupted by a previous shutdown, then queues and
//! publishes due collections every poll interval until interrupted.
//!
//! ## Configuration
//! ```yaml
//! storage:
//!   type: sqlite
//!   path: ./data/galley.db
//! content:
//!   root: ./data/content
//! scheduler:
//!   poll_interval_secs: 10
//! ```
//!
//! Environment overrides use `GALLEY__SECTION__KEY`, logging `GALLEY_LOG`.

use galley::config::Config;
use galley::model::CollectionId;
use galley::services::PublishReport;
use galley::utils::bootstrap::init_tracing;
use galley::Engine;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let path = std::env::args().nth(1);
    let config = Config::load(path.as_deref())?;
    let engine = Engine::from_config(&config).await?;

    if !config.scheduler.enabled {
        warn!("Scheduler disabled; resuming interrupted publishes only");
        report_resume(engine.resume().await?);
        return Ok(());
    }

    let handle = engine.spawn_scheduler();
    info!("galley-scheduler running, press Ctrl+C to stop");

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutting down");
    handle.shutdown().await;
    Ok(())
}

fn report_resume(results: Vec<(CollectionId, galley::Result<PublishReport>)>) {
    for (id, result) in results {
        match result {
            Ok(report) => info!(
                collection = %id,
                applied = report.applied,
                resumed = report.resumed,
                "Collection published"
            ),
            Err(e) => error!(collection = %id, error = %e, "Collection not published"),
        }
    }
}
