//! Engine components.
//!
//! Each service wraps the storage traits for one concern and records its
//! lifecycle events through [`AuditLog`]. [`crate::engine::Engine`] wires them
//! together.

pub mod audit;
pub mod collections;
pub mod locks;
pub mod manifest;
pub mod publisher;
pub mod scheduler;
pub mod workflow;

pub use audit::AuditLog;
pub use collections::CollectionService;
pub use locks::ContentLocks;
pub use manifest::{plan, ManifestBuilder};
pub use publisher::{PublishReport, Publisher};
pub use scheduler::{Scheduler, SchedulerHandle, TickReport};
pub use workflow::{Resolution, Workflow};
