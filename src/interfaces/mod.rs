//! Abstract interfaces for the engine's external collaborators.
//!
//! These traits define the contracts for:
//! - Content storage (workspace writes and live-tree file operations)
//! - Permissions (approve/publish capability checks)
//! - Notification (fire-and-forget publish/delete signals for indexing)

pub mod content_store;
pub mod notifier;
pub mod permissions;

pub use content_store::{ContentError, ContentStore};
pub use notifier::{Notifier, NotifyError};
pub use permissions::Permissions;
