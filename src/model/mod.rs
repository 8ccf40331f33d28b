//! Domain model for collections, content claims, lifecycle events and
//! publish manifests.
//!
//! These are plain data types. Persistence lives in [`crate::storage`],
//! behaviour in [`crate::services`].

mod collection;
mod content;
mod event;
mod manifest;

pub use collection::{
    Collection, CollectionId, CollectionStatus, CollectionType, CollectionUpdate, NewCollection,
    WorkflowAction,
};
pub use content::{decide_claim, BlockReason, ClaimDecision, ClaimKind, ContentItem, ContentUri};
pub use event::{CollectionEvent, EventType, SYSTEM_ACTOR};
pub use manifest::{
    live_path, uri_from_live_path, workspace_path, FileOperation, Manifest, OperationKind,
    PersistedManifest, LIVE_ROOT, WORKSPACE_ROOT,
};

pub(crate) use collection::name_key;

/// Error returned when a persisted discriminator cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown {kind}: {value}")]
pub struct ParseError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
