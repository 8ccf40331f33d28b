//! Engine error taxonomy.
//!
//! Every engine operation returns [`EngineError`], a tagged error carrying a
//! status classification and, for lock conflicts, the [`BlockReason`].

use crate::interfaces::ContentError;
use crate::model::{BlockReason, CollectionId, CollectionStatus, ContentUri, WorkflowAction};
use crate::storage::StorageError;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Which kind of entity was not found.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotFound {
    #[error("collection {0}")]
    Collection(CollectionId),

    #[error("content {uri} in collection {collection}")]
    Content {
        collection: CollectionId,
        uri: ContentUri,
    },
}

/// Caller-facing status classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorStatus {
    BadRequest,
    Forbidden,
    NotFound,
    Conflict,
    Internal,
    Unavailable,
}

impl ErrorStatus {
    /// HTTP-style status number.
    pub fn code(&self) -> u16 {
        match self {
            ErrorStatus::BadRequest => 400,
            ErrorStatus::Forbidden => 403,
            ErrorStatus::NotFound => 404,
            ErrorStatus::Conflict => 409,
            ErrorStatus::Internal => 500,
            ErrorStatus::Unavailable => 503,
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.code() < 500
    }
}

/// Errors surfaced by engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The URI is claimed in a way that forbids this request.
    #[error("Content {uri} is locked: {reason}")]
    LockConflict { uri: ContentUri, reason: BlockReason },

    #[error("Collection name already in use: {name}")]
    DuplicateName { name: String },

    #[error("Cannot {action} collection {collection} in status {from}")]
    InvalidTransition {
        collection: CollectionId,
        from: CollectionStatus,
        action: WorkflowAction,
    },

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("{actor} may not {action}")]
    PermissionDenied { actor: String, action: WorkflowAction },

    #[error("Not found: {0}")]
    NotFound(NotFound),

    /// A manifest operation failed past its retry budget; the collection is
    /// now ERRORED.
    #[error("Publish of {collection} failed at operation {operation}: {detail}")]
    PublishFailure {
        collection: CollectionId,
        operation: usize,
        detail: String,
    },

    #[error("Collection {collection} is already being published")]
    PublishInProgress { collection: CollectionId },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Content store error: {0}")]
    Content(#[from] ContentError),
}

impl EngineError {
    pub fn status(&self) -> ErrorStatus {
        match self {
            EngineError::LockConflict { .. }
            | EngineError::DuplicateName { .. }
            | EngineError::PublishInProgress { .. } => ErrorStatus::Conflict,
            EngineError::InvalidTransition { .. } | EngineError::Validation(_) => {
                ErrorStatus::BadRequest
            }
            EngineError::PermissionDenied { .. } => ErrorStatus::Forbidden,
            EngineError::NotFound(_) => ErrorStatus::NotFound,
            EngineError::PublishFailure { .. } => ErrorStatus::Internal,
            EngineError::Storage(StorageError::Unavailable(_)) => ErrorStatus::Unavailable,
            EngineError::Storage(StorageError::NotFound(_)) => ErrorStatus::NotFound,
            EngineError::Storage(_) => ErrorStatus::Internal,
            EngineError::Content(ContentError::NotFound(_)) => ErrorStatus::NotFound,
            EngineError::Content(e) if e.is_transient() => ErrorStatus::Unavailable,
            EngineError::Content(_) => ErrorStatus::Internal,
        }
    }

    /// The block reason, if this is a lock conflict.
    pub fn block_reason(&self) -> Option<BlockReason> {
        match self {
            EngineError::LockConflict { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    /// Returns true for errors caused by the request rather than by a fault:
    /// these are returned to the caller and never logged as faults.
    pub fn is_client_error(&self) -> bool {
        self.status().is_client_error()
    }

    pub(crate) fn collection_not_found(id: CollectionId) -> Self {
        EngineError::NotFound(NotFound::Collection(id))
    }

    pub(crate) fn invalid_transition(
        collection: CollectionId,
        from: CollectionStatus,
        action: WorkflowAction,
    ) -> Self {
        EngineError::InvalidTransition {
            collection,
            from,
            action,
        }
    }
}
