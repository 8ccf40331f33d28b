//! LockTable trait definition.

use async_trait::async_trait;

use super::Result;
use crate::model::{
    BlockReason, ClaimDecision, CollectionId, CollectionStatus, ContentItem, ContentUri,
};

/// Result of a claim request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// Every request was accepted; one decision per request, in order.
    Applied(Vec<ClaimDecision>),
    /// A request was denied and nothing was written.
    Blocked { uri: ContentUri, reason: BlockReason },
    /// The collection is not open for content changes.
    NotEditable(CollectionStatus),
    CollectionNotFound,
}

/// Interface for the content lock table.
///
/// A claim row doubles as the collection's membership entry for that URI, so
/// claims and membership cannot diverge. Released claims stay as membership
/// history with `held = false`.
///
/// # Atomicity
///
/// `claim` is a single test-and-set: backends look up the current holder of
/// every requested URI, call [`crate::model::decide_claim`] and apply the
/// decisions inside one critical section (one lock, or one `BEGIN IMMEDIATE`
/// transaction). Claims are only accepted while the collection is CREATED,
/// checked inside the same section.
///
/// # Implementations
///
/// - `InMemoryStore`: single mutex over claims and collections
/// - `SqliteStore`: SQLite with a partial unique index on held claims
#[async_trait]
pub trait LockTable: Send + Sync {
    /// Claim every request for its collection, all or nothing.
    ///
    /// All requests must name the same collection.
    async fn claim(&self, requests: &[ContentItem]) -> Result<ClaimOutcome>;

    /// Current holder of `uri`, if any.
    async fn holder_of(&self, uri: &ContentUri) -> Result<Option<ContentItem>>;

    /// Membership of a collection (held and released), ordered by URI.
    async fn items_of(&self, collection_id: CollectionId) -> Result<Vec<ContentItem>>;

    /// Claims currently held by a collection, ordered by URI.
    async fn held_by(&self, collection_id: CollectionId) -> Result<Vec<ContentItem>>;

    /// Drop membership and claim for `uris` in one step.
    ///
    /// Returns the number of entries removed; unknown URIs are ignored.
    async fn remove(&self, collection_id: CollectionId, uris: &[ContentUri]) -> Result<usize>;

    /// Release every claim the collection holds.
    ///
    /// Idempotent: returns the number of claims released by this call, so a
    /// second call returns 0.
    async fn release(&self, collection_id: CollectionId) -> Result<usize>;
}
