//! Immutable collection lifecycle events.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CollectionId, ParseError};

/// Actor recorded for steps taken by the engine itself (scheduler, resume).
pub const SYSTEM_ACTOR: &str = "system@galley";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Created,
    Updated,
    ContentAdded,
    ContentMarkedForDelete,
    ContentMoved,
    ContentRemoved,
    Reviewed,
    Approved,
    Reopened,
    QueuedForPublish,
    PublishStarted,
    PublishCompleted,
    PublishFailed,
    PublishRetried,
    Deleted,
}

impl EventType {
    pub const ALL: [EventType; 15] = [
        EventType::Created,
        EventType::Updated,
        EventType::ContentAdded,
        EventType::ContentMarkedForDelete,
        EventType::ContentMoved,
        EventType::ContentRemoved,
        EventType::Reviewed,
        EventType::Approved,
        EventType::Reopened,
        EventType::QueuedForPublish,
        EventType::PublishStarted,
        EventType::PublishCompleted,
        EventType::PublishFailed,
        EventType::PublishRetried,
        EventType::Deleted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Created => "CREATED",
            EventType::Updated => "UPDATED",
            EventType::ContentAdded => "CONTENT_ADDED",
            EventType::ContentMarkedForDelete => "CONTENT_MARKED_FOR_DELETE",
            EventType::ContentMoved => "CONTENT_MOVED",
            EventType::ContentRemoved => "CONTENT_REMOVED",
            EventType::Reviewed => "REVIEWED",
            EventType::Approved => "APPROVED",
            EventType::Reopened => "REOPENED",
            EventType::QueuedForPublish => "QUEUED_FOR_PUBLISH",
            EventType::PublishStarted => "PUBLISH_STARTED",
            EventType::PublishCompleted => "PUBLISH_COMPLETED",
            EventType::PublishFailed => "PUBLISH_FAILED",
            EventType::PublishRetried => "PUBLISH_RETRIED",
            EventType::Deleted => "DELETED",
        }
    }
}

impl FromStr for EventType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .into_iter()
            .find(|ty| ty.as_str() == s)
            .ok_or_else(|| ParseError::new("event type", s))
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something that happened to a collection.
///
/// Ordered by `timestamp`, ties broken by insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionEvent {
    pub collection_id: CollectionId,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub actor_email: String,
    pub detail: Option<String>,
}

impl CollectionEvent {
    pub fn new(collection_id: CollectionId, event_type: EventType, actor_email: &str) -> Self {
        Self {
            collection_id,
            event_type,
            timestamp: Utc::now(),
            actor_email: actor_email.to_string(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}
