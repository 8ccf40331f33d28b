//! Collection aggregate and its lifecycle status.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ParseError;

/// Unique, immutable collection identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionId(Uuid);

impl CollectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for CollectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for CollectionId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl FromStr for CollectionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// How a collection reaches the publish queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionType {
    /// Queued only by an explicit publish trigger.
    Manual,
    /// Queued by the scheduler once `publish_date` has passed.
    Scheduled,
}

impl CollectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionType::Manual => "manual",
            CollectionType::Scheduled => "scheduled",
        }
    }
}

impl FromStr for CollectionType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(CollectionType::Manual),
            "scheduled" => Ok(CollectionType::Scheduled),
            other => Err(ParseError::new("collection type", other)),
        }
    }
}

impl fmt::Display for CollectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Collection lifecycle status.
///
/// ```text
/// CREATED ⇄ APPROVED → QUEUED_FOR_PUBLISH → PUBLISHED
///    │          │              │
///    └──────────┴→ DELETED     └→ ERRORED ─(retry)→ QUEUED_FOR_PUBLISH
///                      ↑                 │
///                      └───(abandon)─────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CollectionStatus {
    Created,
    Approved,
    QueuedForPublish,
    Published,
    Errored,
    Deleted,
}

impl CollectionStatus {
    pub const ALL: [CollectionStatus; 6] = [
        CollectionStatus::Created,
        CollectionStatus::Approved,
        CollectionStatus::QueuedForPublish,
        CollectionStatus::Published,
        CollectionStatus::Errored,
        CollectionStatus::Deleted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionStatus::Created => "CREATED",
            CollectionStatus::Approved => "APPROVED",
            CollectionStatus::QueuedForPublish => "QUEUED_FOR_PUBLISH",
            CollectionStatus::Published => "PUBLISHED",
            CollectionStatus::Errored => "ERRORED",
            CollectionStatus::Deleted => "DELETED",
        }
    }

    /// PUBLISHED, ERRORED and DELETED accept no further workflow steps apart
    /// from resolving an ERRORED collection.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CollectionStatus::Published | CollectionStatus::Errored | CollectionStatus::Deleted
        )
    }

    /// Status reached by applying `action`, or `None` if the action is not
    /// permitted from this status.
    ///
    /// Actions that do not move the collection (content edits, detail updates,
    /// reviews) return the current status when permitted.
    pub fn apply(self, action: WorkflowAction) -> Option<CollectionStatus> {
        use CollectionStatus::*;
        use WorkflowAction::*;

        match (self, action) {
            (Created, EditContent) => Some(Created),
            (Created, Review) => Some(Created),
            (Created | Approved, Update) => Some(self),
            (Created, Approve) => Some(Approved),
            (Approved, Reopen) => Some(Created),
            (Approved, Queue) => Some(QueuedForPublish),
            (QueuedForPublish, CompletePublish) => Some(Published),
            (QueuedForPublish, FailPublish) => Some(Errored),
            (Errored, Retry) => Some(QueuedForPublish),
            (Errored, Abandon) => Some(Deleted),
            (Created | Approved, Delete) => Some(Deleted),
            _ => None,
        }
    }
}

impl FromStr for CollectionStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CollectionStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseError::new("collection status", s))
    }
}

impl fmt::Display for CollectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A step requested of the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkflowAction {
    EditContent,
    Update,
    Review,
    Approve,
    Reopen,
    Queue,
    CompletePublish,
    FailPublish,
    Retry,
    Abandon,
    Delete,
}

impl fmt::Display for WorkflowAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkflowAction::EditContent => "edit content",
            WorkflowAction::Update => "update",
            WorkflowAction::Review => "review",
            WorkflowAction::Approve => "approve",
            WorkflowAction::Reopen => "reopen",
            WorkflowAction::Queue => "queue for publish",
            WorkflowAction::CompletePublish => "complete publish",
            WorkflowAction::FailPublish => "fail publish",
            WorkflowAction::Retry => "retry publish",
            WorkflowAction::Abandon => "abandon",
            WorkflowAction::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// A collection: a bounded, reviewable change-set moving through the publish
/// workflow.
///
/// Serializes to the public representation
/// (`id, name, type, status, publishDate, releaseUri`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: CollectionId,
    pub name: String,
    #[serde(rename = "type")]
    pub collection_type: CollectionType,
    pub status: CollectionStatus,
    pub publish_date: Option<DateTime<Utc>>,
    pub release_uri: Option<String>,
    #[serde(skip)]
    pub created_at: DateTime<Utc>,
}

impl Collection {
    /// Key used for case-insensitive name uniqueness.
    pub fn name_key(&self) -> String {
        name_key(&self.name)
    }

    /// Whether the scheduler may queue this collection at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.collection_type == CollectionType::Scheduled
            && self.publish_date.is_some_and(|date| date <= now)
    }

    fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("collection name must not be empty".to_string());
        }
        if self.collection_type == CollectionType::Scheduled && self.publish_date.is_none() {
            return Err("scheduled collections require a publish date".to_string());
        }
        Ok(())
    }
}

pub(crate) fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Request to create a collection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCollection {
    pub name: String,
    #[serde(rename = "type")]
    pub collection_type: CollectionType,
    pub publish_date: Option<DateTime<Utc>>,
    pub release_uri: Option<String>,
}

impl NewCollection {
    pub fn manual(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            collection_type: CollectionType::Manual,
            publish_date: None,
            release_uri: None,
        }
    }

    pub fn scheduled(name: impl Into<String>, publish_date: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            collection_type: CollectionType::Scheduled,
            publish_date: Some(publish_date),
            release_uri: None,
        }
    }

    pub fn with_release_uri(mut self, release_uri: impl Into<String>) -> Self {
        self.release_uri = Some(release_uri.into());
        self
    }

    /// Build the CREATED collection, validating name and schedule.
    pub fn into_collection(self) -> Result<Collection, String> {
        let collection = Collection {
            id: CollectionId::new(),
            name: self.name.trim().to_string(),
            collection_type: self.collection_type,
            status: CollectionStatus::Created,
            publish_date: self.publish_date,
            release_uri: self.release_uri,
            created_at: Utc::now(),
        };
        collection.validate()?;
        Ok(collection)
    }
}

/// Partial update of a collection's details.
///
/// `None` leaves a field untouched; `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionUpdate {
    pub name: Option<String>,
    pub collection_type: Option<CollectionType>,
    pub publish_date: Option<Option<DateTime<Utc>>>,
    pub release_uri: Option<Option<String>>,
}

impl CollectionUpdate {
    /// Apply to a copy of `collection`, validating the result.
    pub fn apply_to(&self, collection: &Collection) -> Result<Collection, String> {
        let mut updated = collection.clone();
        if let Some(name) = &self.name {
            updated.name = name.trim().to_string();
        }
        if let Some(collection_type) = self.collection_type {
            updated.collection_type = collection_type;
        }
        if let Some(publish_date) = self.publish_date {
            updated.publish_date = publish_date;
        }
        if let Some(release_uri) = &self.release_uri {
            updated.release_uri = release_uri.clone();
        }
        updated.validate()?;
        Ok(updated)
    }
}
