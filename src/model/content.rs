//! Content claims and the rules deciding who may hold them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{CollectionId, ParseError};

/// Normalized content URI, e.g. `/economy/gdp`.
///
/// Always starts with `/`, never ends with one, and contains no empty, `.`
/// or `..` segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentUri(String);

impl ContentUri {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim();
        if trimmed.contains('\\') {
            return Err(format!("invalid content uri '{raw}': backslash"));
        }

        let mut normalized = String::with_capacity(trimmed.len() + 1);
        for segment in trimmed.split('/').filter(|s| !s.is_empty()) {
            if segment == "." || segment == ".." {
                return Err(format!("invalid content uri '{raw}': relative segment"));
            }
            normalized.push('/');
            normalized.push_str(segment);
        }

        if normalized.is_empty() {
            return Err(format!("invalid content uri '{raw}': empty"));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// URI without its leading slash, for joining onto a base path.
    pub fn relative(&self) -> &str {
        &self.0[1..]
    }
}

impl FromStr for ContentUri {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ContentUri {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ContentUri> for String {
    fn from(uri: ContentUri) -> Self {
        uri.0
    }
}

impl fmt::Display for ContentUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of hold a collection has on a URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimKind {
    Editing,
    PendingDelete,
}

impl ClaimKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimKind::Editing => "EDITING",
            ClaimKind::PendingDelete => "PENDING_DELETE",
        }
    }
}

impl FromStr for ClaimKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EDITING" => Ok(ClaimKind::Editing),
            "PENDING_DELETE" => Ok(ClaimKind::PendingDelete),
            other => Err(ParseError::new("claim kind", other)),
        }
    }
}

impl fmt::Display for ClaimKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A collection's claim on a content URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub collection_id: CollectionId,
    pub uri: ContentUri,
    pub kind: ClaimKind,
    /// Set on the destination claim of a content move.
    pub moved_from: Option<ContentUri>,
}

impl ContentItem {
    pub fn editing(collection_id: CollectionId, uri: ContentUri) -> Self {
        Self {
            collection_id,
            uri,
            kind: ClaimKind::Editing,
            moved_from: None,
        }
    }

    pub fn pending_delete(collection_id: CollectionId, uri: ContentUri) -> Self {
        Self {
            collection_id,
            uri,
            kind: ClaimKind::PendingDelete,
            moved_from: None,
        }
    }
}

/// Why a claim request was denied. Carries the blocking collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "collection", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockReason {
    MarkedByAnotherCollection(CollectionId),
    BeingEditedByAnotherCollection(CollectionId),
    AlreadyMarkedByThisCollection(CollectionId),
}

impl BlockReason {
    pub fn blocking_collection(&self) -> CollectionId {
        match *self {
            BlockReason::MarkedByAnotherCollection(id)
            | BlockReason::BeingEditedByAnotherCollection(id)
            | BlockReason::AlreadyMarkedByThisCollection(id) => id,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            BlockReason::MarkedByAnotherCollection(_) => "MARKED_BY_ANOTHER_COLLECTION",
            BlockReason::BeingEditedByAnotherCollection(_) => {
                "BEING_EDITED_BY_ANOTHER_COLLECTION"
            }
            BlockReason::AlreadyMarkedByThisCollection(_) => "ALREADY_MARKED_BY_THIS_COLLECTION",
        }
    }
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code(), self.blocking_collection())
    }
}

/// What a lock table does with a claim request, given the URI's current
/// holder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimDecision {
    /// No holder: record the claim.
    Insert,
    /// Same collection holds an edit claim; overwrite it with the request
    /// (edit becomes delete, or edit becomes a move destination).
    Replace,
    /// Same collection already holds an identical claim.
    Unchanged,
    Block(BlockReason),
}

/// Decide a claim request against the URI's current active claim.
///
/// Every storage backend calls this inside the same critical section that
/// applies the decision, so the check and the write are one atomic step.
pub fn decide_claim(existing: Option<&ContentItem>, request: &ContentItem) -> ClaimDecision {
    let Some(existing) = existing else {
        return ClaimDecision::Insert;
    };

    if existing.collection_id != request.collection_id {
        return ClaimDecision::Block(match existing.kind {
            ClaimKind::Editing => {
                BlockReason::BeingEditedByAnotherCollection(existing.collection_id)
            }
            ClaimKind::PendingDelete => {
                BlockReason::MarkedByAnotherCollection(existing.collection_id)
            }
        });
    }

    match (existing.kind, request.kind) {
        // A plain edit on a move destination keeps the move.
        (ClaimKind::Editing, ClaimKind::Editing)
            if request.moved_from.is_none() || existing.moved_from == request.moved_from =>
        {
            ClaimDecision::Unchanged
        }
        (ClaimKind::Editing, _) => ClaimDecision::Replace,
        (ClaimKind::PendingDelete, _) => ClaimDecision::Block(
            BlockReason::AlreadyMarkedByThisCollection(existing.collection_id),
        ),
    }
}
