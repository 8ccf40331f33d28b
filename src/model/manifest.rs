//! Publish manifests: the ordered file operations realizing a collection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{CollectionId, ContentUri, ParseError};

/// Root of the published content tree.
pub const LIVE_ROOT: &str = "live";
/// Root of per-collection private workspaces.
pub const WORKSPACE_ROOT: &str = "collections";

/// Store path of the live copy of `uri`.
pub fn live_path(uri: &ContentUri) -> String {
    format!("{LIVE_ROOT}{uri}")
}

/// Store path of `uri` inside a collection's workspace.
pub fn workspace_path(collection_id: CollectionId, uri: &ContentUri) -> String {
    format!("{WORKSPACE_ROOT}/{collection_id}{uri}")
}

/// URI of a live path, or `None` for paths outside the live tree.
pub fn uri_from_live_path(path: &str) -> Option<ContentUri> {
    let rest = path.strip_prefix(LIVE_ROOT)?;
    if !rest.starts_with('/') {
        return None;
    }
    ContentUri::parse(rest).ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationKind {
    Copy,
    Move,
    Delete,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Copy => "COPY",
            OperationKind::Move => "MOVE",
            OperationKind::Delete => "DELETE",
        }
    }
}

impl FromStr for OperationKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "COPY" => Ok(OperationKind::Copy),
            "MOVE" => Ok(OperationKind::Move),
            "DELETE" => Ok(OperationKind::Delete),
            other => Err(ParseError::new("operation kind", other)),
        }
    }
}

/// One step of a manifest.
///
/// `source` is `None` for DELETE, which acts on `destination`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileOperation {
    pub kind: OperationKind,
    pub source: Option<String>,
    pub destination: String,
}

impl FileOperation {
    pub fn copy(source: String, destination: String) -> Self {
        Self {
            kind: OperationKind::Copy,
            source: Some(source),
            destination,
        }
    }

    pub fn move_to(source: String, destination: String) -> Self {
        Self {
            kind: OperationKind::Move,
            source: Some(source),
            destination,
        }
    }

    pub fn delete(destination: String) -> Self {
        Self {
            kind: OperationKind::Delete,
            source: None,
            destination,
        }
    }
}

impl fmt::Display for FileOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{} {} -> {}", self.kind.as_str(), source, self.destination),
            None => write!(f, "{} {}", self.kind.as_str(), self.destination),
        }
    }
}

/// Ordered list of file operations. Serializes as a plain JSON list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    pub operations: Vec<FileOperation>,
}

impl Manifest {
    pub fn new(operations: Vec<FileOperation>) -> Self {
        Self { operations }
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// SHA-256 over the ordered operations, hex encoded.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for op in &self.operations {
            hasher.update(op.kind.as_str().as_bytes());
            hasher.update([0u8]);
            hasher.update(op.source.as_deref().unwrap_or_default().as_bytes());
            hasher.update([0u8]);
            hasher.update(op.destination.as_bytes());
            hasher.update([0xffu8]);
        }
        hex::encode(hasher.finalize())
    }
}

/// A manifest saved before publishing, with the number of operations already
/// confirmed applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedManifest {
    pub collection_id: CollectionId,
    pub manifest: Manifest,
    /// Index of the first unconfirmed operation.
    pub applied: usize,
}

impl PersistedManifest {
    pub fn new(collection_id: CollectionId, manifest: Manifest) -> Self {
        Self {
            collection_id,
            manifest,
            applied: 0,
        }
    }

    pub fn remaining(&self) -> &[FileOperation] {
        self.manifest
            .operations
            .get(self.applied..)
            .unwrap_or_default()
    }
}
