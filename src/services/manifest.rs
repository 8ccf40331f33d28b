//! Manifest Builder.
//!
//! Derives the ordered file operations that realize a collection in the live
//! tree:
//!
//! 1. `MOVE live(from) -> live(to)` for each move, by destination URI
//! 2. `COPY workspace(uri) -> live(uri)` for each edit with a workspace copy
//! 3. `DELETE live(uri)` for each delete claim that is not a move source
//!
//! Moves run first so that a later COPY onto a move destination overwrites
//! the moved payload. Deletes run last so no path an earlier step reads from
//! has been removed. The output depends only on the held claims and which
//! workspace copies exist, both taken in URI order.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::Result;
use crate::interfaces::ContentStore;
use crate::model::{
    live_path, workspace_path, ClaimKind, CollectionId, ContentItem, ContentUri, FileOperation,
    Manifest,
};
use crate::storage::LockTable;

#[derive(Clone)]
pub struct ManifestBuilder {
    locks: Arc<dyn LockTable>,
    content: Arc<dyn ContentStore>,
}

impl ManifestBuilder {
    pub fn new(locks: Arc<dyn LockTable>, content: Arc<dyn ContentStore>) -> Self {
        Self { locks, content }
    }

    /// Build the manifest from the collection's current claims.
    pub async fn build(&self, collection_id: CollectionId) -> Result<Manifest> {
        let items = self.locks.held_by(collection_id).await?;

        let mut versioned = HashSet::new();
        for item in items.iter().filter(|i| i.kind == ClaimKind::Editing) {
            if self
                .content
                .exists(&workspace_path(collection_id, &item.uri))
                .await?
            {
                versioned.insert(item.uri.clone());
            }
        }

        Ok(plan(collection_id, &items, &versioned))
    }
}

/// Order `items` into a manifest. `versioned` holds the URIs that have a
/// workspace copy.
pub fn plan(
    collection_id: CollectionId,
    items: &[ContentItem],
    versioned: &HashSet<ContentUri>,
) -> Manifest {
    let mut items: Vec<&ContentItem> = items.iter().collect();
    items.sort_by(|a, b| a.uri.cmp(&b.uri));

    let mut move_sources = HashSet::new();
    let mut moves = Vec::new();
    let mut copies = Vec::new();
    let mut deletes = Vec::new();

    for item in &items {
        if item.kind != ClaimKind::Editing {
            continue;
        }
        if let Some(from) = &item.moved_from {
            move_sources.insert(from.clone());
            moves.push(FileOperation::move_to(live_path(from), live_path(&item.uri)));
        }
        if versioned.contains(&item.uri) {
            copies.push(FileOperation::copy(
                workspace_path(collection_id, &item.uri),
                live_path(&item.uri),
            ));
        }
    }

    for item in &items {
        if item.kind == ClaimKind::PendingDelete && !move_sources.contains(&item.uri) {
            deletes.push(FileOperation::delete(live_path(&item.uri)));
        }
    }

    let mut operations = moves;
    operations.append(&mut copies);
    operations.append(&mut deletes);
    Manifest::new(operations)
}
