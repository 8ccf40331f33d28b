//! In-memory LockTable + CollectionStore.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::model::{
    decide_claim, name_key, ClaimDecision, Collection, CollectionId, CollectionStatus,
    ContentItem, ContentUri, WorkflowAction,
};
use crate::storage::{ClaimOutcome, CollectionStore, LockTable, Result, StorageError};

/// Membership entry; `held` is false once the claim has been released.
struct StoredItem {
    item: ContentItem,
    held: bool,
}

#[derive(Default)]
struct State {
    collections: HashMap<CollectionId, Collection>,
    items: BTreeMap<(CollectionId, ContentUri), StoredItem>,
    /// Active claim holder per URI.
    holders: HashMap<ContentUri, CollectionId>,
}

impl State {
    fn holder(&self, uri: &ContentUri) -> Option<&ContentItem> {
        let collection_id = self.holders.get(uri)?;
        self.items
            .get(&(*collection_id, uri.clone()))
            .filter(|stored| stored.held)
            .map(|stored| &stored.item)
    }

    fn put_held(&mut self, item: ContentItem) {
        self.holders.insert(item.uri.clone(), item.collection_id);
        self.items.insert(
            (item.collection_id, item.uri.clone()),
            StoredItem { item, held: true },
        );
    }

    fn name_taken(&self, name: &str, except: Option<CollectionId>) -> bool {
        let key = name_key(name);
        self.collections.values().any(|c| {
            Some(c.id) != except && c.status != CollectionStatus::Deleted && c.name_key() == key
        })
    }

    fn sorted<'a>(collections: impl Iterator<Item = &'a Collection>) -> Vec<Collection> {
        let mut list: Vec<Collection> = collections.cloned().collect();
        list.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        list
    }
}

/// In-memory store holding claims, membership and collections under one lock.
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
    fail_on_claim: RwLock<bool>,
    fail_on_release: RwLock<bool>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail_on_claim(&self, fail: bool) {
        *self.fail_on_claim.write().await = fail;
    }

    pub async fn set_fail_on_release(&self, fail: bool) {
        *self.fail_on_release.write().await = fail;
    }
}

#[async_trait]
impl LockTable for InMemoryStore {
    async fn claim(&self, requests: &[ContentItem]) -> Result<ClaimOutcome> {
        if *self.fail_on_claim.read().await {
            return Err(StorageError::Unavailable("claim disabled".to_string()));
        }
        let Some(first) = requests.first() else {
            return Ok(ClaimOutcome::Applied(Vec::new()));
        };
        let collection_id = first.collection_id;
        if requests.iter().any(|r| r.collection_id != collection_id) {
            return Err(StorageError::Inconsistent(
                "claim batch spans collections".to_string(),
            ));
        }

        let mut state = self.state.write().await;

        let Some(collection) = state.collections.get(&collection_id) else {
            return Ok(ClaimOutcome::CollectionNotFound);
        };
        if collection.status.apply(WorkflowAction::EditContent).is_none() {
            return Ok(ClaimOutcome::NotEditable(collection.status));
        }

        let mut decisions = Vec::with_capacity(requests.len());
        for request in requests {
            match decide_claim(state.holder(&request.uri), request) {
                ClaimDecision::Block(reason) => {
                    return Ok(ClaimOutcome::Blocked {
                        uri: request.uri.clone(),
                        reason,
                    });
                }
                decision => decisions.push(decision),
            }
        }

        for (request, decision) in requests.iter().zip(&decisions) {
            if *decision != ClaimDecision::Unchanged {
                state.put_held(request.clone());
            }
        }

        Ok(ClaimOutcome::Applied(decisions))
    }

    async fn holder_of(&self, uri: &ContentUri) -> Result<Option<ContentItem>> {
        let state = self.state.read().await;
        Ok(state.holder(uri).cloned())
    }

    async fn items_of(&self, collection_id: CollectionId) -> Result<Vec<ContentItem>> {
        let state = self.state.read().await;
        Ok(state
            .items
            .iter()
            .filter(|((c, _), _)| *c == collection_id)
            .map(|(_, stored)| stored.item.clone())
            .collect())
    }

    async fn held_by(&self, collection_id: CollectionId) -> Result<Vec<ContentItem>> {
        let state = self.state.read().await;
        Ok(state
            .items
            .iter()
            .filter(|((c, _), stored)| *c == collection_id && stored.held)
            .map(|(_, stored)| stored.item.clone())
            .collect())
    }

    async fn remove(&self, collection_id: CollectionId, uris: &[ContentUri]) -> Result<usize> {
        let mut state = self.state.write().await;
        let mut removed = 0;
        for uri in uris {
            if let Some(stored) = state.items.remove(&(collection_id, uri.clone())) {
                if stored.held && state.holders.get(uri) == Some(&collection_id) {
                    state.holders.remove(uri);
                }
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn release(&self, collection_id: CollectionId) -> Result<usize> {
        if *self.fail_on_release.read().await {
            return Err(StorageError::Unavailable("release disabled".to_string()));
        }
        let mut state = self.state.write().await;
        let State { items, holders, .. } = &mut *state;

        let mut released = 0;
        for ((c, uri), stored) in items.iter_mut() {
            if *c == collection_id && stored.held {
                stored.held = false;
                holders.remove(uri);
                released += 1;
            }
        }
        Ok(released)
    }
}

#[async_trait]
impl CollectionStore for InMemoryStore {
    async fn create(&self, collection: &Collection) -> Result<()> {
        let mut state = self.state.write().await;
        if state.name_taken(&collection.name, None) {
            return Err(StorageError::DuplicateName(collection.name.clone()));
        }
        state.collections.insert(collection.id, collection.clone());
        Ok(())
    }

    async fn get(&self, id: CollectionId) -> Result<Option<Collection>> {
        let state = self.state.read().await;
        Ok(state.collections.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Collection>> {
        let state = self.state.read().await;
        Ok(State::sorted(state.collections.values()))
    }

    async fn list_by_status(&self, status: CollectionStatus) -> Result<Vec<Collection>> {
        let state = self.state.read().await;
        Ok(State::sorted(
            state.collections.values().filter(|c| c.status == status),
        ))
    }

    async fn compare_and_set_status(
        &self,
        id: CollectionId,
        expected: CollectionStatus,
        next: CollectionStatus,
    ) -> Result<bool> {
        let mut state = self.state.write().await;
        let collection = state
            .collections
            .get_mut(&id)
            .ok_or(StorageError::NotFound(id))?;
        if collection.status != expected {
            return Ok(false);
        }
        collection.status = next;
        Ok(true)
    }

    async fn update_details(&self, collection: &Collection) -> Result<bool> {
        let mut state = self.state.write().await;
        match state.collections.get(&collection.id) {
            None => return Err(StorageError::NotFound(collection.id)),
            Some(stored) if stored.status != collection.status => return Ok(false),
            Some(_) => {}
        }
        if state.name_taken(&collection.name, Some(collection.id)) {
            return Err(StorageError::DuplicateName(collection.name.clone()));
        }
        if let Some(stored) = state.collections.get_mut(&collection.id) {
            stored.name = collection.name.clone();
            stored.collection_type = collection.collection_type;
            stored.publish_date = collection.publish_date;
            stored.release_uri = collection.release_uri.clone();
        }
        Ok(true)
    }
}
