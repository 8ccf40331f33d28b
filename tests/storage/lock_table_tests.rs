//! LockTable interface tests.
//!
//! These tests verify the claim decision table, all-or-nothing batches and
//! idempotent release. Each storage implementation should run these tests.

use galley::model::{
    BlockReason, ClaimDecision, ClaimKind, CollectionId, CollectionStatus, ContentItem,
    ContentUri, NewCollection,
};
use galley::storage::{ClaimOutcome, CollectionStore, LockTable};

pub fn uri(raw: &str) -> ContentUri {
    ContentUri::parse(raw).expect("valid uri")
}

/// Create a CREATED collection with a unique name.
pub async fn open_collection<S: CollectionStore>(store: &S, prefix: &str) -> CollectionId {
    let name = format!("{prefix}-{}", CollectionId::new());
    let collection = NewCollection::manual(name)
        .into_collection()
        .expect("valid collection");
    store.create(&collection).await.expect("create should succeed");
    collection.id
}

async fn claim_ok<S: LockTable>(store: &S, requests: &[ContentItem]) -> Vec<ClaimDecision> {
    match store.claim(requests).await.expect("claim should succeed") {
        ClaimOutcome::Applied(decisions) => decisions,
        other => panic!("expected Applied, got {other:?}"),
    }
}

// =============================================================================
// Decision table
// =============================================================================

pub async fn test_claim_unclaimed<S: LockTable + CollectionStore>(store: &S) {
    let a = open_collection(store, "unclaimed").await;
    let target = uri("/lock/unclaimed");

    let decisions = claim_ok(store, &[ContentItem::editing(a, target.clone())]).await;
    assert_eq!(decisions, vec![ClaimDecision::Insert]);

    let holder = store
        .holder_of(&target)
        .await
        .expect("holder_of should succeed")
        .expect("claim should be held");
    assert_eq!(holder.collection_id, a);
    assert_eq!(holder.kind, ClaimKind::Editing);
}

pub async fn test_reclaim_own_edit_is_unchanged<S: LockTable + CollectionStore>(store: &S) {
    let a = open_collection(store, "reclaim").await;
    let target = uri("/lock/reclaim");

    claim_ok(store, &[ContentItem::editing(a, target.clone())]).await;
    let decisions = claim_ok(store, &[ContentItem::editing(a, target)]).await;
    assert_eq!(decisions, vec![ClaimDecision::Unchanged]);
    assert_eq!(store.held_by(a).await.unwrap().len(), 1);
}

pub async fn test_other_collection_blocked<S: LockTable + CollectionStore>(store: &S) {
    let a = open_collection(store, "blocked-a").await;
    let b = open_collection(store, "blocked-b").await;
    let edited = uri("/lock/edited");
    let marked = uri("/lock/marked");

    claim_ok(store, &[ContentItem::editing(a, edited.clone())]).await;
    claim_ok(store, &[ContentItem::pending_delete(a, marked.clone())]).await;

    for request in [
        ContentItem::editing(b, edited.clone()),
        ContentItem::pending_delete(b, edited.clone()),
    ] {
        let outcome = store.claim(&[request]).await.unwrap();
        assert_eq!(
            outcome,
            ClaimOutcome::Blocked {
                uri: edited.clone(),
                reason: BlockReason::BeingEditedByAnotherCollection(a),
            }
        );
    }

    for request in [
        ContentItem::editing(b, marked.clone()),
        ContentItem::pending_delete(b, marked.clone()),
    ] {
        let outcome = store.claim(&[request]).await.unwrap();
        assert_eq!(
            outcome,
            ClaimOutcome::Blocked {
                uri: marked.clone(),
                reason: BlockReason::MarkedByAnotherCollection(a),
            }
        );
    }

    assert!(store.held_by(b).await.unwrap().is_empty());
}

pub async fn test_delete_upgrades_own_edit<S: LockTable + CollectionStore>(store: &S) {
    let a = open_collection(store, "upgrade").await;
    let target = uri("/lock/upgrade");

    claim_ok(store, &[ContentItem::editing(a, target.clone())]).await;
    let decisions = claim_ok(store, &[ContentItem::pending_delete(a, target.clone())]).await;
    assert_eq!(decisions, vec![ClaimDecision::Replace]);

    let holder = store.holder_of(&target).await.unwrap().unwrap();
    assert_eq!(holder.kind, ClaimKind::PendingDelete);
    assert_eq!(store.items_of(a).await.unwrap().len(), 1);
}

pub async fn test_own_delete_blocks_further_claims<S: LockTable + CollectionStore>(store: &S) {
    let a = open_collection(store, "marked-twice").await;
    let target = uri("/lock/marked-twice");

    claim_ok(store, &[ContentItem::pending_delete(a, target.clone())]).await;

    for request in [
        ContentItem::pending_delete(a, target.clone()),
        ContentItem::editing(a, target.clone()),
    ] {
        let outcome = store.claim(&[request]).await.unwrap();
        assert_eq!(
            outcome,
            ClaimOutcome::Blocked {
                uri: target.clone(),
                reason: BlockReason::AlreadyMarkedByThisCollection(a),
            }
        );
    }
}

pub async fn test_move_destination_survives_plain_edit<S: LockTable + CollectionStore>(
    store: &S,
) {
    let a = open_collection(store, "move-edit").await;
    let from = uri("/lock/move/from");
    let to = uri("/lock/move/to");

    let destination = ContentItem {
        moved_from: Some(from.clone()),
        ..ContentItem::editing(a, to.clone())
    };
    claim_ok(
        store,
        &[ContentItem::pending_delete(a, from.clone()), destination],
    )
    .await;

    let decisions = claim_ok(store, &[ContentItem::editing(a, to.clone())]).await;
    assert_eq!(decisions, vec![ClaimDecision::Unchanged]);

    let holder = store.holder_of(&to).await.unwrap().unwrap();
    assert_eq!(holder.moved_from, Some(from));
}

// =============================================================================
// Batches and collection status
// =============================================================================

pub async fn test_batch_is_all_or_nothing<S: LockTable + CollectionStore>(store: &S) {
    let a = open_collection(store, "batch-a").await;
    let b = open_collection(store, "batch-b").await;
    let free = uri("/lock/batch/free");
    let taken = uri("/lock/batch/taken");

    claim_ok(store, &[ContentItem::editing(b, taken.clone())]).await;

    let outcome = store
        .claim(&[
            ContentItem::pending_delete(a, free.clone()),
            ContentItem::editing(a, taken.clone()),
        ])
        .await
        .unwrap();
    assert!(matches!(outcome, ClaimOutcome::Blocked { uri: blocked, .. } if blocked == taken));

    assert!(store.holder_of(&free).await.unwrap().is_none());
    assert!(store.items_of(a).await.unwrap().is_empty());
}

pub async fn test_claim_requires_created<S: LockTable + CollectionStore>(store: &S) {
    let a = open_collection(store, "approved").await;
    store
        .compare_and_set_status(a, CollectionStatus::Created, CollectionStatus::Approved)
        .await
        .unwrap();

    let outcome = store
        .claim(&[ContentItem::editing(a, uri("/lock/approved"))])
        .await
        .unwrap();
    assert_eq!(outcome, ClaimOutcome::NotEditable(CollectionStatus::Approved));
}

pub async fn test_claim_unknown_collection<S: LockTable>(store: &S) {
    let outcome = store
        .claim(&[ContentItem::editing(CollectionId::new(), uri("/lock/orphan"))])
        .await
        .unwrap();
    assert_eq!(outcome, ClaimOutcome::CollectionNotFound);
}

// =============================================================================
// Release and removal
// =============================================================================

pub async fn test_release_is_idempotent<S: LockTable + CollectionStore>(store: &S) {
    let a = open_collection(store, "release-a").await;
    let b = open_collection(store, "release-b").await;
    let first = uri("/lock/release/1");
    let second = uri("/lock/release/2");

    claim_ok(store, &[ContentItem::editing(a, first.clone())]).await;
    claim_ok(store, &[ContentItem::pending_delete(a, second.clone())]).await;

    assert_eq!(store.release(a).await.unwrap(), 2);
    assert_eq!(store.release(a).await.unwrap(), 0);

    assert!(store.holder_of(&first).await.unwrap().is_none());
    assert!(store.held_by(a).await.unwrap().is_empty());
    assert_eq!(store.items_of(a).await.unwrap().len(), 2);

    // Released URIs are free for other collections.
    let decisions = claim_ok(store, &[ContentItem::editing(b, first.clone())]).await;
    assert_eq!(decisions, vec![ClaimDecision::Insert]);
    assert_eq!(store.holder_of(&first).await.unwrap().unwrap().collection_id, b);
}

pub async fn test_remove_drops_membership<S: LockTable + CollectionStore>(store: &S) {
    let a = open_collection(store, "remove").await;
    let kept = uri("/lock/remove/kept");
    let dropped = uri("/lock/remove/dropped");

    claim_ok(store, &[ContentItem::editing(a, kept.clone())]).await;
    claim_ok(store, &[ContentItem::editing(a, dropped.clone())]).await;

    let removed = store
        .remove(a, &[dropped.clone(), uri("/lock/remove/unknown")])
        .await
        .unwrap();
    assert_eq!(removed, 1);
    assert_eq!(store.remove(a, &[dropped.clone()]).await.unwrap(), 0);

    assert!(store.holder_of(&dropped).await.unwrap().is_none());
    let items = store.items_of(a).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].uri, kept);
}

pub async fn test_held_by_is_ordered_by_uri<S: LockTable + CollectionStore>(store: &S) {
    let a = open_collection(store, "ordered").await;
    for raw in ["/lock/order/c", "/lock/order/a", "/lock/order/b"] {
        claim_ok(store, &[ContentItem::editing(a, uri(raw))]).await;
    }

    let uris: Vec<String> = store
        .held_by(a)
        .await
        .unwrap()
        .into_iter()
        .map(|item| item.uri.to_string())
        .collect();
    assert_eq!(uris, vec!["/lock/order/a", "/lock/order/b", "/lock/order/c"]);
}

/// Run all LockTable tests against a store implementation.
#[macro_export]
macro_rules! run_lock_table_tests {
    ($store:expr) => {
        use $crate::storage::lock_table_tests::*;

        // decision table
        test_claim_unclaimed($store).await;
        println!("  test_claim_unclaimed: PASSED");

        test_reclaim_own_edit_is_unchanged($store).await;
        println!("  test_reclaim_own_edit_is_unchanged: PASSED");

        test_other_collection_blocked($store).await;
        println!("  test_other_collection_blocked: PASSED");

        test_delete_upgrades_own_edit($store).await;
        println!("  test_delete_upgrades_own_edit: PASSED");

        test_own_delete_blocks_further_claims($store).await;
        println!("  test_own_delete_blocks_further_claims: PASSED");

        test_move_destination_survives_plain_edit($store).await;
        println!("  test_move_destination_survives_plain_edit: PASSED");

        // batches and status
        test_batch_is_all_or_nothing($store).await;
        println!("  test_batch_is_all_or_nothing: PASSED");

        test_claim_requires_created($store).await;
        println!("  test_claim_requires_created: PASSED");

        test_claim_unknown_collection($store).await;
        println!("  test_claim_unknown_collection: PASSED");

        // release and removal
        test_release_is_idempotent($store).await;
        println!("  test_release_is_idempotent: PASSED");

        test_remove_drops_membership($store).await;
        println!("  test_remove_drops_membership: PASSED");

        test_held_by_is_ordered_by_uri($store).await;
        println!("  test_held_by_is_ordered_by_uri: PASSED");
    };
}
