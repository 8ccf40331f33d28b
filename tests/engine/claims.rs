//! Content claims through the collection operations.

use galley::model::{
    workspace_path, BlockReason, ClaimDecision, ClaimKind, CollectionId, CollectionStatus,
    WorkflowAction,
};
use galley::{EngineError, NotFound};

use crate::common::{uri, Harness, APPROVER, EDITOR};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_claims_have_one_winner() {
    let h = Harness::new();
    let target = uri("/economy/inflation");

    let mut ids = Vec::new();
    for i in 0..16 {
        ids.push(h.create(&format!("contender {i}")).await);
    }

    let tasks = ids.iter().map(|&id| {
        let engine = h.engine.clone();
        let target = target.clone();
        tokio::spawn(async move {
            engine
                .collections()
                .add_content(id, &target, b"draft", EDITOR)
                .await
                .map(|_| id)
        })
    });
    let results: Vec<_> = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.expect("task should not panic"))
        .collect();

    let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1);
    let winner = *winners[0];

    for result in &results {
        if let Err(e) = result {
            assert_eq!(
                e.block_reason(),
                Some(BlockReason::BeingEditedByAnotherCollection(winner))
            );
        }
    }

    let holder = h.engine.locks().holder_of(&target).await.unwrap().unwrap();
    assert_eq!(holder.collection_id, winner);
}

#[tokio::test]
async fn test_second_collection_is_blocked() {
    let h = Harness::new();
    let a = h.create("census").await;
    let b = h.create("labour").await;
    let edited = uri("/people/population");
    let marked = uri("/people/migration");

    h.engine
        .collections()
        .add_content(a, &edited, b"v2", EDITOR)
        .await
        .unwrap();
    h.content.insert_live(&marked, "old").await;
    h.engine
        .collections()
        .mark_for_delete(a, &marked, EDITOR)
        .await
        .unwrap();

    let err = h
        .engine
        .collections()
        .add_content(b, &edited, b"rival", EDITOR)
        .await
        .unwrap_err();
    assert_eq!(
        err.block_reason(),
        Some(BlockReason::BeingEditedByAnotherCollection(a))
    );
    assert_eq!(err.status().code(), 409);

    let err = h
        .engine
        .collections()
        .mark_for_delete(b, &edited, EDITOR)
        .await
        .unwrap_err();
    assert_eq!(
        err.block_reason(),
        Some(BlockReason::BeingEditedByAnotherCollection(a))
    );

    let err = h
        .engine
        .collections()
        .add_content(b, &marked, b"rival", EDITOR)
        .await
        .unwrap_err();
    assert_eq!(
        err.block_reason(),
        Some(BlockReason::MarkedByAnotherCollection(a))
    );

    assert!(h.engine.collections().items(b).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_duplicate_delete_is_rejected() {
    let h = Harness::new();
    let a = h.create("cleanup").await;
    let target = uri("/archive/2019");

    let decision = h
        .engine
        .collections()
        .mark_for_delete(a, &target, EDITOR)
        .await
        .unwrap();
    assert_eq!(decision, ClaimDecision::Insert);

    let err = h
        .engine
        .collections()
        .mark_for_delete(a, &target, EDITOR)
        .await
        .unwrap_err();
    assert_eq!(
        err.block_reason(),
        Some(BlockReason::AlreadyMarkedByThisCollection(a))
    );

    // Editing content already marked for deletion is refused the same way.
    let err = h
        .engine
        .collections()
        .add_content(a, &target, b"revive", EDITOR)
        .await
        .unwrap_err();
    assert_eq!(
        err.block_reason(),
        Some(BlockReason::AlreadyMarkedByThisCollection(a))
    );
}

#[tokio::test]
async fn test_delete_replaces_own_edit() {
    let h = Harness::new();
    let a = h.create("second thoughts").await;
    let target = uri("/business/retail");

    h.engine
        .collections()
        .add_content(a, &target, b"edit", EDITOR)
        .await
        .unwrap();
    let decision = h
        .engine
        .collections()
        .mark_for_delete(a, &target, EDITOR)
        .await
        .unwrap();
    assert_eq!(decision, ClaimDecision::Replace);

    assert!(h.content.get(&workspace_path(a, &target)).await.is_none());
    let items = h.engine.collections().items(a).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].kind, ClaimKind::PendingDelete);
}

#[tokio::test]
async fn test_remove_content_frees_uri() {
    let h = Harness::new();
    let a = h.create("undo").await;
    let b = h.create("next").await;
    let target = uri("/health/deaths");

    h.engine
        .collections()
        .add_content(a, &target, b"a", EDITOR)
        .await
        .unwrap();
    h.engine
        .collections()
        .remove_content(a, &target, EDITOR)
        .await
        .unwrap();

    assert!(h.content.get(&workspace_path(a, &target)).await.is_none());
    assert!(h.engine.collections().items(a).await.unwrap().is_empty());

    let err = h
        .engine
        .collections()
        .remove_content(a, &target, EDITOR)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(NotFound::Content { .. })));

    let decision = h
        .engine
        .collections()
        .add_content(b, &target, b"b", EDITOR)
        .await
        .unwrap();
    assert_eq!(decision, ClaimDecision::Insert);
}

#[tokio::test]
async fn test_claims_closed_until_reopened() {
    let h = Harness::new();
    let a = h.create("frozen").await;
    h.engine.workflow().approve(a, APPROVER).await.unwrap();

    let target = uri("/late/change");
    let err = h
        .engine
        .collections()
        .add_content(a, &target, b"late", EDITOR)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::InvalidTransition {
            from: CollectionStatus::Approved,
            action: WorkflowAction::EditContent,
            ..
        }
    ));

    h.engine.workflow().reopen(a, APPROVER).await.unwrap();
    h.engine
        .collections()
        .add_content(a, &target, b"late", EDITOR)
        .await
        .expect("reopened collection accepts content");
}

#[tokio::test]
async fn test_move_claims_both_ends() {
    let h = Harness::new();
    let a = h.create("restructure").await;
    let b = h.create("bystander").await;
    let from = uri("/economy/old-name");
    let to = uri("/economy/new-name");

    // Source must be published.
    let err = h
        .engine
        .collections()
        .move_content(a, &from, &to, EDITOR)
        .await
        .unwrap_err();
    assert_eq!(err.status().code(), 404);

    h.content.insert_live(&from, "payload").await;
    h.content.insert_live(&uri("/economy/taken"), "x").await;
    let err = h
        .engine
        .collections()
        .move_content(a, &from, &uri("/economy/taken"), EDITOR)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    h.engine
        .collections()
        .move_content(a, &from, &to, EDITOR)
        .await
        .unwrap();

    for claimed in [&from, &to] {
        let err = h
            .engine
            .collections()
            .add_content(b, claimed, b"x", EDITOR)
            .await
            .unwrap_err();
        assert_eq!(err.block_reason().map(|r| r.blocking_collection()), Some(a));
    }

    // The destination reads through to the live source.
    let bytes = h.engine.collections().read_content(a, &to).await.unwrap();
    assert_eq!(bytes, b"payload");

    // Removing the destination drops the whole move.
    h.engine
        .collections()
        .remove_content(a, &to, EDITOR)
        .await
        .unwrap();
    assert!(h.engine.locks().holder_of(&from).await.unwrap().is_none());
    assert!(h.engine.locks().holder_of(&to).await.unwrap().is_none());
}

#[tokio::test]
async fn test_read_content_prefers_workspace() {
    let h = Harness::new();
    let a = h.create("reader").await;
    let edited = uri("/read/edited");
    let untouched = uri("/read/untouched");
    let doomed = uri("/read/doomed");

    h.content.insert_live(&edited, "live").await;
    h.content.insert_live(&untouched, "live").await;
    h.content.insert_live(&doomed, "live").await;

    h.engine
        .collections()
        .add_content(a, &edited, b"draft", EDITOR)
        .await
        .unwrap();
    h.engine
        .collections()
        .mark_for_delete(a, &doomed, EDITOR)
        .await
        .unwrap();

    let collections = h.engine.collections();
    assert_eq!(collections.read_content(a, &edited).await.unwrap(), b"draft");
    assert_eq!(collections.read_content(a, &untouched).await.unwrap(), b"live");

    let err = collections.read_content(a, &doomed).await.unwrap_err();
    assert_eq!(err.status().code(), 404);
    let err = collections
        .read_content(a, &uri("/read/missing"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(NotFound::Content { .. })));
}

#[tokio::test]
async fn test_read_content_of_unknown_collection() {
    let h = Harness::new();
    let target = uri("/economy/gdp");
    h.content.insert_live(&target, "live").await;

    let missing = CollectionId::new();
    let err = h
        .engine
        .collections()
        .read_content(missing, &target)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(NotFound::Collection(id)) if id == missing));
}
