//! CollectionStore interface tests.

use chrono::{Duration, TimeZone, Utc};

use galley::model::{
    Collection, CollectionId, CollectionStatus, CollectionType, NewCollection,
};
use galley::storage::{CollectionStore, StorageError};

fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", CollectionId::new())
}

fn make_collection(name: &str) -> Collection {
    NewCollection::manual(name)
        .into_collection()
        .expect("valid collection")
}

pub async fn test_create_and_get<S: CollectionStore>(store: &S) {
    let publish_date = Utc.with_ymd_and_hms(2030, 1, 31, 9, 30, 0).unwrap();
    let collection = NewCollection::scheduled(unique("Quarterly GDP"), publish_date)
        .with_release_uri("/releases/gdp-q4")
        .into_collection()
        .unwrap();

    store.create(&collection).await.expect("create should succeed");

    let stored = store
        .get(collection.id)
        .await
        .expect("get should succeed")
        .expect("collection should exist");
    assert_eq!(stored, collection);
    assert_eq!(stored.collection_type, CollectionType::Scheduled);
    assert_eq!(stored.publish_date, Some(publish_date));
}

pub async fn test_get_unknown<S: CollectionStore>(store: &S) {
    assert!(store.get(CollectionId::new()).await.unwrap().is_none());
}

pub async fn test_duplicate_name_is_case_insensitive<S: CollectionStore>(store: &S) {
    let name = unique("Labour Market");
    store.create(&make_collection(&name)).await.unwrap();

    let err = store
        .create(&make_collection(&name.to_uppercase()))
        .await
        .expect_err("duplicate name should be rejected");
    assert!(matches!(err, StorageError::DuplicateName(_)));
}

pub async fn test_name_reusable_after_delete<S: CollectionStore>(store: &S) {
    let name = unique("reuse");
    let first = make_collection(&name);
    store.create(&first).await.unwrap();
    assert!(store
        .compare_and_set_status(first.id, CollectionStatus::Created, CollectionStatus::Deleted)
        .await
        .unwrap());

    store
        .create(&make_collection(&name))
        .await
        .expect("name of a DELETED collection is free");
}

pub async fn test_compare_and_set_status<S: CollectionStore>(store: &S) {
    let collection = make_collection(&unique("cas"));
    store.create(&collection).await.unwrap();

    assert!(store
        .compare_and_set_status(
            collection.id,
            CollectionStatus::Created,
            CollectionStatus::Approved
        )
        .await
        .unwrap());

    // Stale expectation loses without writing.
    assert!(!store
        .compare_and_set_status(
            collection.id,
            CollectionStatus::Created,
            CollectionStatus::Deleted
        )
        .await
        .unwrap());

    let stored = store.get(collection.id).await.unwrap().unwrap();
    assert_eq!(stored.status, CollectionStatus::Approved);
}

pub async fn test_compare_and_set_unknown<S: CollectionStore>(store: &S) {
    let result = store
        .compare_and_set_status(
            CollectionId::new(),
            CollectionStatus::Created,
            CollectionStatus::Approved,
        )
        .await;
    assert!(matches!(result, Err(StorageError::NotFound(_))));
}

pub async fn test_list_by_status_oldest_first<S: CollectionStore>(store: &S) {
    let base = Utc::now() + Duration::days(365);
    let mut ids = Vec::new();
    for offset in [2, 0, 1] {
        let mut collection = make_collection(&unique("listed"));
        collection.created_at = base + Duration::seconds(offset);
        store.create(&collection).await.unwrap();
        store
            .compare_and_set_status(
                collection.id,
                CollectionStatus::Created,
                CollectionStatus::Errored,
            )
            .await
            .unwrap();
        ids.push((offset, collection.id));
    }
    ids.sort();
    let expected: Vec<CollectionId> = ids.into_iter().map(|(_, id)| id).collect();

    let listed: Vec<CollectionId> = store
        .list_by_status(CollectionStatus::Errored)
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .filter(|id| expected.contains(id))
        .collect();
    assert_eq!(listed, expected);

    let all = store.list().await.unwrap();
    assert!(expected.iter().all(|id| all.iter().any(|c| c.id == *id)));
}

pub async fn test_update_details<S: CollectionStore>(store: &S) {
    let collection = make_collection(&unique("draft"));
    store.create(&collection).await.unwrap();

    let mut renamed = collection.clone();
    renamed.name = unique("final");
    renamed.release_uri = Some("/releases/final".to_string());
    assert!(store.update_details(&renamed).await.unwrap());

    let stored = store.get(collection.id).await.unwrap().unwrap();
    assert_eq!(stored.name, renamed.name);
    assert_eq!(stored.release_uri.as_deref(), Some("/releases/final"));
    assert_eq!(stored.status, CollectionStatus::Created);
}

pub async fn test_update_details_checks_status<S: CollectionStore>(store: &S) {
    let collection = make_collection(&unique("moving"));
    store.create(&collection).await.unwrap();
    store
        .compare_and_set_status(
            collection.id,
            CollectionStatus::Created,
            CollectionStatus::Approved,
        )
        .await
        .unwrap();

    // Validated against CREATED, but the collection is now APPROVED.
    let mut stale = collection.clone();
    stale.name = unique("stale");
    assert!(!store.update_details(&stale).await.unwrap());
    assert_eq!(
        store.get(collection.id).await.unwrap().unwrap().name,
        collection.name
    );
}

pub async fn test_update_details_rejects_taken_name<S: CollectionStore>(store: &S) {
    let taken = make_collection(&unique("taken"));
    let other = make_collection(&unique("other"));
    store.create(&taken).await.unwrap();
    store.create(&other).await.unwrap();

    let mut clash = other.clone();
    clash.name = taken.name.to_lowercase();
    let err = store.update_details(&clash).await.unwrap_err();
    assert!(matches!(err, StorageError::DuplicateName(_)));

    // Renaming to its own name in another case is fine.
    let mut recased = other.clone();
    recased.name = other.name.to_uppercase();
    assert!(store.update_details(&recased).await.unwrap());
}

/// Run all CollectionStore tests against a store implementation.
#[macro_export]
macro_rules! run_collection_store_tests {
    ($store:expr) => {
        use $crate::storage::collection_store_tests::*;

        test_create_and_get($store).await;
        println!("  test_create_and_get: PASSED");

        test_get_unknown($store).await;
        println!("  test_get_unknown: PASSED");

        test_duplicate_name_is_case_insensitive($store).await;
        println!("  test_duplicate_name_is_case_insensitive: PASSED");

        test_name_reusable_after_delete($store).await;
        println!("  test_name_reusable_after_delete: PASSED");

        test_compare_and_set_status($store).await;
        println!("  test_compare_and_set_status: PASSED");

        test_compare_and_set_unknown($store).await;
        println!("  test_compare_and_set_unknown: PASSED");

        test_list_by_status_oldest_first($store).await;
        println!("  test_list_by_status_oldest_first: PASSED");

        test_update_details($store).await;
        println!("  test_update_details: PASSED");

        test_update_details_checks_status($store).await;
        println!("  test_update_details_checks_status: PASSED");

        test_update_details_rejects_taken_name($store).await;
        println!("  test_update_details_rejects_taken_name: PASSED");
    };
}
