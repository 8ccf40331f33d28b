//! AuditStore interface tests.

use chrono::{Duration, Utc};

use galley::model::{CollectionEvent, CollectionId, EventType};
use galley::storage::AuditStore;

pub async fn test_history_empty<S: AuditStore>(store: &S) {
    let history = store.history(CollectionId::new()).await.unwrap();
    assert!(history.is_empty());
}

pub async fn test_history_preserves_fields<S: AuditStore>(store: &S) {
    let id = CollectionId::new();
    let event = CollectionEvent::new(id, EventType::ContentMoved, "editor@example.com")
        .with_detail("/a -> /b");
    store.append(&event).await.expect("append should succeed");

    let history = store.history(id).await.unwrap();
    assert_eq!(history, vec![event]);
}

pub async fn test_history_ordered_by_timestamp<S: AuditStore>(store: &S) {
    let id = CollectionId::new();
    let now = Utc::now();

    let mut late = CollectionEvent::new(id, EventType::Approved, "b@example.com");
    late.timestamp = now + Duration::seconds(5);
    let mut early = CollectionEvent::new(id, EventType::Created, "a@example.com");
    early.timestamp = now;

    store.append(&late).await.unwrap();
    store.append(&early).await.unwrap();

    let types: Vec<EventType> = store
        .history(id)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.event_type)
        .collect();
    assert_eq!(types, vec![EventType::Created, EventType::Approved]);
}

pub async fn test_equal_timestamps_keep_insertion_order<S: AuditStore>(store: &S) {
    let id = CollectionId::new();
    let at = Utc::now();
    let sequence = [
        EventType::PublishStarted,
        EventType::PublishFailed,
        EventType::PublishRetried,
    ];

    for event_type in sequence {
        let mut event = CollectionEvent::new(id, event_type, "system");
        event.timestamp = at;
        store.append(&event).await.unwrap();
    }

    let types: Vec<EventType> = store
        .history(id)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.event_type)
        .collect();
    assert_eq!(types, sequence.to_vec());
}

pub async fn test_history_isolated_per_collection<S: AuditStore>(store: &S) {
    let a = CollectionId::new();
    let b = CollectionId::new();
    store
        .append(&CollectionEvent::new(a, EventType::Created, "a@example.com"))
        .await
        .unwrap();
    store
        .append(&CollectionEvent::new(b, EventType::Created, "b@example.com"))
        .await
        .unwrap();

    let history = store.history(a).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].collection_id, a);
}

pub async fn test_most_recent_of_type<S: AuditStore>(store: &S) {
    let a = CollectionId::new();
    let b = CollectionId::new();
    // Far future so events from other tests sharing the store never win.
    let base = Utc::now() + Duration::days(3650);

    let mut older = CollectionEvent::new(a, EventType::Reopened, "first@example.com");
    older.timestamp = base;
    let mut newer = CollectionEvent::new(b, EventType::Reopened, "second@example.com");
    newer.timestamp = base + Duration::seconds(1);
    let mut other_type = CollectionEvent::new(a, EventType::Deleted, "third@example.com");
    other_type.timestamp = base + Duration::seconds(2);

    for event in [&older, &newer, &other_type] {
        store.append(event).await.unwrap();
    }

    let latest = store
        .most_recent_of_type(EventType::Reopened, None)
        .await
        .unwrap()
        .expect("event should exist");
    assert_eq!(latest, newer);

    let latest_of_a = store
        .most_recent_of_type(EventType::Reopened, Some(a))
        .await
        .unwrap()
        .expect("event should exist");
    assert_eq!(latest_of_a, older);

    assert!(store
        .most_recent_of_type(EventType::Approved, Some(b))
        .await
        .unwrap()
        .is_none());
}

/// Run all AuditStore tests against a store implementation.
#[macro_export]
macro_rules! run_audit_store_tests {
    ($store:expr) => {
        use $crate::storage::audit_store_tests::*;

        test_history_empty($store).await;
        println!("  test_history_empty: PASSED");

        test_history_preserves_fields($store).await;
        println!("  test_history_preserves_fields: PASSED");

        test_history_ordered_by_timestamp($store).await;
        println!("  test_history_ordered_by_timestamp: PASSED");

        test_equal_timestamps_keep_insertion_order($store).await;
        println!("  test_equal_timestamps_keep_insertion_order: PASSED");

        test_history_isolated_per_collection($store).await;
        println!("  test_history_isolated_per_collection: PASSED");

        test_most_recent_of_type($store).await;
        println!("  test_most_recent_of_type: PASSED");
    };
}
