//! Audit trail across the collection lifecycle.

use galley::model::{EventType, SYSTEM_ACTOR};

use crate::common::{uri, Harness, APPROVER, EDITOR, PUBLISHER};

fn types(events: &[galley::model::CollectionEvent]) -> Vec<EventType> {
    events.iter().map(|e| e.event_type).collect()
}

#[tokio::test]
async fn test_history_follows_lifecycle() {
    let h = Harness::new();
    let id = h.create("quarterly").await;
    h.engine
        .collections()
        .add_content(id, &uri("/gdp/q3"), b"figures", EDITOR)
        .await
        .unwrap();
    h.engine
        .workflow()
        .review(id, APPROVER, None)
        .await
        .unwrap();
    h.approve_and_queue(id).await;
    h.engine.publish(id).await.unwrap();

    let history = h.engine.audit().history(id).await.unwrap();
    assert_eq!(
        types(&history),
        vec![
            EventType::Created,
            EventType::ContentAdded,
            EventType::Reviewed,
            EventType::Approved,
            EventType::QueuedForPublish,
            EventType::PublishStarted,
            EventType::PublishCompleted,
        ]
    );
    assert!(history
        .windows(2)
        .all(|pair| pair[0].timestamp <= pair[1].timestamp));

    assert_eq!(history[0].actor_email, EDITOR);
    assert_eq!(history[0].detail.as_deref(), Some("quarterly"));
    assert_eq!(history[1].detail.as_deref(), Some("/gdp/q3"));
    assert_eq!(history[4].actor_email, PUBLISHER);
    assert_eq!(history[6].actor_email, SYSTEM_ACTOR);
}

#[tokio::test]
async fn test_history_is_per_collection() {
    let h = Harness::new();
    let a = h.create("first").await;
    let b = h.create("second").await;
    h.engine.workflow().approve(b, APPROVER).await.unwrap();

    assert_eq!(
        types(&h.engine.audit().history(a).await.unwrap()),
        vec![EventType::Created]
    );

    let latest = h
        .engine
        .audit()
        .most_recent_event_of_type(EventType::Created, None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(latest.collection_id, b);

    assert!(h
        .engine
        .audit()
        .most_recent_event_of_type(EventType::Approved, Some(a))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_move_event_names_both_ends() {
    let h = Harness::new();
    let id = h.create("rename").await;
    let from = uri("/old/place");
    let to = uri("/new/place");
    h.content.insert_live(&from, "body").await;

    h.engine
        .collections()
        .move_content(id, &from, &to, EDITOR)
        .await
        .unwrap();

    let moved = h
        .engine
        .audit()
        .most_recent_event_of_type(EventType::ContentMoved, Some(id))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(moved.detail.as_deref(), Some("/old/place -> /new/place"));
}

#[tokio::test]
async fn test_failed_publish_is_recorded() {
    let h = Harness::new();
    let id = h.create("flaky").await;
    h.engine
        .collections()
        .add_content(id, &uri("/flaky"), b"x", EDITOR)
        .await
        .unwrap();
    h.approve_and_queue(id).await;

    h.content.fail_on_live_op(1).await;
    h.engine.publish(id).await.unwrap_err();
    h.engine
        .workflow()
        .resolve(id, PUBLISHER, galley::services::Resolution::Retry)
        .await
        .unwrap();
    h.engine.publish(id).await.unwrap();

    let history = h.engine.audit().history(id).await.unwrap();
    let tail: Vec<_> = types(&history).into_iter().skip(4).collect();
    assert_eq!(
        tail,
        vec![
            EventType::PublishStarted,
            EventType::PublishFailed,
            EventType::PublishRetried,
            EventType::PublishStarted,
            EventType::PublishCompleted,
        ]
    );

    let restarted = &history[7];
    assert_eq!(
        restarted.detail.as_deref(),
        Some("resumed at operation 1 of 1")
    );
}
