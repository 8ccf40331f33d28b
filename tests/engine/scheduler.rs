//! Scheduler ticks and the background loop.

use std::time::Duration;

use chrono::Utc;
use galley::model::{CollectionId, CollectionStatus, EventType, NewCollection, SYSTEM_ACTOR};

use crate::common::{uri, Harness, APPROVER, EDITOR};

async fn scheduled(h: &Harness, name: &str, offset: chrono::Duration) -> CollectionId {
    let id = h
        .engine
        .collections()
        .create(NewCollection::scheduled(name, Utc::now() + offset), EDITOR)
        .await
        .unwrap()
        .id;
    h.engine
        .collections()
        .add_content(id, &uri(&format!("/{}", name.replace(' ', "-"))), b"x", EDITOR)
        .await
        .unwrap();
    h.engine.workflow().approve(id, APPROVER).await.unwrap();
    id
}

#[tokio::test]
async fn test_tick_queues_and_publishes_due_collections() {
    let h = Harness::new();
    let due = scheduled(&h, "due now", chrono::Duration::minutes(-1)).await;
    let later = scheduled(&h, "due tomorrow", chrono::Duration::days(1)).await;

    let report = h.engine.scheduler().tick(Utc::now()).await.unwrap();
    assert_eq!(report.queued, vec![due]);
    assert_eq!(report.published, vec![due]);
    assert!(report.failed.is_empty());

    assert_eq!(h.status(due).await, CollectionStatus::Published);
    assert_eq!(h.status(later).await, CollectionStatus::Approved);

    let queued = h
        .engine
        .audit()
        .most_recent_event_of_type(EventType::QueuedForPublish, Some(due))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(queued.actor_email, SYSTEM_ACTOR);
    assert!(h.live("/due-now").await.is_some());
}

#[tokio::test]
async fn test_tick_leaves_manual_collections_alone() {
    let h = Harness::new();
    let manual = h.create("manual").await;
    h.engine.workflow().approve(manual, APPROVER).await.unwrap();

    let report = h.engine.scheduler().tick(Utc::now()).await.unwrap();
    assert_eq!(report, Default::default());
    assert_eq!(h.status(manual).await, CollectionStatus::Approved);
}

#[tokio::test]
async fn test_tick_publishes_manually_queued() {
    let h = Harness::new();
    let id = h.create("queued by hand").await;
    h.approve_and_queue(id).await;

    let report = h.engine.scheduler().tick(Utc::now()).await.unwrap();
    assert!(report.queued.is_empty());
    assert_eq!(report.published, vec![id]);
    assert_eq!(h.status(id).await, CollectionStatus::Published);
}

#[tokio::test]
async fn test_tick_reports_failures() {
    let h = Harness::new();
    let id = h.create("doomed").await;
    h.engine
        .collections()
        .add_content(id, &uri("/doomed"), b"x", EDITOR)
        .await
        .unwrap();
    h.approve_and_queue(id).await;

    h.content.fail_on_live_op(1).await;
    let report = h.engine.scheduler().tick(Utc::now()).await.unwrap();
    assert_eq!(report.failed, vec![id]);
    assert!(report.published.is_empty());
    assert_eq!(h.status(id).await, CollectionStatus::Errored);

    // ERRORED collections wait for a manual decision.
    let report = h.engine.scheduler().tick(Utc::now()).await.unwrap();
    assert_eq!(report, Default::default());
}

#[tokio::test]
async fn test_background_scheduler_publishes() {
    let h = Harness::new();
    let id = scheduled(&h, "background", chrono::Duration::seconds(-5)).await;

    let handle = h.engine.spawn_scheduler();
    let published = tokio::time::timeout(Duration::from_secs(2), async {
        while h.status(id).await != CollectionStatus::Published {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    handle.shutdown().await;

    assert!(published.is_ok(), "scheduler should publish the collection");
    let events = h.engine.audit().history(id).await.unwrap();
    let completed = events
        .iter()
        .filter(|e| e.event_type == EventType::PublishCompleted)
        .count();
    assert_eq!(completed, 1);
}
