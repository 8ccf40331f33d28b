//! Broadcast-channel notifier.
//!
//! Uses tokio broadcast so any number of in-process consumers (search
//! indexer, cache invalidation, tests) can subscribe.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::interfaces::{Notifier, NotifyError};
use crate::model::{CollectionId, ContentUri};

/// A signal delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentNotification {
    Published {
        uri: ContentUri,
        collection_id: CollectionId,
    },
    Deleted {
        uri: ContentUri,
        collection_id: CollectionId,
    },
}

/// Notifier that forwards every signal to a broadcast channel.
///
/// Sending fails with `NotifyError::Closed` when nobody is subscribed.
pub struct ChannelNotifier {
    sender: broadcast::Sender<ContentNotification>,
}

impl ChannelNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ContentNotification> {
        self.sender.subscribe()
    }

    fn send(&self, notification: ContentNotification) -> Result<(), NotifyError> {
        self.sender
            .send(notification)
            .map(|_| ())
            .map_err(|_| NotifyError::Closed)
    }
}

impl Default for ChannelNotifier {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn on_content_published(
        &self,
        uri: &ContentUri,
        collection_id: CollectionId,
    ) -> Result<(), NotifyError> {
        self.send(ContentNotification::Published {
            uri: uri.clone(),
            collection_id,
        })
    }

    async fn on_content_deleted(
        &self,
        uri: &ContentUri,
        collection_id: CollectionId,
    ) -> Result<(), NotifyError> {
        self.send(ContentNotification::Deleted {
            uri: uri.clone(),
            collection_id,
        })
    }
}
