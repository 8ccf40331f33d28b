//! Logging notifier.

use async_trait::async_trait;
use tracing::info;

use crate::interfaces::{Notifier, NotifyError};
use crate::model::{CollectionId, ContentUri};

/// Notifier that only logs. Used when nothing downstream is wired up.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn on_content_published(
        &self,
        uri: &ContentUri,
        collection_id: CollectionId,
    ) -> Result<(), NotifyError> {
        info!(uri = %uri, collection = %collection_id, "content published");
        Ok(())
    }

    async fn on_content_deleted(
        &self,
        uri: &ContentUri,
        collection_id: CollectionId,
    ) -> Result<(), NotifyError> {
        info!(uri = %uri, collection = %collection_id, "content deleted");
        Ok(())
    }
}
