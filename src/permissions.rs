//! Static, configuration-driven capability checks.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::config::PermissionsConfig;
use crate::interfaces::Permissions;
use crate::model::CollectionId;

/// Grants capabilities from fixed allow lists of actor emails.
///
/// Emails compare case-insensitively. Capabilities apply to every
/// collection.
#[derive(Debug, Clone, Default)]
pub struct StaticPermissions {
    allow_all: bool,
    approvers: HashSet<String>,
    publishers: HashSet<String>,
}

impl StaticPermissions {
    /// Everyone may do everything.
    pub fn allow_all() -> Self {
        Self {
            allow_all: true,
            ..Default::default()
        }
    }

    /// Nobody may approve or publish.
    pub fn deny_all() -> Self {
        Self::default()
    }

    pub fn from_config(config: &PermissionsConfig) -> Self {
        Self {
            allow_all: config.allow_all,
            approvers: config.approvers.iter().map(|e| normalize(e)).collect(),
            publishers: config.publishers.iter().map(|e| normalize(e)).collect(),
        }
    }

    pub fn with_approver(mut self, email: &str) -> Self {
        self.approvers.insert(normalize(email));
        self
    }

    pub fn with_publisher(mut self, email: &str) -> Self {
        self.publishers.insert(normalize(email));
        self
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait]
impl Permissions for StaticPermissions {
    async fn can_approve(&self, actor: &str, _collection_id: CollectionId) -> bool {
        self.allow_all || self.approvers.contains(&normalize(actor))
    }

    async fn can_publish(&self, actor: &str, _collection_id: CollectionId) -> bool {
        self.allow_all || self.publishers.contains(&normalize(actor))
    }
}
