//! Database schema definitions using sea-query.
//!
//! These define the table and column identifiers for type-safe query building.

use sea_query::Iden;

/// Collections table schema.
#[derive(Iden)]
pub enum Collections {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "name"]
    Name,
    #[iden = "name_key"]
    NameKey,
    #[iden = "collection_type"]
    CollectionType,
    #[iden = "status"]
    Status,
    #[iden = "publish_date"]
    PublishDate,
    #[iden = "release_uri"]
    ReleaseUri,
    #[iden = "created_at"]
    CreatedAt,
}

/// Content items table schema: claims and membership in one row.
#[derive(Iden)]
pub enum ContentItems {
    Table,
    #[iden = "collection_id"]
    CollectionId,
    #[iden = "uri"]
    Uri,
    #[iden = "kind"]
    Kind,
    #[iden = "moved_from"]
    MovedFrom,
    #[iden = "held"]
    Held,
    #[iden = "claimed_at"]
    ClaimedAt,
}

/// Audit events table schema.
#[derive(Iden)]
pub enum AuditEvents {
    Table,
    #[iden = "seq"]
    Seq,
    #[iden = "collection_id"]
    CollectionId,
    #[iden = "event_type"]
    EventType,
    #[iden = "timestamp"]
    Timestamp,
    #[iden = "actor_email"]
    ActorEmail,
    #[iden = "detail"]
    Detail,
}

/// Persisted manifests table schema.
#[derive(Iden)]
pub enum Manifests {
    Table,
    #[iden = "collection_id"]
    CollectionId,
    #[iden = "operations"]
    Operations,
    #[iden = "digest"]
    Digest,
    #[iden = "applied"]
    Applied,
    #[iden = "updated_at"]
    UpdatedAt,
}

/// SQL for creating the collections table.
///
/// Names are unique, case-insensitively via `name_key`, among collections
/// that are not DELETED.
pub const CREATE_COLLECTIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS collections (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    name_key TEXT NOT NULL,
    collection_type TEXT NOT NULL,
    status TEXT NOT NULL,
    publish_date TEXT,
    release_uri TEXT,
    created_at TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_collections_live_name
    ON collections(name_key) WHERE status <> 'DELETED';
CREATE INDEX IF NOT EXISTS idx_collections_status ON collections(status, created_at);
"#;

/// SQL for creating the content items table.
///
/// At most one held claim per URI.
pub const CREATE_CONTENT_ITEMS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS content_items (
    collection_id TEXT NOT NULL,
    uri TEXT NOT NULL,
    kind TEXT NOT NULL,
    moved_from TEXT,
    held INTEGER NOT NULL DEFAULT 1,
    claimed_at TEXT NOT NULL,
    PRIMARY KEY (collection_id, uri)
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_content_items_holder
    ON content_items(uri) WHERE held = 1;
"#;

/// SQL for creating the audit events table.
///
/// `seq` breaks ties between events with equal timestamps.
pub const CREATE_AUDIT_EVENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS audit_events (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    collection_id TEXT NOT NULL,
    event_type TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    actor_email TEXT NOT NULL,
    detail TEXT
);

CREATE INDEX IF NOT EXISTS idx_audit_events_collection
    ON audit_events(collection_id, timestamp, seq);
CREATE INDEX IF NOT EXISTS idx_audit_events_type
    ON audit_events(event_type, timestamp, seq);
"#;

/// SQL for creating the manifests table.
pub const CREATE_MANIFESTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS manifests (
    collection_id TEXT PRIMARY KEY,
    operations TEXT NOT NULL,
    digest TEXT NOT NULL,
    applied INTEGER NOT NULL,
    updated_at TEXT NOT NULL
);
"#;
