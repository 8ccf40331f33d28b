//! SQLite AuditStore implementation.

use async_trait::async_trait;
use sea_query::{Expr, Order, Query, SelectStatement, SqliteQueryBuilder};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::{format_timestamp, parse_timestamp};
use crate::model::{CollectionEvent, CollectionId, EventType};
use crate::storage::schema::{AuditEvents, CREATE_AUDIT_EVENTS_TABLE};
use crate::storage::{AuditStore, Result};

/// SQLite implementation of AuditStore.
pub struct SqliteAuditStore {
    pool: SqlitePool,
}

impl SqliteAuditStore {
    /// Create a new SQLite audit store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the events table if it doesn't exist.
    pub async fn init(&self) -> Result<()> {
        sqlx::raw_sql(CREATE_AUDIT_EVENTS_TABLE)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    fn event_query() -> SelectStatement {
        Query::select()
            .columns([
                AuditEvents::CollectionId,
                AuditEvents::EventType,
                AuditEvents::Timestamp,
                AuditEvents::ActorEmail,
                AuditEvents::Detail,
            ])
            .from(AuditEvents::Table)
            .to_owned()
    }

    fn event_from_row(row: &SqliteRow) -> Result<CollectionEvent> {
        let collection_id: String = row.try_get("collection_id")?;
        let event_type: String = row.try_get("event_type")?;
        let timestamp: String = row.try_get("timestamp")?;

        Ok(CollectionEvent {
            collection_id: collection_id.parse()?,
            event_type: event_type.parse()?,
            timestamp: parse_timestamp(&timestamp)?,
            actor_email: row.try_get("actor_email")?,
            detail: row.try_get("detail")?,
        })
    }
}

#[async_trait]
impl AuditStore for SqliteAuditStore {
    async fn append(&self, event: &CollectionEvent) -> Result<()> {
        let query = Query::insert()
            .into_table(AuditEvents::Table)
            .columns([
                AuditEvents::CollectionId,
                AuditEvents::EventType,
                AuditEvents::Timestamp,
                AuditEvents::ActorEmail,
                AuditEvents::Detail,
            ])
            .values_panic([
                event.collection_id.to_string().into(),
                event.event_type.as_str().into(),
                format_timestamp(&event.timestamp).into(),
                event.actor_email.clone().into(),
                event.detail.clone().into(),
            ])
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;
        Ok(())
    }

    async fn history(&self, collection_id: CollectionId) -> Result<Vec<CollectionEvent>> {
        let query = Self::event_query()
            .and_where(Expr::col(AuditEvents::CollectionId).eq(collection_id.to_string()))
            .order_by(AuditEvents::Timestamp, Order::Asc)
            .order_by(AuditEvents::Seq, Order::Asc)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(Self::event_from_row).collect()
    }

    async fn most_recent_of_type(
        &self,
        event_type: EventType,
        collection_id: Option<CollectionId>,
    ) -> Result<Option<CollectionEvent>> {
        let query = {
            let mut select = Self::event_query();
            select.and_where(Expr::col(AuditEvents::EventType).eq(event_type.as_str()));
            if let Some(id) = collection_id {
                select.and_where(Expr::col(AuditEvents::CollectionId).eq(id.to_string()));
            }
            select
                .order_by(AuditEvents::Timestamp, Order::Desc)
                .order_by(AuditEvents::Seq, Order::Desc)
                .limit(1)
                .to_string(SqliteQueryBuilder)
        };

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        row.as_ref().map(Self::event_from_row).transpose()
    }
}
