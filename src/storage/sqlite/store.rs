//! SQLite LockTable + CollectionStore implementation.

use async_trait::async_trait;
use chrono::Utc;
use sea_query::{Expr, OnConflict, Order, Query, SelectStatement, SqliteQueryBuilder};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};

use super::{begin_immediate, finish, format_timestamp, parse_timestamp};
use crate::model::{
    decide_claim, name_key, ClaimDecision, Collection, CollectionId, CollectionStatus,
    ContentItem, ContentUri, WorkflowAction,
};
use crate::storage::schema::{
    Collections, ContentItems, CREATE_COLLECTIONS_TABLE, CREATE_CONTENT_ITEMS_TABLE,
};
use crate::storage::{ClaimOutcome, CollectionStore, LockTable, Result, StorageError};

/// SQLite store for collections, claims and membership.
///
/// Both live in one database so a claim, its membership entry and the
/// collection-status check commit in the same transaction.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new SQLite store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create tables and indexes if they don't exist.
    pub async fn init(&self) -> Result<()> {
        sqlx::raw_sql(CREATE_COLLECTIONS_TABLE)
            .execute(&self.pool)
            .await?;
        sqlx::raw_sql(CREATE_CONTENT_ITEMS_TABLE)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    fn collection_query() -> SelectStatement {
        Query::select()
            .columns([
                Collections::Id,
                Collections::Name,
                Collections::CollectionType,
                Collections::Status,
                Collections::PublishDate,
                Collections::ReleaseUri,
                Collections::CreatedAt,
            ])
            .from(Collections::Table)
            .to_owned()
    }

    fn item_query() -> SelectStatement {
        Query::select()
            .columns([
                ContentItems::CollectionId,
                ContentItems::Uri,
                ContentItems::Kind,
                ContentItems::MovedFrom,
            ])
            .from(ContentItems::Table)
            .to_owned()
    }

    fn collection_from_row(row: &SqliteRow) -> Result<Collection> {
        let id: String = row.try_get("id")?;
        let collection_type: String = row.try_get("collection_type")?;
        let status: String = row.try_get("status")?;
        let publish_date: Option<String> = row.try_get("publish_date")?;
        let created_at: String = row.try_get("created_at")?;

        Ok(Collection {
            id: id.parse()?,
            name: row.try_get("name")?,
            collection_type: collection_type.parse()?,
            status: status.parse()?,
            publish_date: publish_date.as_deref().map(parse_timestamp).transpose()?,
            release_uri: row.try_get("release_uri")?,
            created_at: parse_timestamp(&created_at)?,
        })
    }

    fn item_from_row(row: &SqliteRow) -> Result<ContentItem> {
        let collection_id: String = row.try_get("collection_id")?;
        let uri: String = row.try_get("uri")?;
        let kind: String = row.try_get("kind")?;
        let moved_from: Option<String> = row.try_get("moved_from")?;

        Ok(ContentItem {
            collection_id: collection_id.parse()?,
            uri: ContentUri::parse(&uri).map_err(StorageError::Corrupt)?,
            kind: kind.parse()?,
            moved_from: moved_from
                .as_deref()
                .map(ContentUri::parse)
                .transpose()
                .map_err(StorageError::Corrupt)?,
        })
    }

    async fn fetch_collection(
        conn: &mut SqliteConnection,
        id: CollectionId,
    ) -> Result<Option<Collection>> {
        let query = Self::collection_query()
            .and_where(Expr::col(Collections::Id).eq(id.to_string()))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&mut *conn).await?;
        row.as_ref().map(Self::collection_from_row).transpose()
    }

    async fn fetch_holder(
        conn: &mut SqliteConnection,
        uri: &ContentUri,
    ) -> Result<Option<ContentItem>> {
        let query = Self::item_query()
            .and_where(Expr::col(ContentItems::Uri).eq(uri.as_str()))
            .and_where(Expr::col(ContentItems::Held).eq(1i32))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&mut *conn).await?;
        row.as_ref().map(Self::item_from_row).transpose()
    }

    /// Whether a live collection other than `except` uses `name`.
    async fn name_taken(
        conn: &mut SqliteConnection,
        name: &str,
        except: Option<CollectionId>,
    ) -> Result<bool> {
        // SelectStatement is not Send; render it before awaiting.
        let query = {
            let mut select = Query::select();
            select
                .column(Collections::Id)
                .from(Collections::Table)
                .and_where(Expr::col(Collections::NameKey).eq(name_key(name)))
                .and_where(Expr::col(Collections::Status).ne(CollectionStatus::Deleted.as_str()));
            if let Some(id) = except {
                select.and_where(Expr::col(Collections::Id).ne(id.to_string()));
            }
            select.limit(1).to_string(SqliteQueryBuilder)
        };

        Ok(sqlx::query(&query)
            .fetch_optional(&mut *conn)
            .await?
            .is_some())
    }

    async fn claim_in_tx(
        conn: &mut SqliteConnection,
        collection_id: CollectionId,
        requests: &[ContentItem],
    ) -> Result<ClaimOutcome> {
        let Some(collection) = Self::fetch_collection(conn, collection_id).await? else {
            return Ok(ClaimOutcome::CollectionNotFound);
        };
        if collection.status.apply(WorkflowAction::EditContent).is_none() {
            return Ok(ClaimOutcome::NotEditable(collection.status));
        }

        let mut decisions = Vec::with_capacity(requests.len());
        for request in requests {
            let holder = Self::fetch_holder(conn, &request.uri).await?;
            match decide_claim(holder.as_ref(), request) {
                ClaimDecision::Block(reason) => {
                    return Ok(ClaimOutcome::Blocked {
                        uri: request.uri.clone(),
                        reason,
                    });
                }
                decision => decisions.push(decision),
            }
        }

        let claimed_at = format_timestamp(&Utc::now());
        for (request, decision) in requests.iter().zip(&decisions) {
            if *decision == ClaimDecision::Unchanged {
                continue;
            }
            let query = Query::insert()
                .into_table(ContentItems::Table)
                .columns([
                    ContentItems::CollectionId,
                    ContentItems::Uri,
                    ContentItems::Kind,
                    ContentItems::MovedFrom,
                    ContentItems::Held,
                    ContentItems::ClaimedAt,
                ])
                .values_panic([
                    request.collection_id.to_string().into(),
                    request.uri.as_str().into(),
                    request.kind.as_str().into(),
                    request
                        .moved_from
                        .as_ref()
                        .map(|uri| uri.as_str().to_string())
                        .into(),
                    1i32.into(),
                    claimed_at.clone().into(),
                ])
                .on_conflict(
                    OnConflict::columns([ContentItems::CollectionId, ContentItems::Uri])
                        .update_columns([
                            ContentItems::Kind,
                            ContentItems::MovedFrom,
                            ContentItems::Held,
                            ContentItems::ClaimedAt,
                        ])
                        .to_owned(),
                )
                .to_string(SqliteQueryBuilder);

            sqlx::query(&query).execute(&mut *conn).await?;
        }

        Ok(ClaimOutcome::Applied(decisions))
    }

    async fn create_in_tx(conn: &mut SqliteConnection, collection: &Collection) -> Result<()> {
        if Self::name_taken(conn, &collection.name, None).await? {
            return Err(StorageError::DuplicateName(collection.name.clone()));
        }

        let query = Query::insert()
            .into_table(Collections::Table)
            .columns([
                Collections::Id,
                Collections::Name,
                Collections::NameKey,
                Collections::CollectionType,
                Collections::Status,
                Collections::PublishDate,
                Collections::ReleaseUri,
                Collections::CreatedAt,
            ])
            .values_panic([
                collection.id.to_string().into(),
                collection.name.clone().into(),
                collection.name_key().into(),
                collection.collection_type.as_str().into(),
                collection.status.as_str().into(),
                collection.publish_date.as_ref().map(format_timestamp).into(),
                collection.release_uri.clone().into(),
                format_timestamp(&collection.created_at).into(),
            ])
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&mut *conn).await?;
        Ok(())
    }

    async fn update_in_tx(conn: &mut SqliteConnection, collection: &Collection) -> Result<bool> {
        match Self::fetch_collection(conn, collection.id).await? {
            None => return Err(StorageError::NotFound(collection.id)),
            Some(stored) if stored.status != collection.status => return Ok(false),
            Some(_) => {}
        }
        if Self::name_taken(conn, &collection.name, Some(collection.id)).await? {
            return Err(StorageError::DuplicateName(collection.name.clone()));
        }

        let query = Query::update()
            .table(Collections::Table)
            .values([
                (Collections::Name, collection.name.clone().into()),
                (Collections::NameKey, collection.name_key().into()),
                (
                    Collections::CollectionType,
                    collection.collection_type.as_str().into(),
                ),
                (
                    Collections::PublishDate,
                    collection.publish_date.as_ref().map(format_timestamp).into(),
                ),
                (Collections::ReleaseUri, collection.release_uri.clone().into()),
            ])
            .and_where(Expr::col(Collections::Id).eq(collection.id.to_string()))
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&mut *conn).await?;
        Ok(true)
    }

    async fn collections_where(&self, status: Option<CollectionStatus>) -> Result<Vec<Collection>> {
        let query = {
            let mut select = Self::collection_query();
            if let Some(status) = status {
                select.and_where(Expr::col(Collections::Status).eq(status.as_str()));
            }
            select
                .order_by(Collections::CreatedAt, Order::Asc)
                .order_by(Collections::Id, Order::Asc)
                .to_string(SqliteQueryBuilder)
        };

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(Self::collection_from_row).collect()
    }

    async fn items_where(&self, collection_id: CollectionId, held_only: bool) -> Result<Vec<ContentItem>> {
        let query = {
            let mut select = Self::item_query();
            select.and_where(Expr::col(ContentItems::CollectionId).eq(collection_id.to_string()));
            if held_only {
                select.and_where(Expr::col(ContentItems::Held).eq(1i32));
            }
            select
                .order_by(ContentItems::Uri, Order::Asc)
                .to_string(SqliteQueryBuilder)
        };

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(Self::item_from_row).collect()
    }
}

#[async_trait]
impl LockTable for SqliteStore {
    async fn claim(&self, requests: &[ContentItem]) -> Result<ClaimOutcome> {
        let Some(first) = requests.first() else {
            return Ok(ClaimOutcome::Applied(Vec::new()));
        };
        let collection_id = first.collection_id;
        if requests.iter().any(|r| r.collection_id != collection_id) {
            return Err(StorageError::Inconsistent(
                "claim batch spans collections".to_string(),
            ));
        }

        let mut conn = self.pool.acquire().await?;
        begin_immediate(&mut conn).await?;
        let result = Self::claim_in_tx(&mut conn, collection_id, requests).await;
        finish(&mut conn, result).await
    }

    async fn holder_of(&self, uri: &ContentUri) -> Result<Option<ContentItem>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_holder(&mut conn, uri).await
    }

    async fn items_of(&self, collection_id: CollectionId) -> Result<Vec<ContentItem>> {
        self.items_where(collection_id, false).await
    }

    async fn held_by(&self, collection_id: CollectionId) -> Result<Vec<ContentItem>> {
        self.items_where(collection_id, true).await
    }

    async fn remove(&self, collection_id: CollectionId, uris: &[ContentUri]) -> Result<usize> {
        if uris.is_empty() {
            return Ok(0);
        }

        let query = Query::delete()
            .from_table(ContentItems::Table)
            .and_where(Expr::col(ContentItems::CollectionId).eq(collection_id.to_string()))
            .and_where(
                Expr::col(ContentItems::Uri).is_in(uris.iter().map(|uri| uri.as_str().to_string())),
            )
            .to_string(SqliteQueryBuilder);

        let result = sqlx::query(&query).execute(&self.pool).await?;
        Ok(result.rows_affected() as usize)
    }

    async fn release(&self, collection_id: CollectionId) -> Result<usize> {
        let query = Query::update()
            .table(ContentItems::Table)
            .value(ContentItems::Held, 0i32)
            .and_where(Expr::col(ContentItems::CollectionId).eq(collection_id.to_string()))
            .and_where(Expr::col(ContentItems::Held).eq(1i32))
            .to_string(SqliteQueryBuilder);

        let result = sqlx::query(&query).execute(&self.pool).await?;
        Ok(result.rows_affected() as usize)
    }
}

#[async_trait]
impl CollectionStore for SqliteStore {
    async fn create(&self, collection: &Collection) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        begin_immediate(&mut conn).await?;
        let result = Self::create_in_tx(&mut conn, collection).await;
        finish(&mut conn, result).await
    }

    async fn get(&self, id: CollectionId) -> Result<Option<Collection>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_collection(&mut conn, id).await
    }

    async fn list(&self) -> Result<Vec<Collection>> {
        self.collections_where(None).await
    }

    async fn list_by_status(&self, status: CollectionStatus) -> Result<Vec<Collection>> {
        self.collections_where(Some(status)).await
    }

    async fn compare_and_set_status(
        &self,
        id: CollectionId,
        expected: CollectionStatus,
        next: CollectionStatus,
    ) -> Result<bool> {
        let query = Query::update()
            .table(Collections::Table)
            .value(Collections::Status, next.as_str())
            .and_where(Expr::col(Collections::Id).eq(id.to_string()))
            .and_where(Expr::col(Collections::Status).eq(expected.as_str()))
            .to_string(SqliteQueryBuilder);

        let result = sqlx::query(&query).execute(&self.pool).await?;
        if result.rows_affected() == 1 {
            return Ok(true);
        }

        let mut conn = self.pool.acquire().await?;
        match Self::fetch_collection(&mut conn, id).await? {
            Some(_) => Ok(false),
            None => Err(StorageError::NotFound(id)),
        }
    }

    async fn update_details(&self, collection: &Collection) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        begin_immediate(&mut conn).await?;
        let result = Self::update_in_tx(&mut conn, collection).await;
        finish(&mut conn, result).await
    }
}
