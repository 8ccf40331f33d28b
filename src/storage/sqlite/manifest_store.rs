//! SQLite ManifestStore implementation.

use async_trait::async_trait;
use chrono::Utc;
use sea_query::{Expr, OnConflict, Query, SqliteQueryBuilder};
use sqlx::{Row, SqlitePool};

use super::format_timestamp;
use crate::model::{CollectionId, Manifest, PersistedManifest};
use crate::storage::schema::{Manifests, CREATE_MANIFESTS_TABLE};
use crate::storage::{ManifestStore, Result, StorageError};

/// SQLite implementation of ManifestStore.
///
/// Operations are stored as their JSON list alongside a digest that is
/// verified on load.
pub struct SqliteManifestStore {
    pool: SqlitePool,
}

impl SqliteManifestStore {
    /// Create a new SQLite manifest store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the manifests table if it doesn't exist.
    pub async fn init(&self) -> Result<()> {
        sqlx::raw_sql(CREATE_MANIFESTS_TABLE)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ManifestStore for SqliteManifestStore {
    async fn save(&self, manifest: &PersistedManifest) -> Result<()> {
        let operations = serde_json::to_string(&manifest.manifest)?;
        let updated_at = format_timestamp(&Utc::now());

        let query = Query::insert()
            .into_table(Manifests::Table)
            .columns([
                Manifests::CollectionId,
                Manifests::Operations,
                Manifests::Digest,
                Manifests::Applied,
                Manifests::UpdatedAt,
            ])
            .values_panic([
                manifest.collection_id.to_string().into(),
                operations.into(),
                manifest.manifest.digest().into(),
                (manifest.applied as i64).into(),
                updated_at.into(),
            ])
            .on_conflict(
                OnConflict::column(Manifests::CollectionId)
                    .update_columns([
                        Manifests::Operations,
                        Manifests::Digest,
                        Manifests::Applied,
                        Manifests::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;
        Ok(())
    }

    async fn load(&self, collection_id: CollectionId) -> Result<Option<PersistedManifest>> {
        let query = Query::select()
            .columns([Manifests::Operations, Manifests::Digest, Manifests::Applied])
            .from(Manifests::Table)
            .and_where(Expr::col(Manifests::CollectionId).eq(collection_id.to_string()))
            .to_string(SqliteQueryBuilder);

        let Some(row) = sqlx::query(&query).fetch_optional(&self.pool).await? else {
            return Ok(None);
        };

        let operations: String = row.try_get("operations")?;
        let digest: String = row.try_get("digest")?;
        let applied: i64 = row.try_get("applied")?;

        let manifest: Manifest = serde_json::from_str(&operations)?;
        if manifest.digest() != digest {
            return Err(StorageError::Corrupt(format!(
                "manifest digest mismatch for {collection_id}"
            )));
        }

        Ok(Some(PersistedManifest {
            collection_id,
            manifest,
            applied: usize::try_from(applied).map_err(|_| {
                StorageError::Corrupt(format!("negative applied count for {collection_id}"))
            })?,
        }))
    }

    async fn mark_applied(&self, collection_id: CollectionId, applied: usize) -> Result<()> {
        let query = Query::update()
            .table(Manifests::Table)
            .values([
                (Manifests::Applied, (applied as i64).into()),
                (Manifests::UpdatedAt, format_timestamp(&Utc::now()).into()),
            ])
            .and_where(Expr::col(Manifests::CollectionId).eq(collection_id.to_string()))
            .to_string(SqliteQueryBuilder);

        let result = sqlx::query(&query).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::Inconsistent(format!(
                "no manifest saved for {collection_id}"
            )));
        }
        Ok(())
    }

    async fn remove(&self, collection_id: CollectionId) -> Result<()> {
        let query = Query::delete()
            .from_table(Manifests::Table)
            .and_where(Expr::col(Manifests::CollectionId).eq(collection_id.to_string()))
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;
        Ok(())
    }
}
