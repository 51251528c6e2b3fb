use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use lapsight_core::domain::ProductId;
use lapsight_core::errors::ApplicationError;
use lapsight_core::narrative::{CachedNarrative, NarrativeCache};

use super::{format_timestamp, parse_timestamp, RepositoryError};
use crate::DbPool;

/// Narrative cache stored in the `narrative_cache` table.
pub struct SqlNarrativeCache {
    pool: DbPool,
}

impl SqlNarrativeCache {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn entry_from_row(row: &SqliteRow) -> Result<CachedNarrative, RepositoryError> {
    let expires_at: String = row.try_get("expires_at")?;
    let product_id: Option<String> = row.try_get("product_id")?;
    Ok(CachedNarrative {
        key: row.try_get("cache_key")?,
        provider: row.try_get("provider")?,
        body: row.try_get("body")?,
        product_id: product_id.map(ProductId),
        expires_at: parse_timestamp(&expires_at)?,
    })
}

#[async_trait::async_trait]
impl NarrativeCache for SqlNarrativeCache {
    async fn get(
        &self,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<CachedNarrative>, ApplicationError> {
        let row = sqlx::query(
            "SELECT cache_key, provider, body, product_id, expires_at FROM narrative_cache
             WHERE cache_key = ?1 AND expires_at > ?2",
        )
        .bind(key)
        .bind(format_timestamp(now))
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(row.as_ref().map(entry_from_row).transpose()?)
    }

    async fn put(&self, entry: CachedNarrative) -> Result<(), ApplicationError> {
        sqlx::query(
            "INSERT INTO narrative_cache (cache_key, provider, body, product_id, expires_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(cache_key) DO UPDATE SET
                provider = excluded.provider,
                body = excluded.body,
                product_id = excluded.product_id,
                expires_at = excluded.expires_at,
                created_at = excluded.created_at",
        )
        .bind(&entry.key)
        .bind(&entry.provider)
        .bind(&entry.body)
        .bind(entry.product_id.as_ref().map(|id| id.0.as_str()))
        .bind(format_timestamp(entry.expires_at))
        .bind(format_timestamp(Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(())
    }

    async fn invalidate(&self, key: &str) -> Result<(), ApplicationError> {
        sqlx::query("DELETE FROM narrative_cache WHERE cache_key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(RepositoryError::from)?;
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, ApplicationError> {
        let result = sqlx::query("DELETE FROM narrative_cache WHERE expires_at <= ?1")
            .bind(format_timestamp(now))
            .execute(&self.pool)
            .await
            .map_err(RepositoryError::from)?;
        Ok(result.rows_affected())
    }
}
