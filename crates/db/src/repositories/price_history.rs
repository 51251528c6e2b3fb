use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use lapsight_core::domain::{PriceRecord, ProductId};

use super::{format_timestamp, parse_timestamp, PriceHistoryRepository, RepositoryError};
use crate::DbPool;

pub struct SqlPriceHistoryRepository {
    pool: DbPool,
}

impl SqlPriceHistoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn record_from_row(row: &SqliteRow) -> Result<PriceRecord, RepositoryError> {
    let recorded_at: String = row.try_get("recorded_at")?;
    Ok(PriceRecord {
        price: row.try_get("price")?,
        recorded_at: parse_timestamp(&recorded_at)?,
        mall_name: row.try_get("mall_name")?,
    })
}

#[async_trait::async_trait]
impl PriceHistoryRepository for SqlPriceHistoryRepository {
    async fn append(
        &self,
        product_id: &ProductId,
        record: &PriceRecord,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO price_history (product_id, price, mall_name, recorded_at, recorded_on)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(product_id, recorded_on) DO NOTHING",
        )
        .bind(&product_id.0)
        .bind(record.price)
        .bind(&record.mall_name)
        .bind(format_timestamp(record.recorded_at))
        .bind(record.recorded_on().format("%Y-%m-%d").to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_for_product(
        &self,
        product_id: &ProductId,
    ) -> Result<Vec<PriceRecord>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT price, mall_name, recorded_at FROM price_history
             WHERE product_id = ?1
             ORDER BY recorded_at ASC",
        )
        .bind(&product_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(record_from_row).collect()
    }

    async fn list_since(
        &self,
        product_id: &ProductId,
        since: DateTime<Utc>,
    ) -> Result<Vec<PriceRecord>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT price, mall_name, recorded_at FROM price_history
             WHERE product_id = ?1 AND recorded_at >= ?2
             ORDER BY recorded_at ASC",
        )
        .bind(&product_id.0)
        .bind(format_timestamp(since))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(record_from_row).collect()
    }

    async fn reset_all(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM price_history").execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use lapsight_core::domain::{PriceRecord, Product, ProductId};

    use super::SqlPriceHistoryRepository;
    use crate::repositories::{PriceHistoryRepository, ProductRepository, SqlProductRepository};
    use crate::{connect_with_settings, migrations};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 17, 9, 30, 0).single().expect("timestamp")
    }

    async fn repository() -> (SqlPriceHistoryRepository, ProductId) {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let id = ProductId("lap-1".to_string());
        SqlProductRepository::new(pool.clone())
            .save(Product {
                id: id.clone(),
                external_id: "ext-1".to_string(),
                name: "Laptop".to_string(),
                brand: "Brand".to_string(),
                image_url: None,
                mall_url: "https://example.com".to_string(),
                release_date: None,
                current_lowest: None,
            })
            .await
            .expect("save product");
        (SqlPriceHistoryRepository::new(pool), id)
    }

    #[tokio::test]
    async fn second_record_on_the_same_day_is_ignored() {
        let (repo, id) = repository().await;

        let morning = PriceRecord::new(1_000_000, now());
        let evening = PriceRecord::new(950_000, now() + Duration::hours(8));

        assert!(repo.append(&id, &morning).await.expect("morning"));
        assert!(!repo.append(&id, &evening).await.expect("evening"));

        let history = repo.list_for_product(&id).await.expect("history");
        assert_eq!(history, vec![morning]);
    }

    #[tokio::test]
    async fn list_since_is_inclusive_and_oldest_first() {
        let (repo, id) = repository().await;
        for day in [10, 3, 7, 0] {
            let record = PriceRecord {
                price: 1_000_000 + day * 1_000,
                recorded_at: now() - Duration::days(day),
                mall_name: Some("Mall".to_string()),
            };
            repo.append(&id, &record).await.expect("append");
        }

        let recent = repo.list_since(&id, now() - Duration::days(7)).await.expect("since");
        let prices: Vec<i64> = recent.iter().map(|record| record.price).collect();
        assert_eq!(prices, vec![1_007_000, 1_003_000, 1_000_000]);
        assert_eq!(recent[0].mall_name.as_deref(), Some("Mall"));
    }

    #[tokio::test]
    async fn reset_all_reports_deleted_rows() {
        let (repo, id) = repository().await;
        for day in 0..5 {
            repo.append(&id, &PriceRecord::new(900_000, now() - Duration::days(day)))
                .await
                .expect("append");
        }

        assert_eq!(repo.reset_all().await.expect("reset"), 5);
        assert!(repo.list_for_product(&id).await.expect("history").is_empty());
    }
}
