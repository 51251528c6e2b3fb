use chrono::Utc;
use sqlx::Row;

use lapsight_core::domain::{ParsedSpec, ProductId};

use super::{format_timestamp, RepositoryError, SpecRepository};
use crate::DbPool;

pub struct SqlSpecRepository {
    pool: DbPool,
}

impl SqlSpecRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl SpecRepository for SqlSpecRepository {
    async fn find(&self, product_id: &ProductId) -> Result<Option<ParsedSpec>, RepositoryError> {
        let row = sqlx::query("SELECT spec_json FROM product_spec WHERE product_id = ?1")
            .bind(&product_id.0)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let raw: String = row.try_get("spec_json")?;
        serde_json::from_str(&raw).map(Some).map_err(|error| {
            RepositoryError::Decode(format!("invalid spec for product `{product_id}`: {error}"))
        })
    }

    async fn save(&self, product_id: &ProductId, spec: &ParsedSpec) -> Result<(), RepositoryError> {
        let spec_json = serde_json::to_string(spec)
            .map_err(|error| RepositoryError::Decode(error.to_string()))?;

        sqlx::query(
            "INSERT INTO product_spec (product_id, gpu_tier, spec_json, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(product_id) DO UPDATE SET
                gpu_tier = excluded.gpu_tier,
                spec_json = excluded.spec_json,
                updated_at = excluded.updated_at",
        )
        .bind(&product_id.0)
        .bind(i64::from(spec.gpu_tier.get()))
        .bind(spec_json)
        .bind(format_timestamp(Utc::now()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use lapsight_core::domain::{GpuTier, ParsedSpec, Product, ProductId};

    use super::SqlSpecRepository;
    use crate::repositories::{ProductRepository, SpecRepository, SqlProductRepository};
    use crate::{connect_with_settings, migrations, DbPool};

    async fn pool_with_product(id: &str) -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlProductRepository::new(pool.clone())
            .save(Product {
                id: ProductId(id.to_string()),
                external_id: format!("ext-{id}"),
                name: "Laptop".to_string(),
                brand: "Brand".to_string(),
                image_url: None,
                mall_url: "https://example.com".to_string(),
                release_date: None,
                current_lowest: Some(1_000_000),
            })
            .await
            .expect("save product");
        pool
    }

    #[tokio::test]
    async fn spec_is_overwritten_on_second_save() {
        let pool = pool_with_product("lap-1").await;
        let repo = SqlSpecRepository::new(pool);
        let id = ProductId("lap-1".to_string());

        let first = ParsedSpec { gpu_tier: GpuTier::new(3), ..ParsedSpec::default() };
        repo.save(&id, &first).await.expect("first save");

        let second = ParsedSpec {
            cpu: "AMD Ryzen 7 8845HS".to_string(),
            gpu: Some("NVIDIA RTX 4060".to_string()),
            gpu_tier: GpuTier::new(7),
            weight_kg: Some(2.1),
            ..ParsedSpec::default()
        };
        repo.save(&id, &second).await.expect("second save");

        assert_eq!(repo.find(&id).await.expect("find"), Some(second));
    }

    #[tokio::test]
    async fn missing_spec_is_none() {
        let pool = pool_with_product("lap-1").await;
        let repo = SqlSpecRepository::new(pool);
        assert_eq!(repo.find(&ProductId("lap-1".to_string())).await.expect("find"), None);
    }

    #[tokio::test]
    async fn spec_for_unknown_product_violates_foreign_key() {
        let pool = pool_with_product("lap-1").await;
        let repo = SqlSpecRepository::new(pool);
        let result = repo.save(&ProductId("ghost".to_string()), &ParsedSpec::default()).await;
        assert!(result.is_err());
    }
}
