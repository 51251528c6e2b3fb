use chrono::{NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};

use lapsight_core::domain::{Budget, Product, ProductId, UsageKind};
use lapsight_core::scoring::UsageScores;

use super::{
    format_timestamp, ProductListing, ProductPage, ProductQuery, ProductRepository, ProductSort,
    RepositoryError, StoredScores, USAGE_FILTER_THRESHOLD,
};
use crate::DbPool;

const PRODUCT_COLUMNS: &str = "id, external_id, name, brand, image_url, mall_url, release_date, \
     current_lowest, score_gaming, score_work, score_student, score_video, score_portable, \
     score_overall, value_score";

pub struct SqlProductRepository {
    pool: DbPool,
}

impl SqlProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn usage_column(usage: UsageKind) -> &'static str {
    match usage {
        UsageKind::Gaming => "score_gaming",
        UsageKind::Work => "score_work",
        UsageKind::Student => "score_student",
        UsageKind::Video => "score_video",
        UsageKind::Portable => "score_portable",
    }
}

fn order_clause(sort: ProductSort) -> &'static str {
    match sort {
        ProductSort::Relevance => " ORDER BY updated_at DESC, id ASC",
        ProductSort::PriceAsc => {
            " ORDER BY current_lowest IS NULL, current_lowest ASC, id ASC"
        }
        ProductSort::PriceDesc => {
            " ORDER BY current_lowest IS NULL, current_lowest DESC, id ASC"
        }
        ProductSort::Newest => " ORDER BY release_date IS NULL, release_date DESC, id ASC",
        ProductSort::Value => " ORDER BY value_score IS NULL, value_score DESC, id ASC",
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, query: &ProductQuery) {
    builder.push(" WHERE 1 = 1");

    if let Some(term) = query.search_term() {
        let pattern = format!("%{term}%");
        builder.push(" AND (name LIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR brand LIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }
    if let Some(brand) = query.brand_term() {
        builder.push(" AND brand LIKE ");
        builder.push_bind(format!("%{brand}%"));
    }
    if let Some(min_price) = query.min_price {
        builder.push(" AND current_lowest >= ");
        builder.push_bind(min_price);
    }
    if let Some(max_price) = query.max_price {
        builder.push(" AND current_lowest <= ");
        builder.push_bind(max_price);
    }
    if let Some(usage) = query.usage {
        builder.push(format!(" AND {} >= ", usage_column(usage)));
        builder.push_bind(i64::from(USAGE_FILTER_THRESHOLD));
    }
}

fn decode_release_date(value: Option<String>) -> Result<Option<NaiveDate>, RepositoryError> {
    value
        .map(|raw| {
            NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|error| {
                RepositoryError::Decode(format!("invalid release date `{raw}`: {error}"))
            })
        })
        .transpose()
}

fn score_column(row: &SqliteRow, column: &str) -> Result<Option<u8>, RepositoryError> {
    let value: Option<i64> = row.try_get(column)?;
    value
        .map(|score| {
            u8::try_from(score).map_err(|_| {
                RepositoryError::Decode(format!("{column} out of range: {score}"))
            })
        })
        .transpose()
}

fn product_from_row(row: &SqliteRow) -> Result<Product, RepositoryError> {
    Ok(Product {
        id: ProductId(row.try_get("id")?),
        external_id: row.try_get("external_id")?,
        name: row.try_get("name")?,
        brand: row.try_get("brand")?,
        image_url: row.try_get("image_url")?,
        mall_url: row.try_get("mall_url")?,
        release_date: decode_release_date(row.try_get("release_date")?)?,
        current_lowest: row.try_get("current_lowest")?,
    })
}

fn listing_from_row(row: &SqliteRow) -> Result<ProductListing, RepositoryError> {
    let scores = match (
        score_column(row, "score_gaming")?,
        score_column(row, "score_work")?,
        score_column(row, "score_student")?,
        score_column(row, "score_video")?,
        score_column(row, "score_portable")?,
        score_column(row, "score_overall")?,
    ) {
        (
            Some(gaming),
            Some(work),
            Some(student),
            Some(video),
            Some(portable),
            Some(overall),
        ) => Some(UsageScores { gaming, work, student, video, portable, overall }),
        _ => None,
    };

    Ok(ProductListing {
        product: product_from_row(row)?,
        scores,
        value_score: row.try_get("value_score")?,
    })
}

#[async_trait::async_trait]
impl ProductRepository for SqlProductRepository {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM product WHERE id = ?1"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(product_from_row).transpose()
    }

    async fn find_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let mut products = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(product) = self.find_by_id(id).await? {
                products.push(product);
            }
        }
        Ok(products)
    }

    async fn search(&self, query: &ProductQuery) -> Result<ProductPage, RepositoryError> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(1) AS total FROM product");
        push_filters(&mut count, query);
        let total: i64 = count.build().fetch_one(&self.pool).await?.try_get("total")?;

        let mut select = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {PRODUCT_COLUMNS} FROM product"
        ));
        push_filters(&mut select, query);
        select.push(order_clause(query.sort));
        select.push(" LIMIT ");
        select.push_bind(i64::from(query.limit()));
        select.push(" OFFSET ");
        select.push_bind(i64::try_from(query.offset()).unwrap_or(i64::MAX));

        let rows = select.build().fetch_all(&self.pool).await?;
        let products = rows.iter().map(listing_from_row).collect::<Result<Vec<_>, _>>()?;

        Ok(ProductPage::new(products, u64::try_from(total).unwrap_or_default(), query))
    }

    async fn list_in_price_range(
        &self,
        budget: Option<Budget>,
        pool: usize,
    ) -> Result<Vec<Product>, RepositoryError> {
        let (min, max) = budget.map(|budget| (budget.min, budget.max)).unwrap_or((0, i64::MAX));
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM product
             WHERE current_lowest IS NOT NULL AND current_lowest >= ?1 AND current_lowest <= ?2
             ORDER BY id ASC
             LIMIT ?3"
        ))
        .bind(min)
        .bind(max)
        .bind(i64::try_from(pool).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(product_from_row).collect()
    }

    async fn save(&self, product: Product) -> Result<(), RepositoryError> {
        let now = format_timestamp(Utc::now());
        sqlx::query(
            "INSERT INTO product (
                id, external_id, name, brand, image_url, mall_url, release_date, current_lowest,
                created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
             ON CONFLICT(id) DO UPDATE SET
                external_id = excluded.external_id,
                name = excluded.name,
                brand = excluded.brand,
                image_url = excluded.image_url,
                mall_url = excluded.mall_url,
                release_date = excluded.release_date,
                current_lowest = excluded.current_lowest,
                updated_at = excluded.updated_at",
        )
        .bind(&product.id.0)
        .bind(&product.external_id)
        .bind(&product.name)
        .bind(&product.brand)
        .bind(&product.image_url)
        .bind(&product.mall_url)
        .bind(product.release_date.map(|date| date.format("%Y-%m-%d").to_string()))
        .bind(product.current_lowest)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn save_scores(
        &self,
        id: &ProductId,
        scores: StoredScores,
    ) -> Result<(), RepositoryError> {
        let usage = scores.scores;
        sqlx::query(
            "UPDATE product SET
                score_gaming = ?2,
                score_work = ?3,
                score_student = ?4,
                score_video = ?5,
                score_portable = ?6,
                score_overall = ?7,
                value_score = ?8
             WHERE id = ?1",
        )
        .bind(&id.0)
        .bind(i64::from(usage.gaming))
        .bind(i64::from(usage.work))
        .bind(i64::from(usage.student))
        .bind(i64::from(usage.video))
        .bind(i64::from(usage.portable))
        .bind(i64::from(usage.overall))
        .bind(scores.value_score)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
