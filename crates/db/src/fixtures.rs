use chrono::{DateTime, Duration, Utc};

use lapsight_core::domain::{PriceRecord, Product, ProductId};
use lapsight_core::normalize::{estimate_release_date, parse_spec};
use lapsight_core::report::ProductReport;

use crate::connection::DbPool;
use crate::repositories::{
    PriceHistoryRepository, ProductRepository, RepositoryError, SpecRepository,
    SqlPriceHistoryRepository, SqlProductRepository, SqlSpecRepository, StoredScores,
};

/// Days of price history generated per demo laptop, today included.
pub const HISTORY_DAYS: i64 = 60;

const DEMO_MALL: &str = "Demo Mall";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PriceShape {
    Stable,
    Falling,
    Rising,
    /// Flat history with a sharp cut over the last two days.
    RecentDrop,
}

#[derive(Debug, Clone, Copy)]
struct DemoLaptop {
    id: &'static str,
    external_id: &'static str,
    brand: &'static str,
    title: &'static str,
    base_price: i64,
    shape: PriceShape,
}

const DEMO_LAPTOPS: &[DemoLaptop] = &[
    DemoLaptop {
        id: "lap-rog-strix-g16",
        external_id: "demo-1001",
        brand: "ASUS",
        title: "ASUS 2025 ROG Strix G16 i9-14900HX RTX 4070 8GB GDDR6 32GB DDR5 1TB SSD 16인치 2560x1600 240Hz 2.5kg 90Wh",
        base_price: 2_890_000,
        shape: PriceShape::RecentDrop,
    },
    DemoLaptop {
        id: "lap-legion-5",
        external_id: "demo-1002",
        brand: "Lenovo",
        title: "Lenovo 2024 Legion 5 Ryzen 7 7840HS RTX 4060 16GB DDR5 512GB SSD 15.6인치 165Hz IPS 2.4kg 80Wh",
        base_price: 1_690_000,
        shape: PriceShape::Stable,
    },
    DemoLaptop {
        id: "lap-gram-14",
        external_id: "demo-1003",
        brand: "LG",
        title: "LG 2026 gram 14 Ultra 5 225H 16GB LPDDR5X 512GB SSD 14인치 1.13kg 72Wh WiFi 7 썬더볼트4",
        base_price: 1_590_000,
        shape: PriceShape::Falling,
    },
    DemoLaptop {
        id: "lap-macbook-air-m4",
        external_id: "demo-1004",
        brand: "Apple",
        title: "Apple 2026 MacBook Air M4 16GB 512GB SSD 13.6인치 1.24kg 53Wh",
        base_price: 1_590_000,
        shape: PriceShape::Stable,
    },
    DemoLaptop {
        id: "lap-zenbook-14-oled",
        external_id: "demo-1005",
        brand: "ASUS",
        title: "ASUS 2025 Zenbook 14 OLED Ultra 7 155H 32GB LPDDR5X 1TB SSD 2880x1800 120Hz 1.2kg 75Wh",
        base_price: 1_890_000,
        shape: PriceShape::Rising,
    },
    DemoLaptop {
        id: "lap-ideapad-slim-3",
        external_id: "demo-1006",
        brand: "Lenovo",
        title: "Lenovo 2023 IdeaPad Slim 3 i5-1335U 8GB RAM 256GB SSD 15.6인치 1.6kg 47Wh",
        base_price: 690_000,
        shape: PriceShape::Stable,
    },
    DemoLaptop {
        id: "lap-galaxy-book4-pro",
        external_id: "demo-1007",
        brand: "Samsung",
        title: "Samsung 2024 Galaxy Book4 Pro Ultra 7 155H 16GB LPDDR5X 512GB SSD 14인치 AMOLED 2880x1800 120Hz 1.23kg 63Wh",
        base_price: 1_790_000,
        shape: PriceShape::Falling,
    },
    DemoLaptop {
        id: "lap-victus-15",
        external_id: "demo-1008",
        brand: "HP",
        title: "HP 2023 Victus 15 i5-12450H RTX 3050 4GB GDDR6 8GB DDR4 512GB SSD 15.6인치 144Hz 2.29kg 70Wh",
        base_price: 890_000,
        shape: PriceShape::RecentDrop,
    },
];

impl DemoLaptop {
    /// Deterministic price `days_ago` days before the seeding day, rounded
    /// down to the nearest thousand won.
    fn price_on(&self, days_ago: i64, ordinal: usize) -> i64 {
        const RIPPLE: [i64; 4] = [0, 5_000, -5_000, 0];
        let ripple = RIPPLE[(days_ago as usize + ordinal) % RIPPLE.len()];
        let base = self.base_price;

        let price = match self.shape {
            PriceShape::Stable => base + ripple,
            PriceShape::Falling => base + base * days_ago / 400 + ripple,
            PriceShape::Rising => base - base * days_ago / 400 + ripple,
            PriceShape::RecentDrop if days_ago <= 1 => base * 85 / 100,
            PriceShape::RecentDrop => base + ripple,
        };
        price / 1_000 * 1_000
    }

    fn product(&self, ordinal: usize) -> Product {
        Product {
            id: ProductId(self.id.to_string()),
            external_id: self.external_id.to_string(),
            name: self.title.to_string(),
            brand: self.brand.to_string(),
            image_url: None,
            mall_url: format!("https://search.shopping.example.com/catalog/{}", self.external_id),
            release_date: estimate_release_date(self.title),
            current_lowest: Some(self.price_on(0, ordinal)),
        }
    }
}

/// Deterministic laptop catalog for local runs and tests.
pub struct DemoCatalog;

impl DemoCatalog {
    pub fn product_ids() -> Vec<ProductId> {
        DEMO_LAPTOPS.iter().map(|laptop| ProductId(laptop.id.to_string())).collect()
    }

    /// Load the demo catalog. Re-running on the same day changes nothing; a
    /// later day adds the missing price points.
    pub async fn load(pool: &DbPool, now: DateTime<Utc>) -> Result<SeedResult, RepositoryError> {
        let products = SqlProductRepository::new(pool.clone());
        let specs = SqlSpecRepository::new(pool.clone());
        let prices = SqlPriceHistoryRepository::new(pool.clone());

        let mut price_points = 0;
        for (ordinal, laptop) in DEMO_LAPTOPS.iter().enumerate() {
            let product = laptop.product(ordinal);
            let spec = parse_spec(laptop.title, None);

            products.save(product.clone()).await?;
            specs.save(&product.id, &spec).await?;

            for days_ago in (0..HISTORY_DAYS).rev() {
                let record = PriceRecord {
                    price: laptop.price_on(days_ago, ordinal),
                    recorded_at: now - Duration::days(days_ago),
                    mall_name: Some(DEMO_MALL.to_string()),
                };
                if prices.append(&product.id, &record).await? {
                    price_points += 1;
                }
            }

            let history = prices.list_for_product(&product.id).await?;
            let report = ProductReport::build(product.clone(), spec, &history, now);
            products
                .save_scores(
                    &product.id,
                    StoredScores { scores: report.scores, value_score: report.price.value_score },
                )
                .await?;
        }

        Ok(SeedResult {
            products_seeded: DEMO_LAPTOPS.iter().map(|laptop| laptop.id).collect(),
            price_points,
        })
    }

    /// Verify every demo laptop has a spec, scores and a full price history.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::with_capacity(DEMO_LAPTOPS.len() * 3);

        for laptop in DEMO_LAPTOPS {
            let scored: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM product WHERE id = ?1 AND score_overall IS NOT NULL)",
            )
            .bind(laptop.id)
            .fetch_one(pool)
            .await?;
            checks.push(SeedCheck { product_id: laptop.id, check: "product", passed: scored == 1 });

            let spec: i64 =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM product_spec WHERE product_id = ?1)")
                    .bind(laptop.id)
                    .fetch_one(pool)
                    .await?;
            checks.push(SeedCheck { product_id: laptop.id, check: "spec", passed: spec == 1 });

            let history: i64 =
                sqlx::query_scalar("SELECT COUNT(1) FROM price_history WHERE product_id = ?1")
                    .bind(laptop.id)
                    .fetch_one(pool)
                    .await?;
            checks.push(SeedCheck {
                product_id: laptop.id,
                check: "price_history",
                passed: history >= HISTORY_DAYS,
            });
        }

        let all_present = checks.iter().all(|check| check.passed);
        Ok(VerificationResult { all_present, checks })
    }

    /// Remove the demo laptops along with their specs, prices and narratives.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;
        let quoted_ids = sql_array_from_ids(DEMO_LAPTOPS.iter().map(|laptop| laptop.id));

        sqlx::query(&format!("DELETE FROM narrative_cache WHERE product_id IN {quoted_ids}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM product WHERE id IN {quoted_ids}"))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

fn sql_array_from_ids<'a>(ids: impl Iterator<Item = &'a str>) -> String {
    let quoted = ids.map(|id| format!("'{id}'")).collect::<Vec<_>>().join(",");
    format!("({quoted})")
}

#[derive(Debug)]
pub struct SeedResult {
    pub products_seeded: Vec<&'static str>,
    pub price_points: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedCheck {
    pub product_id: &'static str,
    pub check: &'static str,
    pub passed: bool,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<SeedCheck>,
}
