//! Read-side service combining the product, spec and price repositories into
//! engine inputs.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use lapsight_core::domain::{Budget, GpuTier, ParsedSpec, PriceRecord, Product, ProductId};
use lapsight_core::errors::ApplicationError;
use lapsight_core::games::{estimate_game_fps, GameEstimate};
use lapsight_core::pricing::{analyze_prices, PriceAnalysis};
use lapsight_core::recommend::{current_price, Candidate};
use lapsight_core::report::ProductReport;
use lapsight_core::verdict::{evaluate_should_buy, ShouldBuy};

use crate::repositories::{
    PriceHistoryRepository, ProductPage, ProductQuery, ProductRepository, SpecRepository,
    SqlPriceHistoryRepository, SqlProductRepository, SqlSpecRepository, StoredScores,
};
use crate::DbPool;

/// Price history for charting plus its analysis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceTrendView {
    pub product_id: ProductId,
    pub days: u32,
    pub history: Vec<PriceRecord>,
    pub analysis: PriceAnalysis,
}

/// Product page payload: listing metadata, the stored spec when one exists and
/// the analysis over the whole price history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductDetail {
    pub product: Product,
    pub spec: Option<ParsedSpec>,
    pub price: PriceAnalysis,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameEstimateView {
    pub product_id: ProductId,
    pub gpu_tier: GpuTier,
    pub refresh_rate: u32,
    pub estimates: Vec<GameEstimate>,
}

#[derive(Clone)]
pub struct Catalog {
    products: Arc<dyn ProductRepository>,
    specs: Arc<dyn SpecRepository>,
    prices: Arc<dyn PriceHistoryRepository>,
}

impl Catalog {
    pub fn new(
        products: Arc<dyn ProductRepository>,
        specs: Arc<dyn SpecRepository>,
        prices: Arc<dyn PriceHistoryRepository>,
    ) -> Self {
        Self { products, specs, prices }
    }

    pub fn sqlite(pool: DbPool) -> Self {
        Self::new(
            Arc::new(SqlProductRepository::new(pool.clone())),
            Arc::new(SqlSpecRepository::new(pool.clone())),
            Arc::new(SqlPriceHistoryRepository::new(pool)),
        )
    }

    pub fn products(&self) -> &dyn ProductRepository {
        self.products.as_ref()
    }

    pub fn specs(&self) -> &dyn SpecRepository {
        self.specs.as_ref()
    }

    pub fn prices(&self) -> &dyn PriceHistoryRepository {
        self.prices.as_ref()
    }

    pub async fn browse(&self, query: &ProductQuery) -> Result<ProductPage, ApplicationError> {
        let page = self.products.search(query).await?;
        debug!(
            event_name = "catalog.browse",
            total = page.total,
            page = page.page,
            "catalog page loaded"
        );
        Ok(page)
    }

    pub async fn product(&self, id: &ProductId) -> Result<Product, ApplicationError> {
        self.products
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApplicationError::NotFound(format!("product `{id}`")))
    }

    async fn spec(&self, id: &ProductId) -> Result<ParsedSpec, ApplicationError> {
        self.specs
            .find(id)
            .await?
            .ok_or_else(|| ApplicationError::NotFound(format!("spec for product `{id}`")))
    }

    /// Full analysis over the product's whole price history.
    pub async fn report(
        &self,
        id: &ProductId,
        now: DateTime<Utc>,
    ) -> Result<ProductReport, ApplicationError> {
        let product = self.product(id).await?;
        let spec = self.spec(id).await?;
        let history = self.prices.list_for_product(id).await?;
        Ok(ProductReport::build(product, spec, &history, now))
    }

    /// Reports for the requested products, skipping ids that are missing or
    /// have no stored spec.
    pub async fn reports(
        &self,
        ids: &[ProductId],
        now: DateTime<Utc>,
    ) -> Result<Vec<ProductReport>, ApplicationError> {
        let mut reports = Vec::with_capacity(ids.len());
        for product in self.products.find_many(ids).await? {
            let Some(spec) = self.specs.find(&product.id).await? else {
                continue;
            };
            let history = self.prices.list_for_product(&product.id).await?;
            reports.push(ProductReport::build(product, spec, &history, now));
        }
        Ok(reports)
    }

    pub async fn price_trend(
        &self,
        id: &ProductId,
        days: u32,
        now: DateTime<Utc>,
    ) -> Result<PriceTrendView, ApplicationError> {
        let product = self.product(id).await?;
        let history = self.prices.list_since(id, now - Duration::days(i64::from(days))).await?;
        let analysis = analyze_prices(&history, current_price(&product, &history), now);

        Ok(PriceTrendView { product_id: product.id, days, history, analysis })
    }

    pub async fn detail(
        &self,
        id: &ProductId,
        now: DateTime<Utc>,
    ) -> Result<ProductDetail, ApplicationError> {
        let product = self.product(id).await?;
        let spec = self.specs.find(id).await?;
        let history = self.prices.list_for_product(id).await?;
        let price = analyze_prices(&history, current_price(&product, &history), now);
        Ok(ProductDetail { product, spec, price })
    }

    /// Buy-timing verdict from price history and release age alone, so it
    /// works for products whose spec was never parsed.
    pub async fn should_buy(
        &self,
        id: &ProductId,
        now: DateTime<Utc>,
    ) -> Result<ShouldBuy, ApplicationError> {
        let product = self.product(id).await?;
        let history = self.prices.list_for_product(id).await?;
        let analysis = analyze_prices(&history, current_price(&product, &history), now);
        Ok(evaluate_should_buy(&analysis, product.months_since_release(now)))
    }

    /// Frame-rate estimates for the product's GPU tier and panel. A product
    /// without a stored spec is estimated as integrated graphics at 60 Hz.
    pub async fn game_estimates(
        &self,
        id: &ProductId,
    ) -> Result<GameEstimateView, ApplicationError> {
        let product = self.product(id).await?;
        let spec = self.specs.find(id).await?.unwrap_or_default();
        let gpu_tier = spec.gpu_tier;
        let refresh_rate = spec.effective_refresh_rate();
        Ok(GameEstimateView {
            product_id: product.id,
            gpu_tier,
            refresh_rate,
            estimates: estimate_game_fps(gpu_tier, refresh_rate),
        })
    }

    /// Budget-filtered candidates for the ranker. Products without a stored
    /// spec are left out.
    pub async fn candidates(
        &self,
        budget: Option<Budget>,
        pool: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<Candidate>, ApplicationError> {
        let products = self.products.list_in_price_range(budget, pool).await?;
        let mut candidates = Vec::with_capacity(products.len());
        for product in products {
            let Some(spec) = self.specs.find(&product.id).await? else {
                continue;
            };
            let history = self.prices.list_for_product(&product.id).await?;
            candidates.push(Candidate::assemble(product, spec, &history, now));
        }

        debug!(
            event_name = "catalog.candidates",
            candidates = candidates.len(),
            pool,
            "recommendation candidates assembled"
        );
        Ok(candidates)
    }

    /// Recomputes the report and stores its usage and value scores on the
    /// product row so listings can filter and sort on them.
    pub async fn refresh(
        &self,
        id: &ProductId,
        now: DateTime<Utc>,
    ) -> Result<ProductReport, ApplicationError> {
        let report = self.report(id, now).await?;
        self.products
            .save_scores(
                id,
                StoredScores { scores: report.scores, value_score: report.price.value_score },
            )
            .await?;

        info!(
            event_name = "catalog.scores.refreshed",
            product_id = %id,
            overall = report.scores.overall,
            value_score = report.price.value_score,
            "product scores refreshed"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{DateTime, Duration, TimeZone, Utc};

    use lapsight_core::domain::{Budget, GpuTier, ParsedSpec, PriceRecord, Product, ProductId};
    use lapsight_core::errors::ApplicationError;

    use super::Catalog;
    use crate::repositories::{
        InMemoryPriceHistoryRepository, InMemoryProductRepository, InMemorySpecRepository,
        PriceHistoryRepository, ProductQuery, ProductRepository, SpecRepository,
    };

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 17, 9, 30, 0).single().expect("timestamp")
    }

    fn catalog() -> Catalog {
        Catalog::new(
            Arc::new(InMemoryProductRepository::default()),
            Arc::new(InMemorySpecRepository::default()),
            Arc::new(InMemoryPriceHistoryRepository::default()),
        )
    }

    fn product(id: &str, price: Option<i64>) -> Product {
        Product {
            id: ProductId(id.to_string()),
            external_id: format!("ext-{id}"),
            name: format!("Laptop {id}"),
            brand: "Brand".to_string(),
            image_url: None,
            mall_url: format!("https://example.com/{id}"),
            release_date: None,
            current_lowest: price,
        }
    }

    async fn add(catalog: &Catalog, id: &str, price: Option<i64>, spec: Option<ParsedSpec>) {
        catalog.products().save(product(id, price)).await.expect("save product");
        if let Some(spec) = spec {
            catalog.specs().save(&ProductId(id.to_string()), &spec).await.expect("save spec");
        }
    }

    #[tokio::test]
    async fn report_for_missing_product_is_not_found() {
        let catalog = catalog();
        let error = catalog.report(&ProductId("nope".to_string()), now()).await;
        assert!(matches!(error, Err(ApplicationError::NotFound(_))));
    }

    #[tokio::test]
    async fn report_without_spec_is_not_found() {
        let catalog = catalog();
        add(&catalog, "a", Some(1_000_000), None).await;
        let error = catalog.report(&ProductId("a".to_string()), now()).await;
        assert!(matches!(
            error,
            Err(ApplicationError::NotFound(message)) if message.contains("spec")
        ));
    }

    #[tokio::test]
    async fn candidates_skip_products_without_specs() {
        let catalog = catalog();
        add(&catalog, "a", Some(1_200_000), Some(ParsedSpec::default())).await;
        add(&catalog, "b", Some(1_300_000), None).await;
        add(&catalog, "c", Some(3_000_000), Some(ParsedSpec::default())).await;

        let budget = Budget::new(1_000_000, 2_000_000).expect("budget");
        let candidates = catalog.candidates(Some(budget), 100, now()).await.expect("candidates");

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].product.id.0, "a");
    }

    #[tokio::test]
    async fn price_trend_uses_the_requested_window() {
        let catalog = catalog();
        add(&catalog, "a", Some(850_000), Some(ParsedSpec::default())).await;
        let id = ProductId("a".to_string());
        for day in 0..60 {
            catalog
                .prices()
                .append(&id, &PriceRecord::new(1_000_000, now() - Duration::days(day)))
                .await
                .expect("append");
        }

        let trend = catalog.price_trend(&id, 30, now()).await.expect("trend");
        assert_eq!(trend.history.len(), 31);
        assert_eq!(trend.analysis.current_lowest, 850_000);
        assert!(trend.analysis.price_drop_detected);
    }

    #[tokio::test]
    async fn price_trend_falls_back_to_history_then_zero() {
        let catalog = catalog();
        add(&catalog, "listed", None, None).await;
        add(&catalog, "unpriced", None, None).await;
        let listed = ProductId("listed".to_string());
        catalog
            .prices()
            .append(&listed, &PriceRecord::new(1_240_000, now() - Duration::days(3)))
            .await
            .expect("append");

        let trend = catalog.price_trend(&listed, 30, now()).await.expect("trend");
        assert_eq!(trend.analysis.current_lowest, 1_240_000);

        let trend = catalog
            .price_trend(&ProductId("unpriced".to_string()), 30, now())
            .await
            .expect("trend");
        assert!(trend.history.is_empty());
        assert_eq!(trend.analysis.current_lowest, 0);
    }

    #[tokio::test]
    async fn refresh_makes_products_filterable_by_usage() {
        let catalog = catalog();
        let gaming = ParsedSpec {
            cpu: "Intel Core i9-14900HX".to_string(),
            gpu: Some("NVIDIA RTX 4080".to_string()),
            gpu_tier: GpuTier::new(9),
            ram_gb: 32,
            refresh_rate: Some(240),
            ..ParsedSpec::default()
        };
        add(&catalog, "rig", Some(3_200_000), Some(gaming)).await;
        add(&catalog, "plain", Some(600_000), Some(ParsedSpec::default())).await;

        for id in ["rig", "plain"] {
            catalog.refresh(&ProductId(id.to_string()), now()).await.expect("refresh");
        }

        let page = catalog
            .browse(&ProductQuery {
                usage: Some(lapsight_core::domain::UsageKind::Gaming),
                ..ProductQuery::default()
            })
            .await
            .expect("browse");
        assert_eq!(page.total, 1);
        assert_eq!(page.products[0].product.id.0, "rig");
        assert!(page.products[0].scores.is_some());
    }

    #[tokio::test]
    async fn detail_works_without_a_stored_spec() {
        let catalog = catalog();
        add(&catalog, "a", None, None).await;
        let id = ProductId("a".to_string());
        catalog
            .prices()
            .append(&id, &PriceRecord::new(990_000, now() - Duration::days(2)))
            .await
            .expect("append");

        let detail = catalog.detail(&id, now()).await.expect("detail");
        assert_eq!(detail.spec, None);
        assert_eq!(detail.price.current_lowest, 990_000);
    }

    #[tokio::test]
    async fn should_buy_needs_only_the_product() {
        let catalog = catalog();
        add(&catalog, "a", Some(1_000_000), None).await;

        let verdict =
            catalog.should_buy(&ProductId("a".to_string()), now()).await.expect("verdict");
        assert!((0..=100).contains(&verdict.score));
        assert!(matches!(
            catalog.should_buy(&ProductId("missing".to_string()), now()).await,
            Err(ApplicationError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn game_estimates_default_to_integrated_graphics() {
        let catalog = catalog();
        add(&catalog, "plain", Some(700_000), None).await;
        let strong = ParsedSpec {
            gpu_tier: GpuTier::new(8),
            refresh_rate: Some(165),
            ..ParsedSpec::default()
        };
        add(&catalog, "rig", Some(2_500_000), Some(strong)).await;

        let plain = catalog.game_estimates(&ProductId("plain".to_string())).await.expect("plain");
        assert_eq!((plain.gpu_tier, plain.refresh_rate), (GpuTier::MIN, 60));

        let rig = catalog.game_estimates(&ProductId("rig".to_string())).await.expect("rig");
        assert_eq!((rig.gpu_tier.get(), rig.refresh_rate), (8, 165));
        assert_eq!(rig.estimates.len(), plain.estimates.len());
    }
}
