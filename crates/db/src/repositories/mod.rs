use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use lapsight_core::domain::{Budget, ParsedSpec, PriceRecord, Product, ProductId, UsageKind};
use lapsight_core::errors::{ApplicationError, DomainError};
use lapsight_core::scoring::UsageScores;

pub mod memory;
pub mod narrative_cache;
pub mod price_history;
pub mod product;
pub mod spec;

pub use memory::{
    InMemoryNarrativeCache, InMemoryPriceHistoryRepository, InMemoryProductRepository,
    InMemorySpecRepository,
};
pub use narrative_cache::SqlNarrativeCache;
pub use price_history::SqlPriceHistoryRepository;
pub use product::SqlProductRepository;
pub use spec::SqlSpecRepository;

pub const DEFAULT_PAGE_LIMIT: u32 = 20;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Minimum stored usage score for a product to pass a usage filter.
pub const USAGE_FILTER_THRESHOLD: u8 = 60;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        ApplicationError::Persistence(value.to_string())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    /// Most recently updated first.
    #[default]
    Relevance,
    PriceAsc,
    PriceDesc,
    Newest,
    Value,
}

impl std::str::FromStr for ProductSort {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "relevance" => Ok(Self::Relevance),
            "price_asc" => Ok(Self::PriceAsc),
            "price_desc" => Ok(Self::PriceDesc),
            "newest" => Ok(Self::Newest),
            "value" => Ok(Self::Value),
            _ => Err(DomainError::UnknownValue { kind: "sort", value: value.to_string() }),
        }
    }
}

/// Catalog listing filters. `page` is 1-based.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProductQuery {
    pub q: Option<String>,
    pub brand: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub usage: Option<UsageKind>,
    pub sort: ProductSort,
    pub page: u32,
    pub limit: u32,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            q: None,
            brand: None,
            min_price: None,
            max_price: None,
            usage: None,
            sort: ProductSort::Relevance,
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl ProductQuery {
    pub fn page(&self) -> u32 {
        self.page.max(1)
    }

    pub fn limit(&self) -> u32 {
        self.limit.clamp(1, MAX_PAGE_LIMIT)
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page() - 1) * u64::from(self.limit())
    }

    pub(crate) fn search_term(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|term| !term.is_empty())
    }

    pub(crate) fn brand_term(&self) -> Option<&str> {
        self.brand.as_deref().map(str::trim).filter(|term| !term.is_empty())
    }
}

/// Usage scores and value score cached on the product row for filtering and sorting.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredScores {
    pub scores: UsageScores,
    pub value_score: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductListing {
    #[serde(flatten)]
    pub product: Product,
    pub scores: Option<UsageScores>,
    pub value_score: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductPage {
    pub products: Vec<ProductListing>,
    pub total: u64,
    pub page: u32,
    pub total_pages: u32,
}

impl ProductPage {
    pub fn new(products: Vec<ProductListing>, total: u64, query: &ProductQuery) -> Self {
        let limit = u64::from(query.limit());
        let total_pages = u32::try_from(total.div_ceil(limit)).unwrap_or(u32::MAX);
        Self { products, total, page: query.page(), total_pages }
    }
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Returns the products that exist, in the order requested.
    async fn find_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError>;

    async fn search(&self, query: &ProductQuery) -> Result<ProductPage, RepositoryError>;

    /// Priced products inside the budget, at most `pool` of them, ordered by id.
    async fn list_in_price_range(
        &self,
        budget: Option<Budget>,
        pool: usize,
    ) -> Result<Vec<Product>, RepositoryError>;

    /// Inserts or updates listing metadata; stored scores are kept.
    async fn save(&self, product: Product) -> Result<(), RepositoryError>;

    async fn save_scores(
        &self,
        id: &ProductId,
        scores: StoredScores,
    ) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait SpecRepository: Send + Sync {
    async fn find(&self, product_id: &ProductId) -> Result<Option<ParsedSpec>, RepositoryError>;

    /// Overwrites any previous spec for the product.
    async fn save(&self, product_id: &ProductId, spec: &ParsedSpec) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait PriceHistoryRepository: Send + Sync {
    /// Records one price. Returns `false` when the product already has a record
    /// for that calendar day; the existing record is kept.
    async fn append(
        &self,
        product_id: &ProductId,
        record: &PriceRecord,
    ) -> Result<bool, RepositoryError>;

    /// Oldest first.
    async fn list_for_product(
        &self,
        product_id: &ProductId,
    ) -> Result<Vec<PriceRecord>, RepositoryError>;

    /// Records at or after `since`, oldest first.
    async fn list_since(
        &self,
        product_id: &ProductId,
        since: DateTime<Utc>,
    ) -> Result<Vec<PriceRecord>, RepositoryError>;

    /// Deletes every price record, returning how many were removed.
    async fn reset_all(&self) -> Result<u64, RepositoryError>;
}

pub(crate) fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("invalid timestamp `{value}`: {error}")))
}

#[cfg(test)]
mod tests {
    use super::{ProductPage, ProductQuery, ProductSort};

    #[test]
    fn sort_parses_known_values_and_defaults_to_relevance() {
        assert_eq!("price_asc".parse::<ProductSort>(), Ok(ProductSort::PriceAsc));
        assert_eq!("".parse::<ProductSort>(), Ok(ProductSort::Relevance));
        assert!("cheapest".parse::<ProductSort>().is_err());
    }

    #[test]
    fn paging_is_clamped() {
        let query = ProductQuery { page: 0, limit: 500, ..ProductQuery::default() };
        assert_eq!(query.page(), 1);
        assert_eq!(query.limit(), 100);
        assert_eq!(query.offset(), 0);

        let query = ProductQuery { page: 3, limit: 20, ..ProductQuery::default() };
        assert_eq!(query.offset(), 40);
    }

    #[test]
    fn total_pages_round_up() {
        let query = ProductQuery { limit: 20, ..ProductQuery::default() };
        assert_eq!(ProductPage::new(Vec::new(), 41, &query).total_pages, 3);
        assert_eq!(ProductPage::new(Vec::new(), 0, &query).total_pages, 0);
    }
}
