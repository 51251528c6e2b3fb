use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use lapsight_core::domain::{Budget, ParsedSpec, PriceRecord, Product, ProductId};
use lapsight_core::errors::ApplicationError;
use lapsight_core::narrative::{CachedNarrative, NarrativeCache};

use super::{
    PriceHistoryRepository, ProductListing, ProductPage, ProductQuery, ProductRepository,
    ProductSort, RepositoryError, SpecRepository, StoredScores, USAGE_FILTER_THRESHOLD,
};

#[derive(Clone)]
struct StoredProduct {
    product: Product,
    scores: Option<StoredScores>,
    /// Monotonic save counter standing in for `updated_at`.
    revision: u64,
}

#[derive(Default)]
pub struct InMemoryProductRepository {
    products: RwLock<BTreeMap<String, StoredProduct>>,
    revisions: RwLock<u64>,
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn matches(stored: &StoredProduct, query: &ProductQuery) -> bool {
    let product = &stored.product;
    if let Some(term) = query.search_term() {
        if !contains_ignore_case(&product.name, term) && !contains_ignore_case(&product.brand, term)
        {
            return false;
        }
    }
    if let Some(brand) = query.brand_term() {
        if !contains_ignore_case(&product.brand, brand) {
            return false;
        }
    }
    if query.min_price.is_some() || query.max_price.is_some() {
        let Some(price) = product.current_lowest else {
            return false;
        };
        if query.min_price.is_some_and(|min| price < min)
            || query.max_price.is_some_and(|max| price > max)
        {
            return false;
        }
    }
    if let Some(usage) = query.usage {
        let passes = stored
            .scores
            .is_some_and(|stored| stored.scores.for_usage(usage) >= USAGE_FILTER_THRESHOLD);
        if !passes {
            return false;
        }
    }
    true
}

/// Missing keys sort after present ones regardless of direction.
fn missing_last<T: PartialOrd>(
    left: Option<T>,
    right: Option<T>,
    descending: bool,
) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (left, right) {
        (Some(left), Some(right)) => {
            let ordering = left.partial_cmp(&right).unwrap_or(Ordering::Equal);
            if descending {
                ordering.reverse()
            } else {
                ordering
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[async_trait::async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let products = self.products.read().await;
        Ok(products.get(&id.0).map(|stored| stored.product.clone()))
    }

    async fn find_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let products = self.products.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| products.get(&id.0))
            .map(|stored| stored.product.clone())
            .collect())
    }

    async fn search(&self, query: &ProductQuery) -> Result<ProductPage, RepositoryError> {
        let products = self.products.read().await;
        let mut found: Vec<&StoredProduct> =
            products.values().filter(|stored| matches(stored, query)).collect();

        // BTreeMap iteration is already ordered by id, so every sort below is
        // id-ascending on ties.
        match query.sort {
            ProductSort::Relevance => found.sort_by(|a, b| b.revision.cmp(&a.revision)),
            ProductSort::PriceAsc => found.sort_by(|a, b| {
                missing_last(a.product.current_lowest, b.product.current_lowest, false)
            }),
            ProductSort::PriceDesc => found.sort_by(|a, b| {
                missing_last(a.product.current_lowest, b.product.current_lowest, true)
            }),
            ProductSort::Newest => found.sort_by(|a, b| {
                missing_last(a.product.release_date, b.product.release_date, true)
            }),
            ProductSort::Value => found.sort_by(|a, b| {
                missing_last(
                    a.scores.map(|stored| stored.value_score),
                    b.scores.map(|stored| stored.value_score),
                    true,
                )
            }),
        }

        let total = found.len() as u64;
        let listings = found
            .into_iter()
            .skip(usize::try_from(query.offset()).unwrap_or(usize::MAX))
            .take(query.limit() as usize)
            .map(|stored| ProductListing {
                product: stored.product.clone(),
                scores: stored.scores.map(|stored| stored.scores),
                value_score: stored.scores.map(|stored| stored.value_score),
            })
            .collect();

        Ok(ProductPage::new(listings, total, query))
    }

    async fn list_in_price_range(
        &self,
        budget: Option<Budget>,
        pool: usize,
    ) -> Result<Vec<Product>, RepositoryError> {
        let products = self.products.read().await;
        Ok(products
            .values()
            .filter(|stored| match (stored.product.current_lowest, budget) {
                (Some(price), Some(budget)) => budget.contains(price),
                (Some(_), None) => true,
                (None, _) => false,
            })
            .take(pool)
            .map(|stored| stored.product.clone())
            .collect())
    }

    async fn save(&self, product: Product) -> Result<(), RepositoryError> {
        let revision = {
            let mut revisions = self.revisions.write().await;
            *revisions += 1;
            *revisions
        };
        let mut products = self.products.write().await;
        let scores = products.get(&product.id.0).and_then(|stored| stored.scores);
        products.insert(product.id.0.clone(), StoredProduct { product, scores, revision });
        Ok(())
    }

    async fn save_scores(
        &self,
        id: &ProductId,
        scores: StoredScores,
    ) -> Result<(), RepositoryError> {
        let mut products = self.products.write().await;
        if let Some(stored) = products.get_mut(&id.0) {
            stored.scores = Some(scores);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemorySpecRepository {
    specs: RwLock<HashMap<String, ParsedSpec>>,
}

#[async_trait::async_trait]
impl SpecRepository for InMemorySpecRepository {
    async fn find(&self, product_id: &ProductId) -> Result<Option<ParsedSpec>, RepositoryError> {
        let specs = self.specs.read().await;
        Ok(specs.get(&product_id.0).cloned())
    }

    async fn save(&self, product_id: &ProductId, spec: &ParsedSpec) -> Result<(), RepositoryError> {
        let mut specs = self.specs.write().await;
        specs.insert(product_id.0.clone(), spec.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryPriceHistoryRepository {
    history: RwLock<HashMap<String, Vec<PriceRecord>>>,
}

#[async_trait::async_trait]
impl PriceHistoryRepository for InMemoryPriceHistoryRepository {
    async fn append(
        &self,
        product_id: &ProductId,
        record: &PriceRecord,
    ) -> Result<bool, RepositoryError> {
        let mut history = self.history.write().await;
        let records = history.entry(product_id.0.clone()).or_default();
        if records.iter().any(|existing| existing.recorded_on() == record.recorded_on()) {
            return Ok(false);
        }
        records.push(record.clone());
        records.sort_by_key(|record| record.recorded_at);
        Ok(true)
    }

    async fn list_for_product(
        &self,
        product_id: &ProductId,
    ) -> Result<Vec<PriceRecord>, RepositoryError> {
        let history = self.history.read().await;
        Ok(history.get(&product_id.0).cloned().unwrap_or_default())
    }

    async fn list_since(
        &self,
        product_id: &ProductId,
        since: DateTime<Utc>,
    ) -> Result<Vec<PriceRecord>, RepositoryError> {
        let history = self.history.read().await;
        Ok(history
            .get(&product_id.0)
            .map(|records| {
                records.iter().filter(|record| record.recorded_at >= since).cloned().collect()
            })
            .unwrap_or_default())
    }

    async fn reset_all(&self) -> Result<u64, RepositoryError> {
        let mut history = self.history.write().await;
        let removed = history.values().map(Vec::len).sum::<usize>() as u64;
        history.clear();
        Ok(removed)
    }
}

#[derive(Default)]
pub struct InMemoryNarrativeCache {
    entries: RwLock<HashMap<String, CachedNarrative>>,
}

impl InMemoryNarrativeCache {
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl NarrativeCache for InMemoryNarrativeCache {
    async fn get(
        &self,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<CachedNarrative>, ApplicationError> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).filter(|entry| entry.is_fresh(now)).cloned())
    }

    async fn put(&self, entry: CachedNarrative) -> Result<(), ApplicationError> {
        let mut entries = self.entries.write().await;
        entries.insert(entry.key.clone(), entry);
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> Result<(), ApplicationError> {
        let mut entries = self.entries.write().await;
        entries.remove(key);
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, ApplicationError> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_fresh(now));
        Ok((before - entries.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, TimeZone, Utc};

    use lapsight_core::domain::{Budget, ParsedSpec, PriceRecord, Product, ProductId, UsageKind};
    use lapsight_core::narrative::{CachedNarrative, NarrativeCache};
    use lapsight_core::scoring::UsageScores;

    use crate::repositories::{
        InMemoryNarrativeCache, InMemoryPriceHistoryRepository, InMemoryProductRepository,
        InMemorySpecRepository, PriceHistoryRepository, ProductQuery, ProductRepository,
        ProductSort, SpecRepository, StoredScores,
    };

    fn product(id: &str, price: Option<i64>, year: Option<i32>) -> Product {
        Product {
            id: ProductId(id.to_string()),
            external_id: format!("ext-{id}"),
            name: format!("Laptop {id}"),
            brand: "Brand".to_string(),
            image_url: None,
            mall_url: format!("https://example.com/{id}"),
            release_date: year.and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1)),
            current_lowest: price,
        }
    }

    #[tokio::test]
    async fn in_memory_product_repo_round_trip() {
        let repo = InMemoryProductRepository::default();
        let saved = product("a", Some(1_000_000), Some(2025));

        repo.save(saved.clone()).await.expect("save product");
        let found = repo.find_by_id(&saved.id).await.expect("find product");

        assert_eq!(found, Some(saved));
    }

    #[tokio::test]
    async fn in_memory_search_mirrors_sql_ordering() {
        let repo = InMemoryProductRepository::default();
        repo.save(product("a", Some(2_000_000), Some(2024))).await.expect("a");
        repo.save(product("b", None, Some(2026))).await.expect("b");
        repo.save(product("c", Some(900_000), None)).await.expect("c");
        repo.save_scores(
            &ProductId("c".to_string()),
            StoredScores {
                scores: UsageScores {
                    gaming: 20,
                    work: 70,
                    student: 80,
                    video: 30,
                    portable: 75,
                    overall: 55,
                },
                value_score: 65.0,
            },
        )
        .await
        .expect("scores");

        let ids = |page: crate::repositories::ProductPage| {
            page.products.into_iter().map(|listing| listing.product.id.0).collect::<Vec<_>>()
        };

        let by_price = repo
            .search(&ProductQuery { sort: ProductSort::PriceAsc, ..ProductQuery::default() })
            .await
            .expect("price");
        assert_eq!(ids(by_price), vec!["c", "a", "b"]);

        let newest = repo
            .search(&ProductQuery { sort: ProductSort::Newest, ..ProductQuery::default() })
            .await
            .expect("newest");
        assert_eq!(ids(newest), vec!["b", "a", "c"]);

        let relevance = repo.search(&ProductQuery::default()).await.expect("relevance");
        assert_eq!(ids(relevance), vec!["c", "b", "a"]);

        let student = repo
            .search(&ProductQuery { usage: Some(UsageKind::Student), ..ProductQuery::default() })
            .await
            .expect("usage");
        assert_eq!(ids(student), vec!["c"]);
    }

    #[tokio::test]
    async fn in_memory_price_range_excludes_unpriced_products() {
        let repo = InMemoryProductRepository::default();
        repo.save(product("a", Some(2_000_000), None)).await.expect("a");
        repo.save(product("b", None, None)).await.expect("b");
        repo.save(product("c", Some(900_000), None)).await.expect("c");

        let budget = Budget::new(500_000, 1_000_000).expect("budget");
        let found = repo.list_in_price_range(Some(budget), 10).await.expect("range");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id.0, "c");
        assert_eq!(repo.list_in_price_range(None, 10).await.expect("all").len(), 2);
    }

    #[tokio::test]
    async fn in_memory_spec_repo_overwrites() {
        let repo = InMemorySpecRepository::default();
        let id = ProductId("a".to_string());
        repo.save(&id, &ParsedSpec::default()).await.expect("first");
        let updated = ParsedSpec { ram_gb: 32, ..ParsedSpec::default() };
        repo.save(&id, &updated).await.expect("second");

        assert_eq!(repo.find(&id).await.expect("find"), Some(updated));
    }

    #[tokio::test]
    async fn in_memory_history_keeps_one_record_per_day() {
        let repo = InMemoryPriceHistoryRepository::default();
        let id = ProductId("a".to_string());
        let now = Utc.with_ymd_and_hms(2026, 10, 17, 9, 0, 0).single().expect("timestamp");

        assert!(repo.append(&id, &PriceRecord::new(1_000_000, now)).await.expect("first"));
        assert!(!repo
            .append(&id, &PriceRecord::new(990_000, now + Duration::hours(3)))
            .await
            .expect("same day"));
        assert!(repo
            .append(&id, &PriceRecord::new(980_000, now - Duration::days(1)))
            .await
            .expect("previous day"));

        let history = repo.list_for_product(&id).await.expect("history");
        assert_eq!(history.iter().map(|record| record.price).collect::<Vec<_>>(), vec![
            980_000, 1_000_000
        ]);
        assert_eq!(repo.list_since(&id, now).await.expect("since").len(), 1);
        assert_eq!(repo.reset_all().await.expect("reset"), 2);
    }

    #[tokio::test]
    async fn in_memory_cache_hides_expired_entries() {
        let cache = InMemoryNarrativeCache::default();
        let now = Utc.with_ymd_and_hms(2026, 10, 17, 9, 0, 0).single().expect("timestamp");
        cache
            .put(CachedNarrative {
                key: "analysis:a".to_string(),
                provider: "template".to_string(),
                body: "{}".to_string(),
                product_id: None,
                expires_at: now + Duration::hours(1),
            })
            .await
            .expect("put");

        assert!(cache.get("analysis:a", now).await.expect("get").is_some());
        assert!(cache.get("analysis:a", now + Duration::hours(1)).await.expect("get").is_none());
        assert_eq!(cache.purge_expired(now + Duration::hours(2)).await.expect("purge"), 1);
        assert!(cache.is_empty().await);
    }
}
