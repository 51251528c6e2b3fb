//! JSON API over the catalog and the analysis engine.
//!
//! - `GET  /api/products`: filtered, sorted, paged listing
//! - `GET  /api/products/{id}`: product detail
//! - `GET  /api/analysis/{id}`: full report plus narrative
//! - `GET  /api/price-trend/{id}?days=`: price chart data and analysis
//! - `GET  /api/game-estimate/{id}`: frame-rate estimates
//! - `GET  /api/should-buy/{id}`: buy-timing verdict
//! - `POST /api/recommend`: ranked recommendations plus narrative
//! - `POST /api/compare`: 2 or 3 product comparison plus narrative

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use lapsight_agent::{NarrativeRequest, Narrator};
use lapsight_core::config::CatalogConfig;
use lapsight_core::domain::{ProductId, RecommendRequest, UsageKind};
use lapsight_core::errors::{ApplicationError, DomainError, InterfaceError};
use lapsight_core::narrative::{
    analysis_key, comparison_key, prompts, recommend_key, NarrativeKind, NarrativeOutcome,
};
use lapsight_core::recommend::{rank_recommendations, Recommendation};
use lapsight_core::report::{Comparison, ProductReport};
use lapsight_core::verdict::ShouldBuy;
use lapsight_db::{
    Catalog, GameEstimateView, PriceTrendView, ProductDetail, ProductPage, ProductQuery,
    ProductSort,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

/// How many top recommendations the narrative explains.
const NARRATED_RECOMMENDATIONS: usize = 3;
const MAX_TREND_DAYS: u32 = 365;

#[derive(Clone)]
pub struct ApiState {
    catalog: Catalog,
    narrator: Narrator,
    settings: CatalogConfig,
}

impl ApiState {
    pub fn new(catalog: Catalog, narrator: Narrator, settings: CatalogConfig) -> Self {
        Self { catalog, narrator, settings }
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.narrator.provider_names()
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/products", get(list_products))
        .route("/api/products/{id}", get(product_detail))
        .route("/api/analysis/{id}", get(analysis))
        .route("/api/price-trend/{id}", get(price_trend))
        .route("/api/game-estimate/{id}", get(game_estimate))
        .route("/api/should-buy/{id}", get(should_buy))
        .route("/api/recommend", post(recommend))
        .route("/api/compare", post(compare))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub correlation_id: String,
}

/// Failure response: the interface error decides status and user-safe text.
#[derive(Debug)]
pub struct ApiError(pub InterfaceError);

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0 {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ApplicationError> for ApiError {
    fn from(error: ApplicationError) -> Self {
        let correlation_id = Uuid::new_v4().to_string();
        warn!(
            event_name = "api.request.failed",
            correlation_id = %correlation_id,
            error = %error,
            "api request failed"
        );
        Self(error.into_interface(correlation_id))
    }
}

impl From<DomainError> for ApiError {
    fn from(error: DomainError) -> Self {
        Self::from(ApplicationError::from(error))
    }
}

/// Body decoding failures, unknown enum values included, are input errors.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::from(DomainError::InvalidQuery(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut error = self.0.user_message().to_string();
        // Input errors carry their own detail so callers can fix the request.
        if let InterfaceError::BadRequest { message, .. } = &self.0 {
            error = format!("{error} ({message})");
        }
        let body = ErrorBody { error, correlation_id: self.0.correlation_id().to_string() };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

/// Raw listing query string. Enum-valued fields are parsed by hand so an
/// unknown value becomes a JSON 400 rather than an extractor rejection.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub q: Option<String>,
    pub brand: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub usage: Option<String>,
    pub sort: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ListParams {
    pub fn into_query(self) -> Result<ProductQuery, DomainError> {
        let usage = self
            .usage
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::parse::<UsageKind>)
            .transpose()?;
        let sort = self.sort.as_deref().map(str::parse::<ProductSort>).transpose()?;

        if let (Some(min), Some(max)) = (self.min_price, self.max_price) {
            if min > max {
                return Err(DomainError::InvalidQuery(
                    "min_price must not exceed max_price".to_string(),
                ));
            }
        }

        let defaults = ProductQuery::default();
        Ok(ProductQuery {
            q: self.q,
            brand: self.brand,
            min_price: self.min_price,
            max_price: self.max_price,
            usage,
            sort: sort.unwrap_or_default(),
            page: self.page.unwrap_or(defaults.page),
            limit: self.limit.unwrap_or(defaults.limit),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TrendParams {
    pub days: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    #[serde(flatten)]
    pub report: ProductReport,
    pub narrative: NarrativeOutcome,
}

#[derive(Debug, Serialize)]
pub struct RecommendResponse {
    pub recommendations: Vec<Recommendation>,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub narrative: Option<NarrativeOutcome>,
}

#[derive(Debug, Deserialize)]
pub struct CompareRequest {
    pub ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CompareResponse {
    #[serde(flatten)]
    pub comparison: Comparison,
    pub narrative: NarrativeOutcome,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub async fn list_products(
    State(state): State<ApiState>,
    Query(params): Query<ListParams>,
) -> ApiResult<ProductPage> {
    let query = params.into_query()?;
    Ok(Json(state.catalog.browse(&query).await?))
}

pub async fn product_detail(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<ProductDetail> {
    Ok(Json(state.catalog.detail(&ProductId(id), Utc::now()).await?))
}

pub async fn analysis(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<AnalysisResponse> {
    let id = ProductId(id);
    let report = state.catalog.report(&id, Utc::now()).await?;

    let prompt = prompts::analysis_prompt(&report);
    let key = analysis_key(&id);
    let narrative = state
        .narrator
        .generate(NarrativeRequest {
            prompt: &prompt,
            key: &key,
            kind: NarrativeKind::Analysis,
            product_id: Some(&id),
        })
        .await;

    info!(
        event_name = "api.analysis.served",
        product_id = %id,
        provider = narrative.provider.as_str(),
        cached = narrative.cached,
        "analysis served"
    );
    Ok(Json(AnalysisResponse { report, narrative }))
}

pub async fn price_trend(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Query(params): Query<TrendParams>,
) -> ApiResult<PriceTrendView> {
    let days = params.days.unwrap_or(state.settings.price_trend_days);
    if days == 0 || days > MAX_TREND_DAYS {
        return Err(DomainError::InvalidQuery(format!(
            "days must be in 1..={MAX_TREND_DAYS}, got {days}"
        ))
        .into());
    }
    Ok(Json(state.catalog.price_trend(&ProductId(id), days, Utc::now()).await?))
}

pub async fn game_estimate(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<GameEstimateView> {
    Ok(Json(state.catalog.game_estimates(&ProductId(id)).await?))
}

pub async fn should_buy(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<ShouldBuy> {
    Ok(Json(state.catalog.should_buy(&ProductId(id), Utc::now()).await?))
}

pub async fn recommend(
    State(state): State<ApiState>,
    payload: Result<Json<RecommendRequest>, JsonRejection>,
) -> ApiResult<RecommendResponse> {
    let Json(request) = payload?;
    request.validate()?;

    let limit = state.settings.recommend_limit;
    let pool = state.settings.candidate_pool.max(limit);
    let candidates = state.catalog.candidates(request.budget, pool, Utc::now()).await?;
    let recommendations = rank_recommendations(candidates, &request, limit);

    if recommendations.is_empty() {
        return Ok(Json(RecommendResponse {
            recommendations,
            total: 0,
            message: Some("No laptops match the requested conditions.".to_string()),
            narrative: None,
        }));
    }

    let top = &recommendations[..recommendations.len().min(NARRATED_RECOMMENDATIONS)];
    let prompt = prompts::recommend_prompt(&request, top);
    let key = recommend_key(&request);
    let narrative = state
        .narrator
        .generate(NarrativeRequest {
            prompt: &prompt,
            key: &key,
            kind: NarrativeKind::Recommend,
            product_id: None,
        })
        .await;

    info!(
        event_name = "api.recommend.served",
        total = recommendations.len(),
        provider = narrative.provider.as_str(),
        "recommendations served"
    );
    Ok(Json(RecommendResponse {
        total: recommendations.len(),
        recommendations,
        message: None,
        narrative: Some(narrative),
    }))
}

pub async fn compare(
    State(state): State<ApiState>,
    payload: Result<Json<CompareRequest>, JsonRejection>,
) -> ApiResult<CompareResponse> {
    let Json(body) = payload?;
    if !(2..=3).contains(&body.ids.len()) {
        return Err(DomainError::InvalidQuery(format!(
            "compare needs 2 or 3 product ids, got {}",
            body.ids.len()
        ))
        .into());
    }

    let ids = body.ids.into_iter().map(ProductId).collect::<Vec<_>>();
    let reports = state.catalog.reports(&ids, Utc::now()).await?;
    if reports.len() < 2 {
        return Err(ApplicationError::NotFound(format!(
            "only {} of the requested products were found",
            reports.len()
        ))
        .into());
    }

    let found = reports.iter().map(|report| report.product.id.clone()).collect::<Vec<_>>();
    let prompt = prompts::comparison_prompt(&reports);
    let key = comparison_key(&found);
    let comparison = Comparison::build(reports)?;
    let narrative = state
        .narrator
        .generate(NarrativeRequest {
            prompt: &prompt,
            key: &key,
            kind: NarrativeKind::Comparison,
            product_id: None,
        })
        .await;

    Ok(Json(CompareResponse { comparison, narrative }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        extract::{Path, Query, State},
        http::{Request, StatusCode},
        response::IntoResponse,
        Json,
    };
    use chrono::Utc;
    use lapsight_agent::Narrator;
    use lapsight_core::config::AppConfig;
    use lapsight_core::domain::{Budget, ProductId, RecommendRequest, UsageKind};
    use lapsight_core::narrative::{comparison_key, NarrativeCache, TEMPLATE_PROVIDER};
    use lapsight_db::{
        connect_with_settings, migrations, Catalog, DbPool, DemoCatalog, SqlNarrativeCache,
    };
    use tower::ServiceExt;

    use super::{
        analysis, compare, game_estimate, list_products, price_trend, product_detail, recommend,
        router, should_buy, ApiError, ApiState, CompareRequest, ListParams, TrendParams,
    };

    async fn seeded_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        DemoCatalog::load(&pool, Utc::now()).await.expect("seed");
        pool
    }

    fn state(pool: DbPool) -> ApiState {
        let narrator = Narrator::new(Vec::new(), Arc::new(SqlNarrativeCache::new(pool.clone())));
        ApiState::new(Catalog::sqlite(pool), narrator, AppConfig::default().catalog)
    }

    fn status_of(error: ApiError) -> StatusCode {
        error.into_response().status()
    }

    #[tokio::test]
    async fn list_products_applies_filters_and_sort() {
        let state = state(seeded_pool().await);

        let Json(page) = list_products(
            State(state.clone()),
            Query(ListParams {
                sort: Some("price_asc".to_string()),
                limit: Some(3),
                ..ListParams::default()
            }),
        )
        .await
        .expect("listing");
        assert_eq!(page.total, 8);
        assert_eq!(page.products.len(), 3);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.products[0].product.id.0, "lap-ideapad-slim-3");

        let Json(gaming) = list_products(
            State(state),
            Query(ListParams { usage: Some("gaming".to_string()), ..ListParams::default() }),
        )
        .await
        .expect("gaming listing");
        assert!(gaming
            .products
            .iter()
            .all(|listing| listing.scores.map(|scores| scores.gaming >= 60).unwrap_or(false)));
    }

    #[tokio::test]
    async fn list_products_rejects_unknown_enum_values() {
        let state = state(seeded_pool().await);

        for params in [
            ListParams { usage: Some("mining".to_string()), ..ListParams::default() },
            ListParams { sort: Some("cheapest".to_string()), ..ListParams::default() },
            ListParams { min_price: Some(10), max_price: Some(5), ..ListParams::default() },
        ] {
            let error = list_products(State(state.clone()), Query(params))
                .await
                .expect_err("should be rejected");
            assert_eq!(status_of(error), StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn product_routes_return_not_found_for_unknown_ids() {
        let state = state(seeded_pool().await);
        let missing = || Path("lap-missing".to_string());

        let error = product_detail(State(state.clone()), missing()).await.expect_err("detail");
        assert_eq!(status_of(error), StatusCode::NOT_FOUND);
        let error = analysis(State(state.clone()), missing()).await.expect_err("analysis");
        assert_eq!(status_of(error), StatusCode::NOT_FOUND);
        let error = game_estimate(State(state.clone()), missing()).await.expect_err("games");
        assert_eq!(status_of(error), StatusCode::NOT_FOUND);
        let error = should_buy(State(state), missing()).await.expect_err("should buy");
        assert_eq!(status_of(error), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn analysis_falls_back_to_template_and_caches_it() {
        let state = state(seeded_pool().await);

        let Json(first) = analysis(State(state.clone()), Path("lap-legion-5".to_string()))
            .await
            .expect("analysis");
        assert_eq!(first.report.product.id.0, "lap-legion-5");
        assert_eq!(first.narrative.provider, TEMPLATE_PROVIDER);
        assert!(!first.narrative.cached);

        let Json(second) = analysis(State(state), Path("lap-legion-5".to_string()))
            .await
            .expect("analysis again");
        assert!(second.narrative.cached);
        assert_eq!(second.narrative.body, first.narrative.body);
    }

    #[tokio::test]
    async fn price_trend_honours_the_window_and_validates_days() {
        let state = state(seeded_pool().await);

        let Json(trend) = price_trend(
            State(state.clone()),
            Path("lap-victus-15".to_string()),
            Query(TrendParams { days: Some(7) }),
        )
        .await
        .expect("trend");
        assert_eq!(trend.days, 7);
        assert!(!trend.history.is_empty() && trend.history.len() <= 8);

        let error = price_trend(
            State(state),
            Path("lap-victus-15".to_string()),
            Query(TrendParams { days: Some(0) }),
        )
        .await
        .expect_err("zero days");
        assert_eq!(status_of(error), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn recommend_returns_ranked_list_with_narrative() {
        let state = state(seeded_pool().await);

        let request = RecommendRequest {
            budget: Some(Budget::new(0, 3_000_000).expect("budget")),
            usage: vec![UsageKind::Gaming],
            priority: None,
        };
        let Json(response) = recommend(State(state), Ok(Json(request))).await.expect("recommend");
        assert_eq!(response.total, 5);
        assert_eq!(response.recommendations.len(), 5);
        assert!(response.narrative.is_some());
        assert!(response.message.is_none());
    }

    #[tokio::test]
    async fn recommend_with_no_candidates_returns_a_message() {
        let state = state(seeded_pool().await);

        let request = RecommendRequest {
            budget: Some(Budget::new(0, 10_000).expect("budget")),
            ..RecommendRequest::default()
        };
        let Json(response) = recommend(State(state), Ok(Json(request))).await.expect("recommend");
        assert_eq!(response.total, 0);
        assert!(response.recommendations.is_empty());
        assert!(response.narrative.is_none());
        assert!(response.message.is_some());
    }

    #[tokio::test]
    async fn recommend_rejects_inverted_budget() {
        let state = state(seeded_pool().await);
        let request = RecommendRequest {
            budget: Some(Budget { min: 2_000_000, max: 1_000_000 }),
            ..RecommendRequest::default()
        };
        let error = recommend(State(state), Ok(Json(request))).await.expect_err("inverted budget");
        assert_eq!(status_of(error), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn compare_validates_the_id_set() {
        let state = state(seeded_pool().await);

        let error = compare(
            State(state.clone()),
            Ok(Json(CompareRequest { ids: vec!["lap-legion-5".to_string()] })),
        )
        .await
        .expect_err("single id");
        assert_eq!(status_of(error), StatusCode::BAD_REQUEST);

        let error = compare(
            State(state.clone()),
            Ok(Json(CompareRequest {
                ids: vec!["lap-legion-5".to_string(), "lap-missing".to_string()],
            })),
        )
        .await
        .expect_err("one found");
        assert_eq!(status_of(error), StatusCode::NOT_FOUND);

        let Json(response) = compare(
            State(state),
            Ok(Json(CompareRequest {
                ids: vec!["lap-rog-strix-g16".to_string(), "lap-macbook-air-m4".to_string()],
            })),
        )
        .await
        .expect("comparison");
        assert_eq!(response.comparison.reports.len(), 2);
        assert_eq!(response.comparison.winners.gaming, "lap-rog-strix-g16");
        assert_eq!(response.narrative.provider, TEMPLATE_PROVIDER);
    }

    #[tokio::test]
    async fn router_serves_json_errors_with_correlation_ids() {
        let app = router(state(seeded_pool().await));

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/products/lap-missing")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes =
            axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body bytes");
        let body: serde_json::Value = serde_json::from_slice(&bytes).expect("json body");
        assert!(body["correlation_id"].as_str().map(|id| !id.is_empty()).unwrap_or(false));
        assert_eq!(body["error"], "The requested product could not be found.");

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/game-estimate/lap-legion-5")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    async fn post_json(
        app: axum::Router,
        uri: &str,
        body: &str,
    ) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .expect("request"),
            )
            .await
            .expect("response");
        let status = response.status();
        let bytes =
            axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body bytes");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn unknown_body_enum_values_are_json_bad_requests() {
        let app = router(state(seeded_pool().await));

        for (uri, body) in [
            ("/api/recommend", r#"{"usage":["mining"]}"#),
            ("/api/recommend", r#"{"priority":"cheapest"}"#),
            ("/api/recommend", r#"{"budget":"#),
            ("/api/compare", r#"{"ids":"lap-legion-5"}"#),
        ] {
            let (status, body) = post_json(app.clone(), uri, body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}: {body}");
            assert!(body["correlation_id"].as_str().map(|id| !id.is_empty()).unwrap_or(false));
            assert!(body["error"].as_str().unwrap_or_default().starts_with("The request"));
        }
    }

    #[tokio::test]
    async fn compare_caches_the_narrative_under_the_products_found() {
        let pool = seeded_pool().await;
        let state = state(pool.clone());
        let requested = ["lap-legion-5", "lap-gram-14", "lap-missing"];

        let Json(response) = compare(
            State(state),
            Ok(Json(CompareRequest { ids: requested.iter().map(|id| id.to_string()).collect() })),
        )
        .await
        .expect("comparison");
        assert_eq!(response.comparison.reports.len(), 2);

        let cache = SqlNarrativeCache::new(pool);
        let ids =
            |ids: &[&str]| ids.iter().map(|id| ProductId(id.to_string())).collect::<Vec<_>>();
        let found_key = comparison_key(&ids(&requested[..2]));
        let requested_key = comparison_key(&ids(&requested));

        assert!(cache.get(&found_key, Utc::now()).await.expect("cache read").is_some());
        assert!(cache.get(&requested_key, Utc::now()).await.expect("cache read").is_none());
    }
}
