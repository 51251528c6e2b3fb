use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use lapsight_db::{migrations, DbPool};
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
    providers: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Readiness {
    Ready,
    Degraded,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ComponentCheck {
    pub component: &'static str,
    pub status: Readiness,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: Readiness,
    pub checks: Vec<ComponentCheck>,
    pub checked_at: String,
}

impl HealthResponse {
    #[cfg(test)]
    fn check(&self, component: &str) -> Option<&ComponentCheck> {
        self.checks.iter().find(|check| check.component == component)
    }
}

pub fn router(db_pool: DbPool, providers: Vec<String>) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { db_pool, providers })
}

/// Catalog readiness. Narrative providers are informational: without them the
/// API still answers with template narratives.
pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let checks = vec![
        catalog_check(&state.db_pool).await,
        schema_check(&state.db_pool).await,
        narrative_check(&state.providers),
    ];
    let ready = checks.iter().all(|check| check.status == Readiness::Ready);

    let payload = HealthResponse {
        status: if ready { Readiness::Ready } else { Readiness::Degraded },
        checks,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn catalog_check(pool: &DbPool) -> ComponentCheck {
    let (status, detail) =
        match sqlx::query_scalar::<_, i64>("SELECT COUNT(1) FROM product").fetch_one(pool).await {
            Ok(products) => (Readiness::Ready, format!("{products} product(s) in catalog")),
            Err(error) => (Readiness::Degraded, format!("catalog query failed: {error}")),
        };
    ComponentCheck { component: "catalog", status, detail }
}

async fn schema_check(pool: &DbPool) -> ComponentCheck {
    let (status, detail) = match migrations::pending_count(pool).await {
        Ok(0) => (Readiness::Ready, "all migrations applied".to_string()),
        Ok(pending) => (Readiness::Degraded, format!("{pending} pending migration(s)")),
        Err(error) => (Readiness::Degraded, format!("migration state unavailable: {error}")),
    };
    ComponentCheck { component: "schema", status, detail }
}

fn narrative_check(providers: &[String]) -> ComponentCheck {
    let detail = if providers.is_empty() {
        "no llm providers configured; template narratives only".to_string()
    } else {
        format!("providers: {}", providers.join(" -> "))
    };
    ComponentCheck { component: "narrative", status: Readiness::Ready, detail }
}
