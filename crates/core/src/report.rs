//! Full per-product analysis and side-by-side comparison.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{ParsedSpec, PriceRecord, Product};
use crate::errors::DomainError;
use crate::games::{estimate_game_fps, sort_for_display, GameEstimate};
use crate::pricing::{analyze_prices, PriceAnalysis};
use crate::recommend::current_price;
use crate::scoring::{
    analyze_display_suitability, analyze_port_suitability, analyze_tech_features,
    calculate_usage_scores, calculate_work_suitability, DisplaySuitability, PortSuitability,
    TechFeatures, UsageScores, WorkSuitability,
};
use crate::verdict::{evaluate_should_buy, ShouldBuy};

pub const MIN_COMPARE: usize = 2;
pub const MAX_COMPARE: usize = 3;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductReport {
    pub product: Product,
    pub spec: ParsedSpec,
    pub price: PriceAnalysis,
    pub scores: UsageScores,
    pub work: WorkSuitability,
    pub display: DisplaySuitability,
    pub ports: PortSuitability,
    pub tech: TechFeatures,
    pub games: Vec<GameEstimate>,
    pub should_buy: ShouldBuy,
    pub months_since_release: Option<i64>,
}

impl ProductReport {
    pub fn build(
        product: Product,
        spec: ParsedSpec,
        history: &[PriceRecord],
        now: DateTime<Utc>,
    ) -> Self {
        let current = current_price(&product, history);
        let price = analyze_prices(history, current, now);
        let scores = calculate_usage_scores(&spec, Some(current).filter(|price| *price > 0));
        let months_since_release = product.months_since_release(now);
        let should_buy = evaluate_should_buy(&price, months_since_release);

        Self {
            work: calculate_work_suitability(&spec),
            display: analyze_display_suitability(&spec),
            ports: analyze_port_suitability(&spec),
            tech: analyze_tech_features(&spec),
            games: estimate_game_fps(spec.gpu_tier, spec.effective_refresh_rate()),
            product,
            spec,
            price,
            scores,
            should_buy,
            months_since_release,
        }
    }

    /// Game estimates best-first, for display.
    pub fn games_by_playability(&self) -> Vec<GameEstimate> {
        let mut games = self.games.clone();
        sort_for_display(&mut games);
        games
    }
}

/// Product ids of the best pick per use case.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Winners {
    pub gaming: String,
    pub work: String,
    pub student: String,
    pub portable: String,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub reports: Vec<ProductReport>,
    pub winners: Winners,
}

impl Comparison {
    pub fn build(reports: Vec<ProductReport>) -> Result<Self, DomainError> {
        if !(MIN_COMPARE..=MAX_COMPARE).contains(&reports.len()) {
            return Err(DomainError::InvalidQuery(format!(
                "comparison needs {MIN_COMPARE} to {MAX_COMPARE} products, got {}",
                reports.len()
            )));
        }

        let by_score = |score: fn(&ProductReport) -> f64| winner(&reports, score);
        let winners = Winners {
            gaming: by_score(|report| f64::from(report.scores.gaming)),
            work: by_score(|report| f64::from(report.scores.work)),
            student: by_score(|report| f64::from(report.scores.student)),
            portable: by_score(|report| f64::from(report.scores.portable)),
            value: by_score(|report| report.price.value_score),
        };

        Ok(Self { reports, winners })
    }
}

/// Highest score wins; ties go to the earlier report.
fn winner(reports: &[ProductReport], score: fn(&ProductReport) -> f64) -> String {
    let mut best: Option<(&ProductReport, f64)> = None;
    for report in reports {
        let value = score(report);
        if best.map_or(true, |(_, top)| value > top) {
            best = Some((report, value));
        }
    }
    best.map(|(report, _)| report.product.id.to_string()).unwrap_or_default()
}
