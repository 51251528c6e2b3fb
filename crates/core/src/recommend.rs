//! Ranks budget-filtered candidates against a buyer's usage and priority.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    latest_price, ParsedSpec, PriceRecord, Priority, Product, RecommendRequest, UsageKind,
};
use crate::pricing::{analyze_prices, PriceAnalysis};
use crate::scoring::{calculate_usage_scores, UsageScores};
use crate::verdict::{evaluate_should_buy, OLD_MODEL_MONTHS};

pub const DEFAULT_LIMIT: usize = 5;
pub const MAX_REASONS: usize = 3;

/// One product with everything the ranker needs precomputed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub product: Product,
    pub spec: ParsedSpec,
    pub price: PriceAnalysis,
    pub scores: UsageScores,
    pub months_since_release: Option<i64>,
}

impl Candidate {
    /// Builds a candidate from stored data. The current price falls back to the
    /// latest history entry, then to zero.
    pub fn assemble(
        product: Product,
        spec: ParsedSpec,
        history: &[PriceRecord],
        now: DateTime<Utc>,
    ) -> Self {
        let current = current_price(&product, history);
        let price = analyze_prices(history, current, now);
        let scores = calculate_usage_scores(&spec, Some(current).filter(|price| *price > 0));
        let months_since_release = product.months_since_release(now);
        Self { product, spec, price, scores, months_since_release }
    }
}

/// Listed lowest price, else the latest recorded price, else 0.
pub fn current_price(product: &Product, history: &[PriceRecord]) -> i64 {
    product.current_lowest.or_else(|| latest_price(history)).unwrap_or(0)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub product: Product,
    pub spec: ParsedSpec,
    pub match_score: f64,
    pub scores: UsageScores,
    pub reasons: Vec<String>,
    pub warnings: Vec<String>,
    pub should_buy: bool,
    pub should_buy_reason: String,
    pub current_lowest: i64,
}

/// Mean of the requested usage scores plus the priority bonus, capped at 100.
/// With no usage requested the overall score is used as is.
pub fn match_score(scores: &UsageScores, request: &RecommendRequest) -> f64 {
    if request.usage.is_empty() {
        return f64::from(scores.overall);
    }

    let total: f64 = request.usage.iter().map(|usage| f64::from(scores.for_usage(*usage))).sum();
    let base = total / request.usage.len() as f64;

    let bonus = match request.priority {
        Some(Priority::Performance) if scores.gaming.max(scores.work) > 80 => 10.0,
        Some(Priority::Portable) if scores.portable > 75 => 10.0,
        Some(Priority::Value) => 5.0,
        Some(Priority::Latest) => 3.0,
        _ => 0.0,
    };

    (base + bonus).min(100.0)
}

fn reasons(candidate: &Candidate, request: &RecommendRequest) -> Vec<String> {
    let wants = |usage: UsageKind| request.usage.contains(&usage);
    let scores = &candidate.scores;
    let mut reasons = Vec::new();

    if wants(UsageKind::Gaming) && scores.gaming >= 70 {
        reasons.push(format!("Strong gaming performance with a score of {}", scores.gaming));
    }
    if wants(UsageKind::Work) && scores.work >= 70 {
        reasons.push(format!("Well suited to work and coding with a score of {}", scores.work));
    }
    if wants(UsageKind::Portable) && scores.portable >= 75 {
        reasons.push(format!(
            "Light with long battery life, portability score {}",
            scores.portable
        ));
    }
    if candidate.price.price_drop_detected {
        reasons.push("The current price is below the recent average".to_string());
    }

    reasons.truncate(MAX_REASONS);
    reasons
}

fn warnings(candidate: &Candidate) -> Vec<String> {
    let mut warnings = Vec::new();
    if candidate.months_since_release.is_some_and(|months| months > OLD_MODEL_MONTHS) {
        warnings.push("Released more than two years ago".to_string());
    }
    if candidate.scores.gaming < 30 {
        warnings.push("Low gaming performance".to_string());
    }
    if candidate.scores.video < 30 {
        warnings.push("Not suited to video editing".to_string());
    }
    warnings
}

/// Candidates are expected to be budget-filtered already. Sorting is stable, so
/// equal match scores keep their input order.
pub fn rank_recommendations(
    candidates: Vec<Candidate>,
    request: &RecommendRequest,
    limit: usize,
) -> Vec<Recommendation> {
    let mut scored: Vec<(f64, Candidate)> = candidates
        .into_iter()
        .map(|candidate| (match_score(&candidate.scores, request), candidate))
        .collect();
    scored.sort_by(|(left, _), (right, _)| right.total_cmp(left));

    scored
        .into_iter()
        .take(limit)
        .map(|(match_score, candidate)| {
            let reasons = reasons(&candidate, request);
            let warnings = warnings(&candidate);
            let verdict = evaluate_should_buy(&candidate.price, candidate.months_since_release);
            Recommendation {
                current_lowest: candidate.price.current_lowest,
                product: candidate.product,
                spec: candidate.spec,
                match_score,
                scores: candidate.scores,
                reasons,
                warnings,
                should_buy: verdict.should_buy,
                should_buy_reason: verdict.reason,
            }
        })
        .collect()
}
