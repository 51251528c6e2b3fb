//! Explainable buy-now-or-wait scoring.
//!
//! Every adjustment to the baseline is recorded as a [`BuyFactor`] so callers
//! can show the user exactly why a verdict was reached.

use serde::{Deserialize, Serialize};

use crate::pricing::{PriceAnalysis, PriceTrend};

pub const BASELINE_SCORE: i32 = 50;
pub const BUY_THRESHOLD: u8 = 55;

/// Models younger than this many months get the new-model bonus.
pub const NEW_MODEL_MONTHS: i64 = 6;
/// Models older than this many months get the successor-risk penalty.
pub const OLD_MODEL_MONTHS: i64 = 24;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    StrongBuy,
    Buy,
    Hold,
    Avoid,
}

impl Verdict {
    pub fn from_score(score: u8) -> Self {
        match score {
            75.. => Self::StrongBuy,
            55..=74 => Self::Buy,
            40..=54 => Self::Hold,
            _ => Self::Avoid,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::StrongBuy => "Strongly recommended",
            Self::Buy => "Good to buy",
            Self::Hold => "Consider waiting",
            Self::Avoid => "Not recommended",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyFactor {
    pub factor: String,
    pub positive: bool,
    pub weight: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShouldBuy {
    pub should_buy: bool,
    pub score: u8,
    pub verdict: Verdict,
    pub reason: String,
    pub factors: Vec<BuyFactor>,
    pub months_since_release: Option<i64>,
}

struct Tally {
    score: i32,
    factors: Vec<BuyFactor>,
}

impl Tally {
    fn add(&mut self, factor: impl Into<String>, positive: bool, weight: u8) {
        let delta = i32::from(weight);
        self.score += if positive { delta } else { -delta };
        self.factors.push(BuyFactor { factor: factor.into(), positive, weight });
    }
}

pub fn evaluate_should_buy(price: &PriceAnalysis, months_since_release: Option<i64>) -> ShouldBuy {
    let mut tally = Tally { score: BASELINE_SCORE, factors: Vec::new() };
    let current = price.current_lowest as f64;

    if let Some(avg) = price.avg_30d.filter(|avg| *avg > 0.0) {
        if current < avg * 0.9 {
            let percent = (avg - current) * 100.0 / avg;
            tally.add(
                format!("Current price is {percent:.0}% below the 30-day average"),
                true,
                25,
            );
        } else if current > avg * 1.05 {
            tally.add("Current price is above the recent average", false, 15);
        }
    }

    match price.price_trend {
        Some(PriceTrend::Falling) => tally.add("Prices are still trending down", false, 10),
        Some(PriceTrend::Rising) => {
            tally.add("Prices are trending up, so deciding soon helps", true, 10)
        }
        _ => {}
    }

    if price.price_drop_detected {
        tally.add("A sharp price drop was detected", true, 15);
    }

    match months_since_release {
        Some(months) if months < NEW_MODEL_MONTHS => {
            tally.add("New model (released within 6 months)", true, 15)
        }
        Some(months) if months > OLD_MODEL_MONTHS => {
            tally.add(format!("Released {months} months ago, an older model"), false, 20)
        }
        _ => {}
    }

    let score = tally.score.clamp(0, 100) as u8;
    let should_buy = score >= BUY_THRESHOLD;
    let old_months = months_since_release.filter(|months| *months > OLD_MODEL_MONTHS);
    let reason = explain(&tally.factors, should_buy, old_months);

    ShouldBuy {
        should_buy,
        score,
        verdict: Verdict::from_score(score),
        reason,
        factors: tally.factors,
        months_since_release,
    }
}

fn explain(factors: &[BuyFactor], should_buy: bool, old_months: Option<i64>) -> String {
    if !should_buy {
        return match old_months {
            Some(months) => format!(
                "This model was released {months} months ago. A successor is likely soon, so \
                 check the latest models first."
            ),
            None => "Holding off for now is recommended. The price may drop further.".to_string(),
        };
    }

    // max_by_key keeps the last maximum, so walk in reverse to keep the first.
    factors
        .iter()
        .rev()
        .filter(|factor| factor.positive)
        .max_by_key(|factor| factor.weight)
        .map(|factor| format!("{}. Now is a good time to buy.", factor.factor))
        .unwrap_or_else(|| {
            "Considering price and release date, this is worth buying.".to_string()
        })
}
