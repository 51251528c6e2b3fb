//! Trailing-window price statistics, trend, value and anomaly detection.
//!
//! The analysis is a computed view over the raw history and the current lowest
//! price; it is never persisted, so recomputing with the same `now` always
//! yields the same result.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::PriceRecord;

/// Relative 7-day vs 30-day movement (percent) beyond which a trend is reported.
pub const TREND_THRESHOLD_PERCENT: f64 = 3.0;

/// Current price below this fraction of the 7-day average counts as a drop.
pub const DROP_RATIO: f64 = 0.9;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceTrend {
    Rising,
    Falling,
    Stable,
}

/// Where the current price sits relative to its own recent history.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceTier {
    Cheap,
    Average,
    Expensive,
}

impl PriceTier {
    pub fn from_value_score(score: f64) -> Self {
        if score >= 70.0 {
            Self::Cheap
        } else if score >= 40.0 {
            Self::Average
        } else {
            Self::Expensive
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyLevel {
    None,
    Caution,
    Danger,
}

/// Drop percentages at which a listing is flagged as suspicious. Both bounds
/// are inclusive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnomalyThresholds {
    pub caution: f64,
    pub danger: f64,
}

impl Default for AnomalyThresholds {
    fn default() -> Self {
        Self { caution: 10.0, danger: 20.0 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceAnalysis {
    pub current_lowest: i64,
    pub avg_7d: Option<f64>,
    pub avg_30d: Option<f64>,
    pub avg_90d: Option<f64>,
    pub all_time_min: Option<i64>,
    pub all_time_max: Option<i64>,
    pub all_time_avg: Option<f64>,
    pub price_drop_detected: bool,
    pub drop_percent: Option<f64>,
    pub price_trend: Option<PriceTrend>,
    pub vs_avg_30d_percent: Option<f64>,
    pub value_score: f64,
    pub price_tier: PriceTier,
    pub anomaly_level: AnomalyLevel,
    pub anomaly_warning: Option<String>,
    pub summary: String,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PriceAnalyzer {
    thresholds: AnomalyThresholds,
}

impl PriceAnalyzer {
    pub fn new(thresholds: AnomalyThresholds) -> Self {
        Self { thresholds }
    }

    pub fn analyze(
        &self,
        history: &[PriceRecord],
        current_lowest: i64,
        now: DateTime<Utc>,
    ) -> PriceAnalysis {
        let window_avg = |days: i64| {
            let since = now - Duration::days(days);
            mean(history.iter().filter(|record| record.recorded_at >= since).map(|r| r.price))
        };
        let avg_7d = window_avg(7);
        let avg_30d = window_avg(30);
        let avg_90d = window_avg(90);
        let all_time_avg = mean(history.iter().map(|record| record.price));
        let all_time_min = history.iter().map(|record| record.price).min();
        let all_time_max = history.iter().map(|record| record.price).max();

        let current = current_lowest as f64;
        let avg_7d_positive = avg_7d.filter(|avg| *avg > 0.0);
        let avg_30d_positive = avg_30d.filter(|avg| *avg > 0.0);

        let price_drop_detected = avg_7d.is_some_and(|avg| current < avg * DROP_RATIO);
        let drop_percent = avg_7d_positive.map(|avg| (avg - current) * 100.0 / avg);

        let price_trend = match (avg_7d_positive, avg_30d_positive) {
            (Some(short), Some(long)) => {
                let diff = (short - long) * 100.0 / long;
                Some(if diff > TREND_THRESHOLD_PERCENT {
                    PriceTrend::Rising
                } else if diff < -TREND_THRESHOLD_PERCENT {
                    PriceTrend::Falling
                } else {
                    PriceTrend::Stable
                })
            }
            _ => None,
        };

        let vs_avg_30d_percent = avg_30d_positive.map(|avg| (avg - current) * 100.0 / avg);
        let value_score = value_score(current, avg_30d_positive);

        let reference = avg_30d.or(avg_7d).or(all_time_avg).filter(|price| *price > 0.0);
        let (anomaly_level, anomaly_warning) = self.detect_anomaly(reference, drop_percent);

        let summary = summarize(
            current_lowest,
            price_drop_detected,
            drop_percent,
            all_time_min,
            vs_avg_30d_percent,
            price_trend,
        );

        PriceAnalysis {
            current_lowest,
            avg_7d,
            avg_30d,
            avg_90d,
            all_time_min,
            all_time_max,
            all_time_avg,
            price_drop_detected,
            drop_percent,
            price_trend,
            vs_avg_30d_percent,
            value_score,
            price_tier: PriceTier::from_value_score(value_score),
            anomaly_level,
            anomaly_warning,
            summary,
        }
    }

    fn detect_anomaly(
        &self,
        reference: Option<f64>,
        drop_percent: Option<f64>,
    ) -> (AnomalyLevel, Option<String>) {
        let (Some(_), Some(drop)) = (reference, drop_percent.filter(|drop| *drop != 0.0)) else {
            return (AnomalyLevel::None, None);
        };
        let rounded = drop.round();

        if drop >= self.thresholds.danger {
            (
                AnomalyLevel::Danger,
                Some(format!(
                    "The price fell {rounded}% below its average. This may be a promotion, but a \
                     parallel import or an entirely different product may have been linked to \
                     this listing. Check the listing carefully before buying."
                )),
            )
        } else if drop >= self.thresholds.caution {
            (
                AnomalyLevel::Caution,
                Some(format!(
                    "The price fell {rounded}% below its average. It may be a sale, but \
                     mismatched listings do happen, so verify the seller and product details."
                )),
            )
        } else {
            (AnomalyLevel::None, None)
        }
    }
}

/// Analysis with the default anomaly thresholds.
pub fn analyze_prices(
    history: &[PriceRecord],
    current_lowest: i64,
    now: DateTime<Utc>,
) -> PriceAnalysis {
    PriceAnalyzer::default().analyze(history, current_lowest, now)
}

fn mean(prices: impl Iterator<Item = i64>) -> Option<f64> {
    let (sum, count) = prices.fold((0_f64, 0_u32), |(sum, count), price| {
        (sum + price as f64, count + 1)
    });
    (count > 0).then(|| sum / f64::from(count))
}

/// Piecewise, continuous and non-increasing in `current / avg_30d`.
fn value_score(current: f64, avg_30d: Option<f64>) -> f64 {
    let Some(avg) = avg_30d else {
        return 50.0;
    };
    let ratio = current / avg;
    if ratio <= 0.85 {
        85.0 + ((0.85 - ratio) * 100.0).min(15.0)
    } else if ratio <= 0.95 {
        70.0 + (0.95 - ratio) * 150.0
    } else if ratio <= 1.0 {
        50.0 + (1.0 - ratio) * 200.0
    } else if ratio <= 1.1 {
        30.0 + (1.1 - ratio) * 200.0
    } else {
        (30.0 - (ratio - 1.1) * 100.0).max(0.0)
    }
}

fn summarize(
    current: i64,
    drop_detected: bool,
    drop_percent: Option<f64>,
    all_time_min: Option<i64>,
    vs_avg_30d: Option<f64>,
    trend: Option<PriceTrend>,
) -> String {
    if drop_detected {
        let drop = drop_percent.unwrap_or_default().abs();
        return format!("Price drop! {drop:.0}% cheaper than the 7-day average.");
    }
    if all_time_min.is_some_and(|min| min > 0 && current as f64 <= min as f64 * 1.02) {
        return "At or near the all-time low. Now is a good time to buy.".to_string();
    }
    if let Some(vs) = vs_avg_30d {
        if vs > 0.0 {
            return format!("{vs:.1}% cheaper than the 30-day average.");
        }
        if vs < -5.0 {
            return format!(
                "{:.1}% more expensive than the 30-day average. Waiting a little may pay off.",
                vs.abs()
            );
        }
    }
    match trend {
        Some(PriceTrend::Rising) => {
            "Prices are trending up. Deciding soon is recommended.".to_string()
        }
        Some(PriceTrend::Falling) => {
            "Prices are trending down. Waiting a bit longer may pay off.".to_string()
        }
        _ => "Price is stable.".to_string(),
    }
}
