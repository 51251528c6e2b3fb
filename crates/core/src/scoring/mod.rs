//! Heuristic suitability scoring.
//!
//! Every hardware attribute is mapped to a 0-100 component score through a fixed
//! step table, and the per-use-case scores are fixed weighted blends of those
//! components. Missing attributes take a neutral default instead of failing, so
//! all functions here are total over any `ParsedSpec`.

pub mod features;

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::{GpuTier, ParsedSpec, UsageKind};

pub use features::{
    analyze_display_suitability, analyze_port_suitability, analyze_tech_features,
    DisplaySuitability, PortSuitability, TechFeatures,
};

/// Neutral score for absent or unrecognised inputs.
pub const NEUTRAL_SCORE: u8 = 50;

/// Baseline stand-in for the unmodelled resolution factor of the work score.
const WORK_RESOLUTION_BASELINE: f64 = 60.0;

// ---------------------------------------------------------------------------
// Component scores
// ---------------------------------------------------------------------------

/// CPU patterns ordered from the highest score down, so a specific high-tier
/// match is never shadowed by a looser one.
const CPU_PATTERNS: &[(&str, u8)] = &[
    (r"\bm4\s+max\b", 98),
    (r"i9-1[34]\d{3}hx", 95),
    (r"\bm3\s+max\b", 95),
    (r"\bm4\s+pro\b", 92),
    (r"ultra\s+[79]\b", 90),
    (r"ryzen\s+9\s+[78]\d{3}", 90),
    (r"ryzen\s+ai\s+9\b", 90),
    (r"\bm3\s+pro\b", 90),
    (r"i7-1[34]\d{3}hx", 88),
    (r"i9-1[34]\d{3}h", 85),
    (r"\bm4\b", 85),
    (r"\bm3\b", 82),
    (r"ryzen\s+9\s+[56]\d{3}", 82),
    (r"ultra\s+5\b", 80),
    (r"ryzen\s+7\s+[78]\d{3}", 80),
    (r"ryzen\s+ai\s+7\b", 80),
    (r"i7-1[34]\d{3}h", 78),
    (r"\bm2\b", 75),
    (r"ryzen\s+7\s+[56]\d{3}", 72),
    (r"ryzen\s+5\s+[78]\d{3}", 70),
    (r"ryzen\s+ai\s+5\b", 70),
    (r"i5-1[34]\d{3}h", 68),
    (r"ryzen\s+5\s+[56]\d{3}", 62),
    (r"i5-1[34]\d{3}u", 60),
    (r"i3-1[34]\d{3}", 45),
];

fn cpu_table() -> &'static [(Regex, u8)] {
    static TABLE: OnceLock<Vec<(Regex, u8)>> = OnceLock::new();
    TABLE.get_or_init(|| {
        CPU_PATTERNS
            .iter()
            .filter_map(|(pattern, score)| Regex::new(pattern).ok().map(|regex| (regex, *score)))
            .collect()
    })
}

/// Lexical CPU tier lookup. First matching pattern wins; unknown CPUs score 50.
pub fn cpu_score(cpu: &str) -> u8 {
    let lower = cpu.to_lowercase();
    cpu_table()
        .iter()
        .find(|(pattern, _)| pattern.is_match(&lower))
        .map(|(_, score)| *score)
        .unwrap_or(NEUTRAL_SCORE)
}

pub fn gpu_score(tier: GpuTier) -> u8 {
    match tier.get() {
        1 => 10,
        2 => 20,
        3 => 35,
        4 => 45,
        5 => 55,
        6 => 65,
        7 => 75,
        8 => 85,
        9 => 92,
        10 => 100,
        _ => 10,
    }
}

pub fn ram_score(ram_gb: u32) -> u8 {
    match ram_gb {
        64.. => 100,
        32..=63 => 85,
        16..=31 => 70,
        8..=15 => 50,
        _ => 25,
    }
}

pub fn ssd_score(ssd_gb: u32) -> u8 {
    match ssd_gb {
        2048.. => 100,
        1024..=2047 => 80,
        512..=1023 => 60,
        256..=511 => 40,
        _ => 20,
    }
}

pub fn battery_score(battery_wh: Option<f64>) -> u8 {
    let Some(wh) = battery_wh.filter(|wh| *wh > 0.0) else {
        return NEUTRAL_SCORE;
    };
    if wh >= 90.0 {
        100
    } else if wh >= 72.0 {
        80
    } else if wh >= 60.0 {
        65
    } else if wh >= 45.0 {
        50
    } else {
        30
    }
}

/// Lighter is better.
pub fn weight_score(weight_kg: Option<f64>) -> u8 {
    let Some(kg) = weight_kg.filter(|kg| *kg > 0.0) else {
        return NEUTRAL_SCORE;
    };
    if kg <= 1.0 {
        100
    } else if kg <= 1.3 {
        90
    } else if kg <= 1.5 {
        80
    } else if kg <= 1.8 {
        65
    } else if kg <= 2.0 {
        55
    } else if kg <= 2.5 {
        40
    } else if kg <= 3.0 {
        25
    } else {
        10
    }
}

pub fn refresh_rate_score(refresh_hz: Option<u32>) -> u8 {
    match refresh_hz.filter(|hz| *hz > 0) {
        None => NEUTRAL_SCORE,
        Some(240..) => 100,
        Some(165..=239) => 85,
        Some(144..=164) => 75,
        Some(120..=143) => 65,
        Some(90..=119) => 55,
        Some(_) => 40,
    }
}

/// Cheaper is better; used by the student profile.
pub fn price_score(price: Option<i64>) -> u8 {
    match price.filter(|price| *price > 0) {
        None => NEUTRAL_SCORE,
        Some(..=599_999) => 100,
        Some(600_000..=799_999) => 85,
        Some(800_000..=999_999) => 70,
        Some(1_000_000..=1_299_999) => 55,
        Some(1_300_000..=1_599_999) => 40,
        Some(1_600_000..=1_999_999) => 25,
        Some(_) => 10,
    }
}

/// Smaller screens carry better.
pub fn screen_size_score(screen_size: Option<f64>) -> u8 {
    match screen_size.filter(|inches| *inches > 0.0) {
        None => 60,
        Some(inches) if inches <= 13.3 => 100,
        Some(inches) if inches <= 14.0 => 85,
        Some(inches) if inches <= 15.6 => 65,
        Some(_) => 40,
    }
}

// ---------------------------------------------------------------------------
// Usage scores
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageScores {
    pub gaming: u8,
    pub work: u8,
    pub student: u8,
    pub video: u8,
    pub portable: u8,
    pub overall: u8,
}

impl UsageScores {
    pub fn for_usage(&self, usage: UsageKind) -> u8 {
        match usage {
            UsageKind::Gaming => self.gaming,
            UsageKind::Work => self.work,
            UsageKind::Student => self.student,
            UsageKind::Video => self.video,
            UsageKind::Portable => self.portable,
        }
    }
}

/// Half-up rounding into `[0, 100]`.
fn bounded(value: f64) -> u8 {
    value.round().clamp(0.0, 100.0) as u8
}

pub fn calculate_usage_scores(spec: &ParsedSpec, current_price: Option<i64>) -> UsageScores {
    let cpu = f64::from(cpu_score(&spec.cpu));
    let gpu = f64::from(gpu_score(spec.gpu_tier));
    let ram = f64::from(ram_score(spec.ram_gb));
    let ssd = f64::from(ssd_score(spec.ssd_gb));
    let weight = f64::from(weight_score(spec.weight_kg));
    let battery = f64::from(battery_score(spec.battery_wh));
    let refresh = f64::from(refresh_rate_score(spec.refresh_rate));
    let price = f64::from(price_score(current_price));
    let size = f64::from(screen_size_score(spec.screen_size));

    let gaming = bounded(gpu * 0.5 + cpu * 0.25 + ram * 0.15 + refresh * 0.1);
    let work = bounded(cpu * 0.35 + ram * 0.3 + ssd * 0.2 + WORK_RESOLUTION_BASELINE * 0.15);
    let video = bounded(gpu * 0.3 + cpu * 0.3 + ram * 0.25 + ssd * 0.15);
    let base = bounded(cpu * 0.5 + ram * 0.3 + ssd * 0.2);
    let student =
        bounded(price * 0.3 + weight * 0.25 + battery * 0.25 + f64::from(base) * 0.2);
    let portable = bounded(weight * 0.4 + battery * 0.3 + size * 0.3);
    let overall = bounded(
        f64::from(gaming) * 0.2
            + f64::from(work) * 0.25
            + f64::from(video) * 0.2
            + f64::from(student) * 0.2
            + f64::from(portable) * 0.15,
    );

    UsageScores { gaming, work, student, video, portable, overall }
}

/// Display band for a 0-100 score.
pub fn score_label(score: u8) -> &'static str {
    match score {
        80.. => "excellent fit",
        60..=79 => "good fit",
        40..=59 => "average",
        _ => "poor fit",
    }
}

// ---------------------------------------------------------------------------
// Work suitability
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkRating {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl WorkRating {
    pub fn from_score(score: u8) -> Self {
        match score {
            75.. => Self::Excellent,
            55..=74 => Self::Good,
            35..=54 => Self::Fair,
            _ => Self::Poor,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Excellent => "More than enough",
            Self::Good => "Runs without issues",
            Self::Fair => "A little short",
            Self::Poor => "Not recommended",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkAssessment {
    pub score: u8,
    pub rating: WorkRating,
    pub summary: String,
}

impl WorkAssessment {
    fn from_score(score: u8) -> Self {
        let rating = WorkRating::from_score(score);
        Self { score, rating, summary: rating.label().to_string() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkSuitability {
    pub coding: WorkAssessment,
    pub video_editing: WorkAssessment,
    pub photo_design: WorkAssessment,
    pub three_d: WorkAssessment,
}

pub fn calculate_work_suitability(spec: &ParsedSpec) -> WorkSuitability {
    let cpu = f64::from(cpu_score(&spec.cpu));
    let gpu = f64::from(gpu_score(spec.gpu_tier));
    let ram = f64::from(ram_score(spec.ram_gb));
    let ssd = f64::from(ssd_score(spec.ssd_gb));

    let coding = bounded(cpu * 0.4 + ram * 0.35 + ssd * 0.25);
    let video_editing = bounded(cpu * 0.3 + gpu * 0.3 + ram * 0.25 + ssd * 0.15);
    let photo_design = bounded(gpu * 0.25 + cpu * 0.35 + ram * 0.25 + ssd * 0.15);
    let three_d = bounded(gpu * 0.4 + cpu * 0.3 + ram * 0.2 + ssd * 0.1);

    WorkSuitability {
        coding: WorkAssessment::from_score(coding),
        video_editing: WorkAssessment::from_score(video_editing),
        photo_design: WorkAssessment::from_score(photo_design),
        three_d: WorkAssessment::from_score(three_d),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GpuTier, ParsedSpec};

    fn gaming_laptop() -> ParsedSpec {
        ParsedSpec {
            cpu: "Intel Core i7-13700H".to_string(),
            gpu_tier: GpuTier::new(7),
            ram_gb: 16,
            ssd_gb: 512,
            refresh_rate: Some(165),
            ..ParsedSpec::default()
        }
    }

    #[test]
    fn cpu_table_prefers_specific_high_tier_patterns() {
        assert_eq!(cpu_score("Apple M4 Max"), 98);
        assert_eq!(cpu_score("Apple M4 Pro"), 92);
        assert_eq!(cpu_score("Apple M4"), 85);
        assert_eq!(cpu_score("Intel Core i9-14900HX"), 95);
        assert_eq!(cpu_score("Intel Core i9-13980H"), 85);
        assert_eq!(cpu_score("Intel Core i7-13650HX"), 88);
        assert_eq!(cpu_score("Intel Core i7-13700H"), 78);
        assert_eq!(cpu_score("Intel Core i5-13420H"), 68);
        assert_eq!(cpu_score("Intel Core Ultra 7 155H"), 90);
        assert_eq!(cpu_score("Intel Core Ultra 5 125H"), 80);
    }

    #[test]
    fn ryzen_generation_decides_the_tier() {
        assert_eq!(cpu_score("AMD Ryzen 9 7940HS"), 90);
        assert_eq!(cpu_score("AMD Ryzen 7 8845HS"), 80);
        assert_eq!(cpu_score("AMD Ryzen 7 5800H"), 72);
        assert_eq!(cpu_score("AMD Ryzen 5 7535HS"), 70);
        assert_eq!(cpu_score("AMD Ryzen 5 5600U"), 62);
        assert_eq!(cpu_score("AMD Ryzen AI 9 HX 370"), 90);
    }

    #[test]
    fn unknown_cpu_sentinels_score_neutral() {
        assert_eq!(cpu_score("unknown"), NEUTRAL_SCORE);
        assert_eq!(cpu_score("알 수 없음"), NEUTRAL_SCORE);
        assert_eq!(cpu_score("Intel Core i7-1360P"), NEUTRAL_SCORE);
    }

    #[test]
    fn gpu_score_is_monotonic_in_tier() {
        let scores: Vec<u8> = (1..=10).map(|tier| gpu_score(GpuTier::new(tier))).collect();
        assert!(scores.windows(2).all(|pair| pair[0] <= pair[1]), "{scores:?}");
        assert_eq!(scores.first(), Some(&10));
        assert_eq!(scores.last(), Some(&100));
    }

    #[test]
    fn step_functions_use_documented_breakpoints() {
        assert_eq!(ram_score(64), 100);
        assert_eq!(ram_score(32), 85);
        assert_eq!(ram_score(8), 50);
        assert_eq!(ram_score(4), 25);
        assert_eq!(ssd_score(2048), 100);
        assert_eq!(ssd_score(256), 40);
        assert_eq!(ssd_score(128), 20);
        assert_eq!(battery_score(Some(72.0)), 80);
        assert_eq!(battery_score(Some(30.0)), 30);
        assert_eq!(weight_score(Some(1.3)), 90);
        assert_eq!(weight_score(Some(3.5)), 10);
        assert_eq!(refresh_rate_score(Some(144)), 75);
        assert_eq!(refresh_rate_score(Some(60)), 40);
        assert_eq!(price_score(Some(599_999)), 100);
        assert_eq!(price_score(Some(600_000)), 85);
        assert_eq!(price_score(Some(2_000_000)), 10);
    }

    #[test]
    fn absent_inputs_take_neutral_defaults() {
        assert_eq!(battery_score(None), 50);
        assert_eq!(weight_score(None), 50);
        assert_eq!(refresh_rate_score(None), 50);
        assert_eq!(price_score(None), 50);
        assert_eq!(price_score(Some(0)), 50);
        assert_eq!(screen_size_score(None), 60);
    }

    #[test]
    fn gaming_score_is_dominated_by_the_gpu() {
        let scores = calculate_usage_scores(&gaming_laptop(), Some(1_500_000));
        // 75 * 0.5 + 78 * 0.25 + 70 * 0.15 + 85 * 0.1
        assert_eq!(scores.gaming, 76);
        assert!(scores.gaming >= 70);
    }

    #[test]
    fn usage_scores_are_deterministic() {
        let spec = gaming_laptop();
        assert_eq!(
            calculate_usage_scores(&spec, Some(1_500_000)),
            calculate_usage_scores(&spec, Some(1_500_000))
        );
    }

    #[test]
    fn default_spec_produces_expected_profile() {
        let scores = calculate_usage_scores(&ParsedSpec::default(), None);
        // cpu 50, gpu 10, ram 70, ssd 60, refresh 40, everything else neutral
        assert_eq!(scores.gaming, 32);
        assert_eq!(scores.student, 52);
        assert_eq!(scores.portable, 53);
    }

    #[test]
    fn scores_stay_within_bounds_at_the_extremes() {
        let best = ParsedSpec {
            cpu: "Apple M4 Max".to_string(),
            gpu_tier: GpuTier::MAX,
            ram_gb: 128,
            ssd_gb: 4096,
            refresh_rate: Some(360),
            weight_kg: Some(0.9),
            battery_wh: Some(99.0),
            screen_size: Some(13.0),
            ..ParsedSpec::default()
        };
        let worst = ParsedSpec {
            cpu: "unknown".to_string(),
            ram_gb: 2,
            ssd_gb: 64,
            refresh_rate: Some(30),
            weight_kg: Some(4.2),
            battery_wh: Some(20.0),
            screen_size: Some(18.0),
            ..ParsedSpec::default()
        };

        for (spec, price) in [(best, Some(400_000)), (worst, Some(5_000_000))] {
            let scores = calculate_usage_scores(&spec, price);
            for value in [
                scores.gaming,
                scores.work,
                scores.student,
                scores.video,
                scores.portable,
                scores.overall,
            ] {
                assert!(value <= 100, "{scores:?}");
            }
        }
    }

    #[test]
    fn work_suitability_maps_scores_to_ratings() {
        let suitability = calculate_work_suitability(&gaming_laptop());
        // coding: 78 * 0.4 + 70 * 0.35 + 60 * 0.25 = 70.7
        assert_eq!(suitability.coding.score, 71);
        assert_eq!(suitability.coding.rating, WorkRating::Good);
        assert_eq!(suitability.coding.summary, "Runs without issues");
        // 3D: 75 * 0.4 + 78 * 0.3 + 70 * 0.2 + 60 * 0.1 = 73.4
        assert_eq!(suitability.three_d.score, 73);
    }

    #[test]
    fn rating_thresholds_are_inclusive() {
        assert_eq!(WorkRating::from_score(75), WorkRating::Excellent);
        assert_eq!(WorkRating::from_score(55), WorkRating::Good);
        assert_eq!(WorkRating::from_score(35), WorkRating::Fair);
        assert_eq!(WorkRating::from_score(34), WorkRating::Poor);
    }

    #[test]
    fn score_labels_follow_display_bands() {
        assert_eq!(score_label(80), "excellent fit");
        assert_eq!(score_label(60), "good fit");
        assert_eq!(score_label(40), "average");
        assert_eq!(score_label(39), "poor fit");
    }
}
