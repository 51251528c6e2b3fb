pub mod config;
pub mod domain;
pub mod errors;
pub mod format;
pub mod games;
pub mod narrative;
pub mod normalize;
pub mod pricing;
pub mod recommend;
pub mod report;
pub mod scoring;
pub mod verdict;

pub use domain::{
    Budget, GpuTier, PanelType, ParsedSpec, PriceRecord, Priority, Product, ProductId,
    RecommendRequest, UsageKind,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use games::{estimate_game_fps, GameEstimate, Playability};
pub use narrative::{CachedNarrative, NarrativeCache, NarrativeKind, NarrativeOutcome};
pub use normalize::{estimate_release_date, parse_spec};
pub use pricing::{
    analyze_prices, AnomalyLevel, AnomalyThresholds, PriceAnalysis, PriceAnalyzer, PriceTier,
    PriceTrend,
};
pub use recommend::{current_price, rank_recommendations, Candidate, Recommendation};
pub use report::{Comparison, ProductReport, Winners};
pub use scoring::{calculate_usage_scores, calculate_work_suitability, UsageScores};
pub use verdict::{evaluate_should_buy, BuyFactor, ShouldBuy, Verdict};
