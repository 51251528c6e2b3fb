//! Contract between the engine and the LLM narrative layer: cache keys, TTLs,
//! the cache interface, response cleanup and the deterministic fallback.

pub mod prompts;

use std::sync::OnceLock;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::{ProductId, RecommendRequest};
use crate::errors::ApplicationError;

/// Provider name recorded for the deterministic fallback body.
pub const TEMPLATE_PROVIDER: &str = "template";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrativeKind {
    Analysis,
    Comparison,
    Recommend,
}

impl NarrativeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Analysis => "analysis",
            Self::Comparison => "comparison",
            Self::Recommend => "recommend",
        }
    }

    /// How long a provider-generated body stays fresh.
    pub fn ttl(self) -> Duration {
        match self {
            Self::Analysis => Duration::days(7),
            Self::Comparison => Duration::days(14),
            Self::Recommend => Duration::days(1),
        }
    }

    /// Fallback bodies expire quickly so providers are retried soon.
    pub fn fallback_ttl() -> Duration {
        Duration::hours(1)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedNarrative {
    pub key: String,
    pub provider: String,
    pub body: String,
    pub product_id: Option<ProductId>,
    pub expires_at: DateTime<Utc>,
}

impl CachedNarrative {
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Injected store for generated narratives.
#[async_trait]
pub trait NarrativeCache: Send + Sync {
    /// Returns the entry only while it is unexpired.
    async fn get(
        &self,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<CachedNarrative>, ApplicationError>;

    /// Inserts or replaces the entry under its key.
    async fn put(&self, entry: CachedNarrative) -> Result<(), ApplicationError>;

    async fn invalidate(&self, key: &str) -> Result<(), ApplicationError>;

    /// Deletes every entry expired at `now`, returning how many were removed.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, ApplicationError>;
}

/// Narrative body returned to API callers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NarrativeOutcome {
    pub body: serde_json::Value,
    pub provider: String,
    pub cached: bool,
}

pub fn analysis_key(product_id: &ProductId) -> String {
    format!("analysis:{product_id}")
}

/// Order-insensitive: the same set of products always maps to one key.
pub fn comparison_key(product_ids: &[ProductId]) -> String {
    let mut ids: Vec<&str> = product_ids.iter().map(|id| id.0.as_str()).collect();
    ids.sort_unstable();
    format!("compare:{}", ids.join(":"))
}

pub fn recommend_key(request: &RecommendRequest) -> String {
    let canonical = serde_json::to_vec(request).unwrap_or_default();
    format!("recommend:{}", blake3::hash(&canonical).to_hex())
}

fn fenced_block() -> Option<&'static Regex> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").ok()).as_ref()
}

/// Strips markdown code fences, or trims to the outermost braces. Text with
/// neither is returned unchanged.
pub fn extract_json(raw: &str) -> &str {
    if let Some(captures) = fenced_block().and_then(|fence| fence.captures(raw)) {
        if let Some(inner) = captures.get(1) {
            return inner.as_str().trim();
        }
    }
    match (raw.find('{'), raw.rfind('}')) {
        (Some(start), Some(end)) if start < end => &raw[start..=end],
        _ => raw,
    }
}

/// Deterministic body used when every provider fails.
pub fn fallback_body() -> serde_json::Value {
    serde_json::json!({
        "pros": [
            "Reasonable performance based on the measured scores",
            "A sensible choice in its current price range"
        ],
        "cons": [
            "AI analysis is temporarily unavailable",
            "Check back shortly for a detailed write-up"
        ],
        "usage_summaries": {
            "gaming": "See the gaming score",
            "work": "See the work score",
            "student": "See the student score",
            "video": "See the video editing score",
            "portable": "See the portability score"
        },
        "should_buy_conclusion": "Weigh the current price and specifications together before deciding.",
        "best_for": "Check the score for your use case and decide."
    })
}
