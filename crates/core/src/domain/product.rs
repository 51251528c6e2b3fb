use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProductId(pub String);

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Catalog listing metadata for one laptop.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    /// Identifier assigned by the upstream shopping search API.
    pub external_id: String,
    pub name: String,
    pub brand: String,
    pub image_url: Option<String>,
    pub mall_url: String,
    pub release_date: Option<NaiveDate>,
    pub current_lowest: Option<i64>,
}

impl Product {
    /// Whole 30-day periods elapsed since release, or `None` when the release date
    /// is unknown. Future release dates count as zero.
    pub fn months_since_release(&self, now: DateTime<Utc>) -> Option<i64> {
        let released = self.release_date?;
        let days = (now.date_naive() - released).num_days();
        Some(days.max(0) / 30)
    }
}
