use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One observed lowest price, in whole won.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub price: i64,
    pub recorded_at: DateTime<Utc>,
    pub mall_name: Option<String>,
}

impl PriceRecord {
    pub fn new(price: i64, recorded_at: DateTime<Utc>) -> Self {
        Self { price, recorded_at, mall_name: None }
    }

    /// Calendar day the record belongs to; a product keeps at most one record per day.
    pub fn recorded_on(&self) -> NaiveDate {
        self.recorded_at.date_naive()
    }
}

/// Latest price in the series by timestamp.
pub fn latest_price(history: &[PriceRecord]) -> Option<i64> {
    history.iter().max_by_key(|record| record.recorded_at).map(|record| record.price)
}
