//! Aggregation round output types.
//!
//! These are response DTOs: derived from a round, cached as JSON, and served
//! by the read API. They are never persisted.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::product_price::ProductPrice;

/// Response-shaped lowest price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceResponse {
    pub product_id: String,
    pub vendor: String,
    pub price: Decimal,
    pub fetched_at: DateTime<Utc>,
}

impl From<&ProductPrice> for PriceResponse {
    fn from(row: &ProductPrice) -> Self {
        Self {
            product_id: row.product_id.clone(),
            vendor: row.vendor_name.clone(),
            price: row.price,
            fetched_at: row.fetched_at,
        }
    }
}

/// A source that raised during a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFailure {
    /// Source name.
    pub source: String,
    /// Failure message.
    pub error: String,
}

/// Outcome of one aggregation round for a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationResult {
    /// Product the round ran for.
    pub product_id: String,
    /// Active sources considered.
    pub total_sources_checked: usize,
    /// Sources that returned at least one quote.
    pub successful_sources: usize,
    /// `total_sources_checked - successful_sources`.
    pub failed_sources: usize,
    /// Cheapest quote of the round, absent when no source produced one.
    pub lowest_price: Option<PriceResponse>,
    /// Per-source failures in source order.
    #[serde(default)]
    pub errors: Vec<SourceFailure>,
}

impl AggregationResult {
    /// A round is successful when it found a price.
    pub const fn is_successful(&self) -> bool {
        self.lowest_price.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_result_serde_shape() {
        let result = AggregationResult {
            product_id: "123".to_string(),
            total_sources_checked: 3,
            successful_sources: 2,
            failed_sources: 1,
            lowest_price: Some(PriceResponse {
                product_id: "123".to_string(),
                vendor: "VendorThree".to_string(),
                price: dec!(16.75),
                fetched_at: DateTime::<Utc>::UNIX_EPOCH,
            }),
            errors: vec![SourceFailure {
                source: "API Three".to_string(),
                error: "source misconfigured: Unknown format: xml".to_string(),
            }],
        };

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["lowest_price"]["vendor"], "VendorThree");
        assert_eq!(value["lowest_price"]["price"], "16.75");
        assert_eq!(value["errors"][0]["source"], "API Three");

        let back: AggregationResult = serde_json::from_value(value).unwrap();
        assert_eq!(back, result);
        assert!(back.is_successful());
    }

    #[test]
    fn test_unsuccessful_without_price() {
        let result = AggregationResult {
            product_id: "999".to_string(),
            total_sources_checked: 3,
            successful_sources: 0,
            failed_sources: 3,
            lowest_price: None,
            errors: Vec::new(),
        };
        assert!(!result.is_successful());
    }
}
