//! Persisted lowest-price record and selection.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::quote::Quote;

/// Current known lowest price for a product.
///
/// At most one row per `product_id` exists in the store. Rows are replaced
/// by delete-then-insert, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPrice {
    /// Product identifier.
    pub product_id: String,
    /// Vendor offering the price.
    pub vendor_name: String,
    /// Non-negative price.
    pub price: Decimal,
    /// Round timestamp shared by every price of the round.
    pub fetched_at: DateTime<Utc>,
}

impl ProductPrice {
    /// Stamp a quote for a product with the round timestamp.
    pub fn from_quote(product_id: &str, quote: &Quote, fetched_at: DateTime<Utc>) -> Self {
        Self {
            product_id: product_id.to_string(),
            vendor_name: quote.vendor().to_string(),
            price: quote.price(),
            fetched_at,
        }
    }

    pub fn is_lower_price_than(&self, other: &Self) -> bool {
        self.price < other.price
    }
}

/// Pick the cheapest price, keeping the earliest on ties.
///
/// Seeds the running minimum with the first element and only replaces it on
/// a strictly lower price.
pub fn select_lowest(prices: &[ProductPrice]) -> Option<&ProductPrice> {
    let (first, rest) = prices.split_first()?;

    Some(rest.iter().fold(first, |lowest, candidate| {
        if candidate.is_lower_price_than(lowest) {
            candidate
        } else {
            lowest
        }
    }))
}
