//! Quote value object.
//!
//! A single vendor/price pair returned by a source. Construction is the only
//! place the invariants are checked; a `Quote` that exists is valid.

use rust_decimal::Decimal;
use serde::Serialize;

use super::error::AggregatorError;

/// Validated vendor/price pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quote {
    vendor: String,
    price: Decimal,
}

impl Quote {
    /// Build a quote, rejecting an empty vendor or a negative price.
    pub fn new(vendor: impl Into<String>, price: Decimal) -> Result<Self, AggregatorError> {
        let vendor = vendor.into();

        if vendor.trim().is_empty() {
            return Err(AggregatorError::Validation(
                "Vendor name cannot be empty".to_string(),
            ));
        }

        if price < Decimal::ZERO {
            return Err(AggregatorError::Validation(format!(
                "Price cannot be negative, got {price}"
            )));
        }

        Ok(Self { vendor, price })
    }

    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    pub const fn price(&self) -> Decimal {
        self.price
    }
}
