//! Price source descriptors and response formats.
//!
//! A [`SourceDescriptor`] is configuration owned outside the core. Its
//! `response_format` tag stays a plain string so that a broken definition is
//! reported when the source is used, not when the catalog is loaded.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::AggregatorError;
use super::quote::Quote;

/// One source-specific raw quote record, shape defined by the format tag.
pub type RawQuote = Value;

/// A configured external price source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    /// Unique source name. Used as cache-key component.
    pub name: String,
    /// Endpoint root for a real HTTP client.
    pub base_url: String,
    /// Product id -> raw quote records served by the simulated fetch.
    #[serde(default, alias = "catalog")]
    pub raw_catalog: HashMap<String, Vec<RawQuote>>,
    /// Format tag (`format_a`, `format_b`, `format_c` or a legacy alias).
    pub response_format: String,
    /// Inactive sources are never queried.
    #[serde(default = "default_true", alias = "active")]
    pub is_active: bool,
    /// Per-attempt deadline for a raw fetch.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl SourceDescriptor {
    /// Raw records for a product, empty if the source does not carry it.
    pub fn raw_quotes_for(&self, product_id: &str) -> Vec<RawQuote> {
        self.raw_catalog
            .get(product_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Resolve the response format tag.
    pub fn format(&self) -> Result<ResponseFormat, AggregatorError> {
        self.response_format.parse()
    }

    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

fn default_true() -> bool {
    true
}

fn default_timeout_seconds() -> u64 {
    30
}

/// Closed set of raw response shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseFormat {
    /// `{ "vendor": .., "price": .. }`
    FormatA,
    /// `{ "name": .., "amount": .. }`
    FormatB,
    /// `{ "supplier": .., "cost": .. }`
    FormatC,
}

impl ResponseFormat {
    /// Canonical tag.
    pub const fn tag(self) -> &'static str {
        match self {
            Self::FormatA => "format_a",
            Self::FormatB => "format_b",
            Self::FormatC => "format_c",
        }
    }

    /// (vendor field, price field) for this shape.
    const fn fields(self) -> (&'static str, &'static str) {
        match self {
            Self::FormatA => ("vendor", "price"),
            Self::FormatB => ("name", "amount"),
            Self::FormatC => ("supplier", "cost"),
        }
    }

    /// Convert one raw record into a validated [`Quote`].
    pub fn convert(self, raw: &RawQuote) -> Result<Quote, AggregatorError> {
        let record = raw.as_object().ok_or_else(|| {
            AggregatorError::Validation(format!("raw record is not an object: {raw}"))
        })?;

        let (vendor_field, price_field) = self.fields();
        let vendor = string_field(record, vendor_field)?;
        let price = decimal_field(record, price_field)?;

        Quote::new(vendor, price)
    }
}

impl FromStr for ResponseFormat {
    type Err = AggregatorError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag.trim() {
            "format_a" | "api_one" => Ok(Self::FormatA),
            "format_b" | "api_two" => Ok(Self::FormatB),
            "format_c" | "api_three" => Ok(Self::FormatC),
            other => Err(AggregatorError::Configuration(format!(
                "Unknown format: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for ResponseFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

fn string_field<'a>(record: &'a Map<String, Value>, field: &str) -> Result<&'a str, AggregatorError> {
    match record.get(field) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(AggregatorError::Validation(format!(
            "field `{field}` is not a string: {other}"
        ))),
        None => Err(AggregatorError::Validation(format!("missing field `{field}`"))),
    }
}

fn decimal_field(record: &Map<String, Value>, field: &str) -> Result<Decimal, AggregatorError> {
    let text = match record.get(field) {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(other) => {
            return Err(AggregatorError::Validation(format!(
                "field `{field}` is not numeric: {other}"
            )));
        }
        None => return Err(AggregatorError::Validation(format!("missing field `{field}`"))),
    };

    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|e| AggregatorError::Validation(format!("field `{field}`: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_format_a_and_b_yield_same_quote() {
        let a = ResponseFormat::FormatA
            .convert(&json!({"vendor": "X", "price": 10}))
            .unwrap();
        let b = ResponseFormat::FormatB
            .convert(&json!({"name": "X", "amount": 10}))
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(a.vendor(), "X");
        assert_eq!(a.price(), dec!(10));
    }

    #[test]
    fn test_format_c_fields() {
        let quote = ResponseFormat::FormatC
            .convert(&json!({"supplier": "SupplierAlpha", "cost": 18.25}))
            .unwrap();
        assert_eq!(quote.vendor(), "SupplierAlpha");
        assert_eq!(quote.price(), dec!(18.25));
    }

    #[test]
    fn test_float_prices_convert_exactly() {
        let quote = ResponseFormat::FormatA
            .convert(&json!({"vendor": "ShopA", "price": 19.99}))
            .unwrap();
        assert_eq!(quote.price(), dec!(19.99));
    }

    #[test]
    fn test_string_price_accepted() {
        let quote = ResponseFormat::FormatB
            .convert(&json!({"name": "VendorOne", "amount": " 20.49 "}))
            .unwrap();
        assert_eq!(quote.price(), dec!(20.49));
    }

    #[test]
    fn test_unknown_tag_is_configuration_error() {
        let err = "format_z".parse::<ResponseFormat>().unwrap_err();
        assert!(matches!(err, AggregatorError::Configuration(_)));
    }

    #[test]
    fn test_legacy_aliases() {
        assert_eq!("api_one".parse::<ResponseFormat>().unwrap(), ResponseFormat::FormatA);
        assert_eq!("api_two".parse::<ResponseFormat>().unwrap(), ResponseFormat::FormatB);
        assert_eq!("api_three".parse::<ResponseFormat>().unwrap(), ResponseFormat::FormatC);
    }

    #[test]
    fn test_wrong_shape_is_validation_error() {
        // format A fields under format B
        let err = ResponseFormat::FormatB
            .convert(&json!({"vendor": "X", "price": 10}))
            .unwrap_err();
        assert!(matches!(err, AggregatorError::Validation(_)));

        let err = ResponseFormat::FormatA
            .convert(&json!({"vendor": "X", "price": "cheap"}))
            .unwrap_err();
        assert!(matches!(err, AggregatorError::Validation(_)));

        let err = ResponseFormat::FormatA.convert(&json!([1, 2])).unwrap_err();
        assert!(matches!(err, AggregatorError::Validation(_)));
    }

    #[test]
    fn test_negative_price_rejected_by_quote() {
        let err = ResponseFormat::FormatA
            .convert(&json!({"vendor": "X", "price": -1}))
            .unwrap_err();
        assert!(matches!(err, AggregatorError::Validation(_)));
    }

    #[test]
    fn test_descriptor_lookup_and_defaults() {
        let descriptor: SourceDescriptor = serde_json::from_value(json!({
            "name": "API One",
            "base_url": "https://api.example.com",
            "catalog": { "123": [{"vendor": "ShopA", "price": 19.99}] },
            "response_format": "format_a"
        }))
        .unwrap();

        assert!(descriptor.is_active);
        assert_eq!(descriptor.timeout(), Duration::from_secs(30));
        assert_eq!(descriptor.raw_quotes_for("123").len(), 1);
        assert!(descriptor.raw_quotes_for("999").is_empty());
        assert_eq!(descriptor.format().unwrap(), ResponseFormat::FormatA);
    }
}
