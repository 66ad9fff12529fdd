//! HTTP Quote Fetcher - Real Source Client
//!
//! GETs `{base_url}/{product_id}` and returns the JSON records untouched.
//! Accepts either a bare array or an object wrapping the array in `prices`.

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::error::AggregatorError;
use crate::domain::source::{RawQuote, SourceDescriptor};
use crate::ports::quote_fetcher::RawQuoteFetcher;

/// reqwest-backed raw fetcher.
#[derive(Debug, Clone)]
pub struct HttpQuoteFetcher {
  http: Client,
}

impl HttpQuoteFetcher {
  pub fn new() -> anyhow::Result<Self> {
    let http = Client::builder()
      .pool_max_idle_per_host(5)
      .user_agent(concat!("price-aggregator/", env!("CARGO_PKG_VERSION")))
      .build()
      .context("Failed to build HTTP client")?;

    Ok(Self { http })
  }

  fn url(source: &SourceDescriptor, product_id: &str) -> String {
    format!("{}/{product_id}", source.base_url.trim_end_matches('/'))
  }
}

#[async_trait]
impl RawQuoteFetcher for HttpQuoteFetcher {
  async fn fetch_raw(
    &self,
    source: &SourceDescriptor,
    product_id: &str,
  ) -> Result<Vec<RawQuote>, AggregatorError> {
    let url = Self::url(source, product_id);

    let response = self
      .http
      .get(&url)
      .timeout(source.timeout())
      .send()
      .await
      .map_err(|e| AggregatorError::Transient(format!("{}: request failed: {e}", source.name)))?;

    let status = response.status();
    if status == StatusCode::NOT_FOUND {
      debug!(source = %source.name, product_id, "Source does not carry product");
      return Ok(Vec::new());
    }
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
      warn!(source = %source.name, %status, "Source returned retryable status");
      return Err(AggregatorError::Transient(format!(
        "{}: HTTP {status}",
        source.name
      )));
    }
    if !status.is_success() {
      return Err(AggregatorError::Validation(format!(
        "{}: HTTP {status}",
        source.name
      )));
    }

    let body: Value = response.json().await.map_err(|e| {
      AggregatorError::Validation(format!("{}: undecodable body: {e}", source.name))
    })?;

    extract_records(body).ok_or_else(|| {
      AggregatorError::Validation(format!(
        "{}: body is neither an array nor an object with a prices array",
        source.name
      ))
    })
  }
}

fn extract_records(body: Value) -> Option<Vec<RawQuote>> {
  match body {
    Value::Array(records) => Some(records),
    Value::Object(mut map) => match map.remove("prices") {
      Some(Value::Array(records)) => Some(records),
      _ => None,
    },
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_extract_records_shapes() {
    assert_eq!(extract_records(json!([{"a": 1}])).unwrap().len(), 1);
    assert_eq!(extract_records(json!({"prices": [{"a": 1}, {"a": 2}]})).unwrap().len(), 2);
    assert!(extract_records(json!({"data": []})).is_none());
    assert!(extract_records(json!("text")).is_none());
  }

  #[test]
  fn test_url_joins_without_double_slash() {
    let source = SourceDescriptor {
      name: "A".into(),
      base_url: "https://api.example.com/v1/prices/".into(),
      raw_catalog: Default::default(),
      response_format: "format_a".into(),
      is_active: true,
      timeout_seconds: 30,
    };
    assert_eq!(
      HttpQuoteFetcher::url(&source, "123"),
      "https://api.example.com/v1/prices/123"
    );
  }
}
