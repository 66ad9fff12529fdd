//! Property-Based Tests - Selection and Retry Invariants
//!
//! Uses `proptest` to verify that lowest-price selection and the retry
//! executor hold their guarantees across random inputs.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;

use price_aggregator::domain::error::{AggregatorError, ErrorKind};
use price_aggregator::domain::product_price::{ProductPrice, select_lowest};
use price_aggregator::domain::quote::Quote;
use price_aggregator::domain::source::ResponseFormat;
use price_aggregator::usecases::RetryExecutor;

fn prices_from(cents: &[u32]) -> Vec<ProductPrice> {
    cents
        .iter()
        .enumerate()
        .map(|(i, c)| ProductPrice {
            product_id: "p".to_string(),
            vendor_name: format!("vendor-{i}"),
            price: Decimal::new(i64::from(*c), 2),
            fetched_at: DateTime::<Utc>::UNIX_EPOCH,
        })
        .collect()
}

// ── Lowest Price Selection ──────────────────────────────────

proptest! {
    /// The selected price is the minimum of all prices.
    #[test]
    fn selected_price_is_minimum(cents in prop::collection::vec(0u32..100_000, 1..40)) {
        let prices = prices_from(&cents);
        let lowest = select_lowest(&prices).unwrap();
        let min = prices.iter().map(|p| p.price).min().unwrap();
        prop_assert_eq!(lowest.price, min);
    }

    /// Among equal minimum prices, the earliest one wins.
    #[test]
    fn ties_keep_first_occurrence(cents in prop::collection::vec(0u32..50, 1..40)) {
        let prices = prices_from(&cents);
        let lowest = select_lowest(&prices).unwrap();
        let first_min = prices
            .iter()
            .position(|p| p.price == lowest.price)
            .unwrap();
        prop_assert_eq!(&lowest.vendor_name, &format!("vendor-{first_min}"));
    }

    /// Formats A and B agree on the same vendor and price.
    #[test]
    fn format_a_and_b_equivalent(vendor in "[A-Za-z][A-Za-z0-9 ]{0,20}", cents in 0u32..1_000_000) {
        let price = Decimal::new(i64::from(cents), 2);
        let a = ResponseFormat::FormatA
            .convert(&serde_json::json!({"vendor": vendor, "price": price.to_string()}))
            .unwrap();
        let b = ResponseFormat::FormatB
            .convert(&serde_json::json!({"name": vendor, "amount": price.to_string()}))
            .unwrap();
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(a, Quote::new(vendor.clone(), price).unwrap());
    }

    /// Quotes never accept negative prices.
    #[test]
    fn negative_prices_rejected(cents in 1i64..1_000_000) {
        prop_assert!(Quote::new("vendor", Decimal::new(-cents, 2)).is_err());
    }
}

// ── Retry Executor ──────────────────────────────────────────

proptest! {
    /// A permanently failing retryable operation runs exactly r + 1 times.
    #[test]
    fn retryable_failure_attempted_max_retries_plus_one(max_retries in 0u32..8) {
        let executor = RetryExecutor::new(max_retries, Duration::ZERO, 2.0);
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<(), _> = tokio_test::block_on(executor.execute(
            || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(AggregatorError::Transient("down".into()))
                }
            },
            &[ErrorKind::Transient],
        ));

        prop_assert!(result.is_err());
        prop_assert_eq!(calls.load(Ordering::SeqCst), max_retries + 1);
    }

    /// Non-retryable failures run exactly once regardless of the budget.
    #[test]
    fn non_retryable_failure_attempted_once(max_retries in 0u32..8) {
        let executor = RetryExecutor::new(max_retries, Duration::ZERO, 2.0);
        let calls = Arc::new(AtomicU32::new(0));

        let _ = tokio_test::block_on(executor.execute(
            || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(AggregatorError::Validation("bad".into()))
                }
            },
            &[ErrorKind::Transient],
        ));

        prop_assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    /// Backoff delays never shrink as attempts grow.
    #[test]
    fn delays_monotonic(
        base_ms in 1u64..5_000,
        multiplier in 1.0f64..4.0,
        attempt in 0u32..20,
    ) {
        let executor = RetryExecutor::new(10, Duration::from_millis(base_ms), multiplier);
        prop_assert!(executor.delay_for_attempt(attempt + 1) >= executor.delay_for_attempt(attempt));
    }

    /// Attempt zero waits exactly the base delay.
    #[test]
    fn first_delay_is_base(base_ms in 0u64..100_000, multiplier in 1.0f64..10.0) {
        let executor = RetryExecutor::new(3, Duration::from_millis(base_ms), multiplier);
        prop_assert_eq!(executor.delay_for_attempt(0), Duration::from_millis(base_ms));
    }
}
