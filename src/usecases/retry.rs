//! Retry Executor - Bounded Retries with Exponential Backoff
//!
//! Runs a fallible async operation up to `max_retries + 1` times. Only
//! failures whose [`ErrorKind`] is listed as retryable are retried; anything
//! else propagates on the first occurrence. When retries are exhausted the
//! last observed failure is returned.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::config::RetryConfig;
use crate::domain::error::{AggregatorError, ErrorKind};

/// Exponential backoff retry policy.
#[derive(Debug, Clone)]
pub struct RetryExecutor {
  /// Retries after the first attempt.
  max_retries: u32,
  /// Delay before the first retry.
  base_delay: Duration,
  /// Delay growth per retry.
  backoff_multiplier: f64,
}

impl RetryExecutor {
  /// Create an executor. Multipliers below 1 are clamped to 1.
  pub fn new(max_retries: u32, base_delay: Duration, backoff_multiplier: f64) -> Self {
    Self {
      max_retries,
      base_delay,
      backoff_multiplier: backoff_multiplier.max(1.0),
    }
  }

  /// Create an executor from the `[retry]` config section.
  pub fn from_config(config: &RetryConfig) -> Self {
    Self::new(config.max_retries, config.base_delay(), config.backoff_multiplier)
  }

  pub const fn max_retries(&self) -> u32 {
    self.max_retries
  }

  /// Backoff before retry number `attempt + 1`: `base * multiplier^attempt`,
  /// rounded to whole milliseconds.
  #[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::cast_possible_wrap
  )]
  pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
    let base_ms = self.base_delay.as_millis() as f64;
    let factor = self.backoff_multiplier.powi(attempt.min(i32::MAX as u32) as i32);
    let delay_ms = (base_ms * factor).round();

    if delay_ms.is_finite() && delay_ms < u64::MAX as f64 {
      Duration::from_millis(delay_ms as u64)
    } else {
      Duration::from_millis(u64::MAX)
    }
  }

  /// Execute `operation`, retrying failures whose kind is in `retryable`.
  ///
  /// # Errors
  /// The first non-retryable failure, or the last retryable failure once
  /// `max_retries` retries have been spent.
  pub async fn execute<T, F, Fut>(
    &self,
    mut operation: F,
    retryable: &[ErrorKind],
  ) -> Result<T, AggregatorError>
  where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AggregatorError>>,
  {
    let mut attempt = 0u32;

    loop {
      match operation().await {
        Ok(value) => {
          if attempt > 0 {
            info!(attempt = attempt + 1, "Operation succeeded after retry");
          }
          return Ok(value);
        }
        Err(err) => {
          if !err.is_retryable(retryable) {
            error!(error = %err, kind = %err.kind(), "Non-retryable failure");
            return Err(err);
          }

          if attempt >= self.max_retries {
            error!(
              max_retries = self.max_retries,
              error = %err,
              "Max retries exceeded"
            );
            return Err(err);
          }

          let delay = self.delay_for_attempt(attempt);
          warn!(
            attempt = attempt + 1,
            delay_ms = delay.as_millis(),
            error = %err,
            "Attempt failed, retrying"
          );

          sleep(delay).await;
          attempt += 1;
        }
      }
    }
  }
}

impl Default for RetryExecutor {
  fn default() -> Self {
    Self::from_config(&RetryConfig::default())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Arc;
  use std::sync::atomic::{AtomicU32, Ordering};

  const TRANSIENT: &[ErrorKind] = &[ErrorKind::Transient];

  fn no_delay(max_retries: u32) -> RetryExecutor {
    RetryExecutor::new(max_retries, Duration::ZERO, 2.0)
  }

  #[test]
  fn test_delay_schedule() {
    let executor = RetryExecutor::new(5, Duration::from_millis(1000), 2.0);
    assert_eq!(executor.delay_for_attempt(0), Duration::from_millis(1000));
    assert_eq!(executor.delay_for_attempt(1), Duration::from_millis(2000));
    assert_eq!(executor.delay_for_attempt(2), Duration::from_millis(4000));
    assert_eq!(executor.delay_for_attempt(3), Duration::from_millis(8000));
  }

  #[test]
  fn test_fractional_multiplier_rounds() {
    let executor = RetryExecutor::new(3, Duration::from_millis(100), 1.5);
    assert_eq!(executor.delay_for_attempt(1), Duration::from_millis(150));
    // 100 * 1.5^3 = 337.5
    assert_eq!(executor.delay_for_attempt(3), Duration::from_millis(338));
  }

  #[test]
  fn test_huge_attempt_saturates() {
    let executor = RetryExecutor::new(3, Duration::from_millis(1000), 10.0);
    assert_eq!(executor.delay_for_attempt(400), Duration::from_millis(u64::MAX));
  }

  #[tokio::test]
  async fn test_succeeds_first_try() {
    let calls = Arc::new(AtomicU32::new(0));
    let c = Arc::clone(&calls);
    let result = no_delay(3)
      .execute(
        || {
          let c = Arc::clone(&c);
          async move {
            c.fetch_add(1, Ordering::SeqCst);
            Ok::<_, AggregatorError>(7)
          }
        },
        TRANSIENT,
      )
      .await;
    assert_eq!(result.unwrap(), 7);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_retries_then_succeeds() {
    let calls = Arc::new(AtomicU32::new(0));
    let c = Arc::clone(&calls);
    let result = no_delay(3)
      .execute(
        || {
          let c = Arc::clone(&c);
          async move {
            if c.fetch_add(1, Ordering::SeqCst) < 2 {
              Err(AggregatorError::Transient("flaky".into()))
            } else {
              Ok(42)
            }
          }
        },
        TRANSIENT,
      )
      .await;
    assert_eq!(result.unwrap(), 42);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn test_exhaustion_returns_last_error() {
    let calls = Arc::new(AtomicU32::new(0));
    let c = Arc::clone(&calls);
    let result: Result<(), _> = no_delay(2)
      .execute(
        || {
          let c = Arc::clone(&c);
          async move {
            let n = c.fetch_add(1, Ordering::SeqCst);
            Err(AggregatorError::Transient(format!("failure {n}")))
          }
        },
        TRANSIENT,
      )
      .await;
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(result.unwrap_err(), AggregatorError::Transient("failure 2".into()));
  }

  #[tokio::test]
  async fn test_non_retryable_attempted_once() {
    let calls = Arc::new(AtomicU32::new(0));
    let c = Arc::clone(&calls);
    let result: Result<(), _> = no_delay(5)
      .execute(
        || {
          let c = Arc::clone(&c);
          async move {
            c.fetch_add(1, Ordering::SeqCst);
            Err(AggregatorError::Validation("bad body".into()))
          }
        },
        TRANSIENT,
      )
      .await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(matches!(result, Err(AggregatorError::Validation(_))));
  }

  #[tokio::test]
  async fn test_zero_retries_single_attempt() {
    let calls = Arc::new(AtomicU32::new(0));
    let c = Arc::clone(&calls);
    let result: Result<(), _> = no_delay(0)
      .execute(
        || {
          let c = Arc::clone(&c);
          async move {
            c.fetch_add(1, Ordering::SeqCst);
            Err(AggregatorError::Transient("down".into()))
          }
        },
        TRANSIENT,
      )
      .await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(result.is_err());
  }
}
