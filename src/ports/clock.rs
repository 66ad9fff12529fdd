//! Clock Port - Round Timestamps

use chrono::{DateTime, Utc};

/// Supplies "now" for stamping an aggregation round.
pub trait Clock: Send + Sync + 'static {
  fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> {
    Utc::now()
  }
}
