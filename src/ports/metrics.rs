//! Metrics Port - Aggregation Observability Sink
//!
//! Use cases report outcomes here; the Prometheus adapter implements it.

/// Outcome label of an aggregation round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOutcome {
  /// Served verbatim from the product cache.
  Cached,
  /// At least one quote, lowest price persisted.
  Priced,
  /// No source produced a quote.
  NoQuotes,
}

impl RoundOutcome {
  pub const fn as_label(self) -> &'static str {
    match self {
      Self::Cached => "cached",
      Self::Priced => "priced",
      Self::NoQuotes => "no_quotes",
    }
  }
}

/// Outcome label of one source within a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
  Quotes,
  Empty,
  Failed,
}

impl FetchOutcome {
  pub const fn as_label(self) -> &'static str {
    match self {
      Self::Quotes => "quotes",
      Self::Empty => "empty",
      Self::Failed => "failed",
    }
  }
}

/// Sink for aggregation metrics. Implementations must not block.
pub trait AggregationMetrics: Send + Sync + 'static {
  fn record_round(&self, outcome: RoundOutcome);

  fn observe_round_duration(&self, outcome: RoundOutcome, seconds: f64);

  fn record_fetch(&self, source: &str, outcome: FetchOutcome);
}
