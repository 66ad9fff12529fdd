//! Aggregation error taxonomy.
//!
//! Every failure raised inside the aggregation pipeline carries an explicit
//! [`ErrorKind`]. The retry executor decides retryability by kind
//! membership, never by inspecting messages or concrete types.

use thiserror::Error;

/// Classification attached to each [`AggregatorError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed quote or raw record. Recovered locally, never retried.
    Validation,
    /// Broken source definition (unknown response format).
    Configuration,
    /// Operational fetch failure (simulated outage, network, deadline).
    Transient,
    /// Cache store failure. Never observed above the cache gateway.
    Cache,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Configuration => write!(f, "configuration"),
            Self::Transient => write!(f, "transient"),
            Self::Cache => write!(f, "cache"),
        }
    }
}

/// Typed failure of the aggregation pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregatorError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("source misconfigured: {0}")]
    Configuration(String),

    #[error("transient source failure: {0}")]
    Transient(String),

    #[error("cache failure: {0}")]
    Cache(String),
}

impl AggregatorError {
    /// Kind used for retry classification.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Transient(_) => ErrorKind::Transient,
            Self::Cache(_) => ErrorKind::Cache,
        }
    }

    /// Whether this failure's kind is in `retryable`.
    pub fn is_retryable(&self, retryable: &[ErrorKind]) -> bool {
        retryable.contains(&self.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_variant() {
        assert_eq!(AggregatorError::Validation("x".into()).kind(), ErrorKind::Validation);
        assert_eq!(AggregatorError::Configuration("x".into()).kind(), ErrorKind::Configuration);
        assert_eq!(AggregatorError::Transient("x".into()).kind(), ErrorKind::Transient);
        assert_eq!(AggregatorError::Cache("x".into()).kind(), ErrorKind::Cache);
    }

    #[test]
    fn test_retryable_membership() {
        let err = AggregatorError::Transient("timeout".into());
        assert!(err.is_retryable(&[ErrorKind::Transient]));
        assert!(!err.is_retryable(&[ErrorKind::Validation]));
        assert!(!err.is_retryable(&[]));
    }

    #[test]
    fn test_display_includes_message() {
        let err = AggregatorError::Configuration("Unknown format: xml".into());
        assert_eq!(err.to_string(), "source misconfigured: Unknown format: xml");
    }
}
