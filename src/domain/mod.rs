//! Domain layer - Core pricing model.
//!
//! Pure types and rules for price aggregation: quotes, source formats,
//! persisted lowest prices, round results and the error taxonomy.
//! No I/O here (hexagonal architecture inner ring).

pub mod aggregation;
pub mod error;
pub mod product_price;
pub mod quote;
pub mod source;

// Re-export core types for convenience
pub use aggregation::{AggregationResult, PriceResponse, SourceFailure};
pub use error::{AggregatorError, ErrorKind};
pub use product_price::{ProductPrice, select_lowest};
pub use quote::Quote;
pub use source::{RawQuote, ResponseFormat, SourceDescriptor};
