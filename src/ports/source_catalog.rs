//! Source Catalog Port - Price Source Provisioning Interface
//!
//! Sources are administered outside the core and are read-only to it.

use async_trait::async_trait;

use crate::domain::source::SourceDescriptor;

/// Trait for source descriptor providers.
#[async_trait]
pub trait SourceCatalog: Send + Sync + 'static {
  /// Active sources in configured order.
  async fn find_all_active(&self) -> anyhow::Result<Vec<SourceDescriptor>>;

  /// All sources, active or not.
  async fn find_all(&self) -> anyhow::Result<Vec<SourceDescriptor>>;
}
