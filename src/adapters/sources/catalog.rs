//! Static Source Catalog - Descriptors from Configuration

use async_trait::async_trait;

use crate::domain::source::SourceDescriptor;
use crate::ports::source_catalog::SourceCatalog;

/// Catalog fixed at startup, in configured order.
#[derive(Debug, Clone, Default)]
pub struct StaticSourceCatalog {
    sources: Vec<SourceDescriptor>,
}

impl StaticSourceCatalog {
    pub fn new(sources: Vec<SourceDescriptor>) -> Self {
        Self { sources }
    }
}

#[async_trait]
impl SourceCatalog for StaticSourceCatalog {
    async fn find_all_active(&self) -> anyhow::Result<Vec<SourceDescriptor>> {
        Ok(self.sources.iter().filter(|s| s.is_active).cloned().collect())
    }

    async fn find_all(&self) -> anyhow::Result<Vec<SourceDescriptor>> {
        Ok(self.sources.clone())
    }
}
