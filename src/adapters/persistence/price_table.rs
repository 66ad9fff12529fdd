//! Price Table Store - Lowest Price per Product
//!
//! Keeps one row per product in memory and, when a data directory is
//! configured, mirrors the table to `prices.json` using atomic writes
//! (write to tmp file, then rename). The file is always either the old or
//! the new table, never a partial write.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use crate::domain::product_price::ProductPrice;
use crate::ports::price_store::PriceStore;

const SNAPSHOT_FILE: &str = "prices.json";

/// Snapshot file locations.
#[derive(Debug, Clone)]
struct SnapshotPaths {
    /// Path to prices.json.
    path: PathBuf,
    /// Temporary path for atomic writes.
    tmp_path: PathBuf,
}

/// Price store keyed by product id.
#[derive(Debug)]
pub struct PriceTableStore {
    table: RwLock<BTreeMap<String, ProductPrice>>,
    snapshot: Option<SnapshotPaths>,
}

impl PriceTableStore {
    /// Volatile store, lost on restart.
    pub fn in_memory() -> Self {
        Self {
            table: RwLock::new(BTreeMap::new()),
            snapshot: None,
        }
    }

    /// Store backed by `<data_dir>/prices.json`.
    ///
    /// Creates the directory if it doesn't exist and loads the previous
    /// snapshot if there is one.
    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let dir = data_dir.as_ref();
        fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create data directory {}", dir.display()))?;

        let snapshot = SnapshotPaths {
            path: dir.join(SNAPSHOT_FILE),
            tmp_path: dir.join(format!("{SNAPSHOT_FILE}.tmp")),
        };
        let table = load_snapshot(&snapshot.path).await?;

        Ok(Self {
            table: RwLock::new(table),
            snapshot: Some(snapshot),
        })
    }

    /// Number of priced products.
    pub async fn len(&self) -> usize {
        self.table.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.table.read().await.is_empty()
    }

    /// Write the table atomically (tmp -> rename). Called with the write
    /// lock held so snapshots land in mutation order. Mutations build the
    /// next table aside and only install it once it is on disk.
    async fn persist(&self, table: &BTreeMap<String, ProductPrice>) -> Result<()> {
        let Some(snapshot) = &self.snapshot else {
            return Ok(());
        };

        let rows: Vec<&ProductPrice> = table.values().collect();
        let json = serde_json::to_string_pretty(&rows).context("Failed to serialize price table")?;

        fs::write(&snapshot.tmp_path, &json)
            .await
            .context("Failed to write tmp price snapshot")?;

        fs::rename(&snapshot.tmp_path, &snapshot.path)
            .await
            .context("Failed to rename price snapshot")?;

        debug!(path = %snapshot.path.display(), rows = rows.len(), "Price snapshot saved");
        Ok(())
    }
}

async fn load_snapshot(path: &Path) -> Result<BTreeMap<String, ProductPrice>> {
    let exists = fs::try_exists(path)
        .await
        .with_context(|| format!("Failed to check price snapshot {}", path.display()))?;
    if !exists {
        info!(path = %path.display(), "No price snapshot found, starting empty");
        return Ok(BTreeMap::new());
    }

    let json = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read price snapshot {}", path.display()))?;
    let rows: Vec<ProductPrice> =
        serde_json::from_str(&json).context("Failed to parse price snapshot JSON")?;

    info!(path = %path.display(), rows = rows.len(), "Price snapshot loaded");

    Ok(rows
        .into_iter()
        .map(|row| (row.product_id.clone(), row))
        .collect())
}

#[async_trait]
impl PriceStore for PriceTableStore {
    #[instrument(skip(self, price), fields(product_id = %price.product_id))]
    async fn save(&self, price: &ProductPrice) -> Result<()> {
        let mut table = self.table.write().await;
        let mut next = table.clone();
        next.insert(price.product_id.clone(), price.clone());
        self.persist(&next).await?;
        *table = next;
        Ok(())
    }

    async fn find_lowest_by_product_id(&self, product_id: &str) -> Result<Option<ProductPrice>> {
        Ok(self.table.read().await.get(product_id).cloned())
    }

    async fn find_all_lowest(&self) -> Result<Vec<ProductPrice>> {
        Ok(self.table.read().await.values().cloned().collect())
    }

    async fn remove_by_product_id(&self, product_id: &str) -> Result<()> {
        let mut table = self.table.write().await;
        if !table.contains_key(product_id) {
            return Ok(());
        }

        let mut next = table.clone();
        next.remove(product_id);
        self.persist(&next).await?;
        *table = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn row(product_id: &str, vendor: &str, price: Decimal) -> ProductPrice {
        ProductPrice {
            product_id: product_id.to_string(),
            vendor_name: vendor.to_string(),
            price,
            fetched_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    #[tokio::test]
    async fn test_one_row_per_product() {
        let store = PriceTableStore::in_memory();
        store.save(&row("123", "ShopB", dec!(17.49))).await.unwrap();
        store.remove_by_product_id("123").await.unwrap();
        store.save(&row("123", "VendorThree", dec!(16.75))).await.unwrap();

        assert_eq!(store.len().await, 1);
        let found = store.find_lowest_by_product_id("123").await.unwrap().unwrap();
        assert_eq!(found.vendor_name, "VendorThree");
    }

    #[tokio::test]
    async fn test_remove_missing_is_ok() {
        let store = PriceTableStore::in_memory();
        store.remove_by_product_id("nope").await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_find_all_ordered_by_product() {
        let store = PriceTableStore::in_memory();
        store.save(&row("456", "B", dec!(31.50))).await.unwrap();
        store.save(&row("123", "A", dec!(16.75))).await.unwrap();

        let all = store.find_all_lowest().await.unwrap();
        let ids: Vec<_> = all.iter().map(|r| r.product_id.as_str()).collect();
        assert_eq!(ids, ["123", "456"]);
    }

    #[tokio::test]
    async fn test_snapshot_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();

        let store = PriceTableStore::open(dir.path()).await.unwrap();
        store.save(&row("789", "VendorFive", dec!(13.99))).await.unwrap();
        store.save(&row("101", "SupplierEta", dec!(40.50))).await.unwrap();
        store.remove_by_product_id("101").await.unwrap();
        drop(store);

        assert!(dir.path().join("prices.json").exists());
        assert!(!dir.path().join("prices.json.tmp").exists());

        let reopened = PriceTableStore::open(dir.path()).await.unwrap();
        assert_eq!(reopened.len().await, 1);
        let found = reopened.find_lowest_by_product_id("789").await.unwrap().unwrap();
        assert_eq!(found.price, dec!(13.99));
    }

    #[tokio::test]
    async fn test_failed_snapshot_keeps_previous_row() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");

        let store = PriceTableStore::open(&data_dir).await.unwrap();
        store.save(&row("123", "Old", dec!(17.49))).await.unwrap();
        std::fs::remove_dir_all(&data_dir).unwrap();

        assert!(store.remove_by_product_id("123").await.is_err());
        let after_remove = store.find_lowest_by_product_id("123").await.unwrap().unwrap();
        assert_eq!(after_remove.vendor_name, "Old");

        assert!(store.save(&row("123", "New", dec!(16.75))).await.is_err());
        let after_save = store.find_lowest_by_product_id("123").await.unwrap().unwrap();
        assert_eq!(after_save.vendor_name, "Old");
        assert_eq!(after_save.price, dec!(17.49));

        assert!(store.save(&row("456", "Other", dec!(31.50))).await.is_err());
        assert_eq!(store.len().await, 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unreadable_data_dir_fails_open() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        PriceTableStore::open(&data_dir)
            .await
            .unwrap()
            .save(&row("123", "ShopB", dec!(17.49)))
            .await
            .unwrap();

        std::fs::set_permissions(&data_dir, std::fs::Permissions::from_mode(0o000)).unwrap();
        // privileged users bypass directory permissions
        let readable = std::fs::metadata(data_dir.join("prices.json")).is_ok();
        let opened = PriceTableStore::open(&data_dir).await;
        std::fs::set_permissions(&data_dir, std::fs::Permissions::from_mode(0o755)).unwrap();

        if !readable {
            assert!(opened.is_err());
        }
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_fails_open() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("prices.json"), "{not json").unwrap();

        assert!(PriceTableStore::open(dir.path()).await.is_err());
    }
}
