//! Inventory inspection commands.

use std::path::Path;

use kranes_api::db::{JsonFileStore, RecordStore, RepositoryError};
use kranes_core::InventoryRecord;

/// Log every locally stored inventory row.
///
/// Only rows in `products.json` are shown: remote products that were never
/// edited or ordered have no local row yet.
pub async fn list(data_dir: &Path) -> Result<Vec<InventoryRecord>, RepositoryError> {
    let rows = JsonFileStore::new(data_dir).products().await?;

    if rows.is_empty() {
        tracing::info!("No locally managed inventory");
    }

    for row in &rows {
        tracing::info!(
            "{:>7}  {:<12} stock {:>5}  {}{}",
            row.id(),
            row.product.sku,
            row.product.stock,
            row.product.title,
            if row.is_active() { "" } else { "  [archived]" }
        );
    }

    Ok(rows)
}
