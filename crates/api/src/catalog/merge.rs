//! Merge the remote feed with the local inventory overlay.

use std::collections::{HashMap, HashSet};

use kranes_core::{InventoryRecord, Product, ProductId};

use super::types::RawProduct;

/// Combine remote products with local inventory rows.
///
/// Remote rows come first, in remote order. A local row with the same id
/// takes precedence over every remote field, but the result is always
/// reported as non-custom. Rows with no local counterpart get the default
/// stock and SKU. Local rows without a remote counterpart follow in storage
/// order. Archived rows never appear.
#[must_use]
pub fn merge_catalog(remote: Vec<RawProduct>, local: &[InventoryRecord]) -> Vec<Product> {
    let local_by_id: HashMap<ProductId, &InventoryRecord> =
        local.iter().map(|row| (row.id(), row)).collect();
    let remote_ids: HashSet<ProductId> = remote.iter().map(|raw| raw.id).collect();

    let mut merged: Vec<Product> = remote
        .into_iter()
        .filter_map(|raw| match local_by_id.get(&raw.id) {
            Some(row) => row.as_active().map(|product| overlay(raw.id, product)),
            None => Some(raw.into_product()),
        })
        .collect();

    merged.extend(
        local
            .iter()
            .filter(|row| !remote_ids.contains(&row.id()))
            .filter_map(InventoryRecord::as_active)
            .cloned(),
    );

    merged
}

fn overlay(id: ProductId, local: &Product) -> Product {
    let mut product = local.clone();
    product.id = id;
    product.is_custom = false;
    if product.sku.is_empty() {
        product.sku = Product::default_sku(id);
    }
    product
}
