//! Store administration: catalog management, fulfillment and reporting.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument};

use kranes_core::{
    InventoryRecord, Listing, OrderId, OrderRecord, OrderStatus, Product, ProductId,
    ProductSource, Rating, ReturnId, ReturnRecord, ReturnStatus,
};

use crate::catalog::{CatalogError, CatalogService, merge_catalog};
use crate::db::{RepositoryError, Store};

/// Custom product ids start right after this value.
const CUSTOM_ID_FLOOR: i64 = 100_000;

/// Rating given to newly created products.
const NEW_PRODUCT_RATING: Rating = Rating {
    rate: 4.5,
    count: 0,
};

/// Errors that can occur in admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Product is not in the merged catalog.
    #[error("Product not found")]
    ProductNotFound,

    /// Product has no row in the local inventory overlay.
    #[error("Product not found in local managed catalog")]
    ProductNotManaged,

    #[error("Order not found")]
    OrderNotFound,

    #[error("Return not found")]
    ReturnNotFound,

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Store-wide counters.
#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    pub products: usize,
    pub orders: usize,
    pub returns: usize,
    pub users: usize,
    #[serde(with = "rust_decimal::serde::float")]
    pub revenue: Decimal,
}

/// A new custom product.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewProduct {
    pub title: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub description: String,
    pub category: String,
    pub image: String,
    pub stock: u32,
}

/// Partial product update. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    pub title: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub price: Option<Decimal>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub image: Option<String>,
    pub stock: Option<u32>,
    pub is_archived: Option<bool>,
}

impl ProductPatch {
    fn apply(self, row: &mut InventoryRecord) {
        let product = &mut row.product;
        if let Some(title) = self.title {
            product.title = title;
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(description) = self.description {
            product.description = description;
        }
        if let Some(category) = self.category {
            product.category = category;
        }
        if let Some(image) = self.image {
            product.image = image;
        }
        if let Some(stock) = self.stock {
            product.stock = stock;
        }
        if let Some(archived) = self.is_archived {
            row.listing = Listing::from(archived);
        }
    }
}

/// Row of the admin inventory listing.
#[derive(Debug, Clone, Serialize)]
pub struct InventoryItem {
    pub id: ProductId,
    pub title: String,
    pub sku: String,
    pub stock: u32,
    pub category: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub source: ProductSource,
}

impl From<Product> for InventoryItem {
    fn from(product: Product) -> Self {
        Self {
            source: product.source(),
            id: product.id,
            title: product.title,
            sku: product.sku,
            stock: product.stock,
            category: product.category,
            price: product.price,
        }
    }
}

/// Stock level after an inventory edit.
#[derive(Debug, Clone, Serialize)]
pub struct StockLevel {
    pub id: ProductId,
    pub stock: u32,
    pub sku: String,
}

/// Admin service.
pub struct AdminService<'a> {
    store: &'a Store,
    catalog: &'a CatalogService,
}

impl<'a> AdminService<'a> {
    #[must_use]
    pub const fn new(store: &'a Store, catalog: &'a CatalogService) -> Self {
        Self { store, catalog }
    }

    /// Counts of products, orders, returns and users plus total revenue.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog or store cannot be read.
    pub async fn overview(&self) -> Result<Overview, AdminError> {
        let records = self.store.records();
        let products = self.catalog.merged().await?.len();
        let orders = records.orders().await?;

        Ok(Overview {
            products,
            revenue: orders.iter().map(|order| order.total).sum(),
            orders: orders.len(),
            returns: records.returns().await?.len(),
            users: records.users().await?.len(),
        })
    }

    /// The merged catalog, active products only.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be read.
    pub async fn products(&self) -> Result<Vec<Product>, AdminError> {
        Ok(self.catalog.merged().await?)
    }

    /// Create a custom product with the next free id.
    ///
    /// # Errors
    ///
    /// Returns an error if the inventory cannot be read or written.
    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create_product(&self, input: NewProduct) -> Result<Product, AdminError> {
        let _guard = self.store.lock().await;
        let records = self.store.records();

        let mut inventory = records.products().await?;
        let id = ProductId::new(next_custom_id(&inventory));
        let product = Product {
            id,
            title: input.title,
            price: input.price,
            description: input.description,
            category: input.category,
            image: input.image,
            rating: NEW_PRODUCT_RATING,
            stock: input.stock,
            sku: Product::custom_sku(id),
            is_custom: true,
        };

        inventory.push(InventoryRecord::active(product.clone()));
        records.save_products(&inventory).await?;
        self.catalog.invalidate_queries();

        info!(product_id = %id, "Custom product created");
        Ok(product)
    }

    /// Apply a partial update, materializing a remote product if needed.
    ///
    /// Returns the stored row, archived or not.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::ProductNotFound` if the id has no local row and
    /// is not in the merged catalog.
    #[instrument(skip(self, patch))]
    pub async fn update_product(
        &self,
        id: ProductId,
        patch: ProductPatch,
    ) -> Result<InventoryRecord, AdminError> {
        self.edit_row(id, |row| patch.apply(row)).await
    }

    /// Remove a custom product, or archive a remote one.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::ProductNotManaged` if there is no local row.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: ProductId) -> Result<(), AdminError> {
        let _guard = self.store.lock().await;
        let records = self.store.records();

        let mut inventory = records.products().await?;
        let row = inventory
            .iter_mut()
            .find(|row| row.id() == id)
            .ok_or(AdminError::ProductNotManaged)?;

        if row.product.is_custom {
            inventory.retain(|row| row.id() != id);
            info!(product_id = %id, "Custom product removed");
        } else {
            row.listing = Listing::Archived;
            info!(product_id = %id, "Product archived");
        }

        records.save_products(&inventory).await?;
        self.catalog.invalidate_queries();
        Ok(())
    }

    /// Every order, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if orders cannot be read.
    pub async fn orders(&self) -> Result<Vec<OrderRecord>, AdminError> {
        let mut orders = self.store.records().orders().await?;
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    /// Every return request, in storage order.
    ///
    /// # Errors
    ///
    /// Returns an error if returns cannot be read.
    pub async fn returns(&self) -> Result<Vec<ReturnRecord>, AdminError> {
        Ok(self.store.records().returns().await?)
    }

    /// Move an order to any stage.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::OrderNotFound` if the order does not exist.
    #[instrument(skip(self))]
    pub async fn set_order_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
    ) -> Result<OrderRecord, AdminError> {
        let _guard = self.store.lock().await;
        let records = self.store.records();

        let mut orders = records.orders().await?;
        let order = orders
            .iter_mut()
            .find(|order| &order.id == id)
            .ok_or(AdminError::OrderNotFound)?;
        order.set_status(status);
        let updated = order.clone();

        records.save_orders(&orders).await?;
        Ok(updated)
    }

    /// Set a return request's status.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::ReturnNotFound` if the request does not exist.
    #[instrument(skip(self))]
    pub async fn set_return_status(
        &self,
        id: &ReturnId,
        status: ReturnStatus,
    ) -> Result<ReturnRecord, AdminError> {
        let _guard = self.store.lock().await;
        let records = self.store.records();

        let mut returns = records.returns().await?;
        let entry = returns
            .iter_mut()
            .find(|entry| &entry.id == id)
            .ok_or(AdminError::ReturnNotFound)?;
        entry.status = status;
        let updated = entry.clone();

        records.save_returns(&returns).await?;
        Ok(updated)
    }

    /// Stock levels for every active product.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be read.
    pub async fn inventory(&self) -> Result<Vec<InventoryItem>, AdminError> {
        Ok(self
            .catalog
            .merged()
            .await?
            .into_iter()
            .map(InventoryItem::from)
            .collect())
    }

    /// Overwrite a product's stock level.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::ProductNotFound` if the id has no local row and
    /// is not in the merged catalog.
    #[instrument(skip(self))]
    pub async fn set_stock(&self, id: ProductId, stock: u32) -> Result<StockLevel, AdminError> {
        let row = self
            .edit_row(id, |row| row.product.stock = stock)
            .await?;

        Ok(StockLevel {
            id: row.id(),
            stock: row.product.stock,
            sku: row.product.sku,
        })
    }

    /// Edit a local inventory row, creating it from the merged catalog first
    /// if the product has never been stored locally.
    async fn edit_row(
        &self,
        id: ProductId,
        edit: impl FnOnce(&mut InventoryRecord) + Send,
    ) -> Result<InventoryRecord, AdminError> {
        let records = self.store.records();
        let stored = |inventory: &[InventoryRecord]| inventory.iter().any(|row| row.id() == id);

        // Materializing needs the remote feed; fetch it before blocking other writers.
        let remote = if stored(&records.products().await?) {
            None
        } else {
            Some(self.catalog.remote().fetch_products().await?)
        };

        let _guard = self.store.lock().await;
        let mut inventory = records.products().await?;
        if !stored(&inventory) {
            let feed = match remote {
                Some(feed) => feed,
                None => self.catalog.remote().fetch_products().await?,
            };
            let product = merge_catalog(feed.as_ref().clone(), &inventory)
                .into_iter()
                .find(|product| product.id == id)
                .ok_or(AdminError::ProductNotFound)?;
            inventory.push(InventoryRecord::active(product));
        }

        let row = inventory
            .iter_mut()
            .find(|row| row.id() == id)
            .ok_or(AdminError::ProductNotFound)?;
        edit(row);
        let updated = row.clone();

        records.save_products(&inventory).await?;
        self.catalog.invalidate_queries();
        Ok(updated)
    }
}

/// `max(100000, highest local id) + 1`.
fn next_custom_id(inventory: &[InventoryRecord]) -> i64 {
    inventory
        .iter()
        .map(|row| row.id().as_i64())
        .fold(CUSTOM_ID_FLOOR, i64::max)
        + 1
}
