//! Order placement.
//!
//! Validates a cart against the merged catalog, reserves stock in the local
//! inventory overlay, prices the order and records a synthetic captured
//! payment. Stock is reserved all-or-nothing: every line is checked before
//! any row is touched.

use chrono::Utc;
use rand::Rng;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, instrument};

use kranes_core::{
    AddressId, CardId, CurrencyCode, InventoryRecord, OrderId, OrderItemRecord, OrderRecord,
    OrderStatus, OrderTotals, PaymentProvider, PaymentRecord, PaymentStatus, Product, ProductId,
    UserId,
};

use crate::catalog::{CatalogError, CatalogService, merge_catalog};
use crate::db::{RepositoryError, Store};

/// Length of the random part of a transaction id.
const TRANSACTION_ID_LENGTH: usize = 12;

/// Errors that can occur when placing an order.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The cart is empty or has a zero quantity.
    #[error("Invalid order payload")]
    InvalidPayload,

    /// Prices times quantities do not fit a decimal.
    #[error("Order total is too large")]
    TotalOutOfRange,

    /// The user does not exist anymore.
    #[error("User not found")]
    UserNotFound,

    /// Address or card is not one of the user's saved entries.
    #[error("Select a valid saved address and card")]
    InvalidSelection,

    /// A line refers to a product that is not in the catalog.
    #[error("Product {0} not found")]
    ProductNotFound(ProductId),

    /// Not enough stock for a line.
    #[error("Insufficient stock for {0}")]
    InsufficientStock(String),

    /// The catalog could not be read.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Local state could not be read or written.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// One requested cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct OrderLine {
    pub id: ProductId,
    pub quantity: u32,
}

/// A checkout request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrder {
    pub items: Vec<OrderLine>,
    pub address_id: AddressId,
    pub card_id: CardId,
}

/// Order placement service.
pub struct OrderService<'a> {
    store: &'a Store,
    catalog: &'a CatalogService,
}

impl<'a> OrderService<'a> {
    /// Create a new order service.
    #[must_use]
    pub const fn new(store: &'a Store, catalog: &'a CatalogService) -> Self {
        Self { store, catalog }
    }

    /// Place an order for `user_id`.
    ///
    /// On success the order and the updated inventory are persisted and the
    /// catalog query cache is cleared.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidSelection` if the address or card is not
    /// saved on the account, `OrderError::ProductNotFound` or
    /// `OrderError::InsufficientStock` if a line cannot be fulfilled, and
    /// `OrderError::Catalog` if the remote catalog is unavailable.
    #[instrument(skip(self, request), fields(lines = request.items.len()))]
    pub async fn place_order(
        &self,
        user_id: &UserId,
        request: &PlaceOrder,
    ) -> Result<OrderRecord, OrderError> {
        if request.items.is_empty() || request.items.iter().any(|line| line.quantity == 0) {
            return Err(OrderError::InvalidPayload);
        }

        // The remote feed can be slow; fetch it before blocking other writers.
        let remote = self.catalog.remote().fetch_products().await?;

        let _guard = self.store.lock().await;
        let records = self.store.records();

        let users = records.users().await?;
        let user = users
            .iter()
            .find(|user| &user.id == user_id)
            .ok_or(OrderError::UserNotFound)?;

        let (Some(address), Some(card)) =
            (user.address(&request.address_id), user.card(&request.card_id))
        else {
            return Err(OrderError::InvalidSelection);
        };

        let mut inventory = records.products().await?;
        let catalog = merge_catalog(remote.as_ref().clone(), &inventory);
        let items = reserve_stock(&catalog, &mut inventory, &request.items)?;

        let totals = OrderTotals::from_lines(items.iter().map(|item| (item.price, item.quantity)))
            .ok_or(OrderError::TotalOutOfRange)?;
        let now = Utc::now();
        let order = OrderRecord {
            id: OrderId::generate(),
            user_id: user.id.clone(),
            items,
            subtotal: totals.subtotal,
            tax: totals.tax,
            shipping: totals.shipping,
            total: totals.total,
            status: OrderStatus::Processing,
            shipping_address: address.clone(),
            payment: PaymentRecord {
                provider: PaymentProvider::Stripe,
                status: PaymentStatus::Captured,
                transaction_id: transaction_id(),
                amount: totals.total,
                currency: CurrencyCode::USD,
                card_last4: card.last4.clone(),
            },
            created_at: now,
            updated_at: now,
        };

        let mut orders = records.orders().await?;
        orders.push(order.clone());
        records.save_orders(&orders).await?;
        records.save_products(&inventory).await?;
        self.catalog.invalidate_queries();

        info!(order_id = %order.id, total = %order.total, "Order placed");
        Ok(order)
    }
}

/// Check every line against `catalog`, then decrement stock in `inventory`.
///
/// Quantities of repeated product ids are summed before the check. Remote
/// products without a local row are materialized from their catalog entry.
/// On error `inventory` is left untouched.
fn reserve_stock(
    catalog: &[Product],
    inventory: &mut Vec<InventoryRecord>,
    lines: &[OrderLine],
) -> Result<Vec<OrderItemRecord>, OrderError> {
    let mut demand: Vec<(&Product, u32)> = Vec::new();
    for line in lines {
        let product = catalog
            .iter()
            .find(|product| product.id == line.id)
            .ok_or(OrderError::ProductNotFound(line.id))?;

        match demand.iter_mut().find(|(seen, _)| seen.id == line.id) {
            Some((_, quantity)) => *quantity = quantity.saturating_add(line.quantity),
            None => demand.push((product, line.quantity)),
        }
    }

    if let Some((product, _)) = demand
        .iter()
        .find(|(product, quantity)| product.stock < *quantity)
    {
        return Err(OrderError::InsufficientStock(product.title.clone()));
    }

    for (product, quantity) in &demand {
        match inventory.iter_mut().find(|row| row.id() == product.id) {
            Some(row) => row.product.stock -= quantity,
            None => {
                let mut row = InventoryRecord::active((*product).clone());
                row.product.stock -= quantity;
                inventory.push(row);
            }
        }
    }

    Ok(lines
        .iter()
        .filter_map(|line| {
            catalog
                .iter()
                .find(|product| product.id == line.id)
                .map(|product| OrderItemRecord {
                    product_id: product.id,
                    title: product.title.clone(),
                    price: product.price,
                    quantity: line.quantity,
                })
        })
        .collect())
}

/// `txn_` followed by random lowercase alphanumerics.
fn transaction_id() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..TRANSACTION_ID_LENGTH)
        .filter_map(|_| char::from_digit(rng.random_range(0..36), 36))
        .collect();
    format!("txn_{suffix}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use kranes_core::Rating;

    use super::*;

    fn product(id: i64, title: &str, price: &str, stock: u32) -> Product {
        Product {
            id: ProductId::new(id),
            title: title.to_string(),
            price: price.parse().unwrap(),
            description: format!("{title} description"),
            category: "electronics".to_string(),
            image: format!("https://example.com/{id}.jpg"),
            rating: Rating {
                rate: 4.0,
                count: 10,
            },
            stock,
            sku: Product::default_sku(ProductId::new(id)),
            is_custom: false,
        }
    }

    fn line(id: i64, quantity: u32) -> OrderLine {
        OrderLine {
            id: ProductId::new(id),
            quantity,
        }
    }

    #[test]
    fn test_reserve_materializes_remote_rows() {
        let catalog = vec![product(1, "Backpack", "109.95", 120)];
        let mut inventory = Vec::new();

        let items = reserve_stock(&catalog, &mut inventory, &[line(1, 2)]).unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Backpack");
        assert_eq!(items[0].quantity, 2);
        assert_eq!(inventory.len(), 1);
        assert_eq!(inventory[0].product.stock, 118);
        assert_eq!(inventory[0].product.sku, "FS-0001");
    }

    #[test]
    fn test_reserve_decrements_existing_row() {
        let catalog = vec![product(1, "Backpack", "10", 5)];
        let mut inventory = vec![InventoryRecord::active(product(1, "Backpack", "10", 5))];

        reserve_stock(&catalog, &mut inventory, &[line(1, 5)]).unwrap();

        assert_eq!(inventory.len(), 1);
        assert_eq!(inventory[0].product.stock, 0);
    }

    #[test]
    fn test_reserve_is_all_or_nothing() {
        let catalog = vec![
            product(1, "Backpack", "10", 50),
            product(2, "Jacket", "20", 1),
        ];
        let mut inventory = vec![InventoryRecord::active(product(1, "Backpack", "10", 50))];
        let before = inventory.clone();

        let err = reserve_stock(&catalog, &mut inventory, &[line(1, 3), line(2, 2)]).unwrap_err();

        assert!(matches!(err, OrderError::InsufficientStock(ref title) if title == "Jacket"));
        assert_eq!(inventory, before);
    }

    #[test]
    fn test_repeated_lines_share_stock() {
        let catalog = vec![product(1, "Backpack", "10", 3)];
        let mut inventory = Vec::new();

        let err = reserve_stock(&catalog, &mut inventory, &[line(1, 2), line(1, 2)]).unwrap_err();
        assert!(matches!(err, OrderError::InsufficientStock(_)));
        assert!(inventory.is_empty());

        let items = reserve_stock(&catalog, &mut inventory, &[line(1, 1), line(1, 2)]).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(inventory[0].product.stock, 0);
    }

    #[test]
    fn test_unknown_product() {
        let catalog = vec![product(1, "Backpack", "10", 3)];
        let mut inventory = Vec::new();

        let err = reserve_stock(&catalog, &mut inventory, &[line(99, 1)]).unwrap_err();

        assert_eq!(err.to_string(), "Product 99 not found");
        assert!(inventory.is_empty());
    }

    #[test]
    fn test_transaction_id_shape() {
        let id = transaction_id();

        assert!(id.starts_with("txn_"));
        assert_eq!(id.len(), 4 + TRANSACTION_ID_LENGTH);
        assert!(id.chars().skip(4).all(|c| c.is_ascii_alphanumeric()));
    }
}
