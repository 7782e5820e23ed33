//! Wire types of the remote catalog API.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use kranes_core::{Product, ProductId, Rating};

/// A product as returned by `GET {base_url}/products`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawProduct {
    pub id: ProductId,
    pub title: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub rating: Rating,
}

impl RawProduct {
    /// Catalog product for a remote entry with no local inventory row.
    #[must_use]
    pub fn into_product(self) -> Product {
        Product {
            sku: Product::default_sku(self.id),
            id: self.id,
            title: self.title,
            price: self.price,
            description: self.description,
            category: self.category,
            image: self.image,
            rating: self.rating,
            stock: kranes_core::DEFAULT_REMOTE_STOCK,
            is_custom: false,
        }
    }
}
