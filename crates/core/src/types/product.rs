//! Catalog product types.
//!
//! A [`Product`] is what shoppers see: remote catalog display fields merged
//! with local inventory. An [`InventoryRecord`] is a row of the local overlay
//! as it is persisted, carrying a [`Listing`] state on top of the product.
//! Only active rows can become catalog products, so archived rows can never
//! leak into reads.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::ProductId;

/// Stock assumed for a remote product that has no local inventory row yet.
pub const DEFAULT_REMOTE_STOCK: u32 = 120;

/// Review count at which a product counts as popular.
pub const POPULAR_REVIEW_THRESHOLD: u32 = 120;

/// Average rating and number of reviews.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Rating {
    /// Average score, 0 to 5.
    pub rate: f64,
    /// Number of reviews.
    pub count: u32,
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub description: String,
    pub category: String,
    pub image: String,
    #[serde(default)]
    pub rating: Rating,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub sku: String,
    /// True for products authored in this store, false for remote ones.
    #[serde(default)]
    pub is_custom: bool,
}

impl Product {
    /// SKU synthesized for remote products: `FS-` plus the id padded to 4 digits.
    #[must_use]
    pub fn default_sku(id: ProductId) -> String {
        format!("FS-{:04}", id.as_i64())
    }

    /// SKU assigned to products created through the admin API.
    #[must_use]
    pub fn custom_sku(id: ProductId) -> String {
        format!("ADM-{:06}", id.as_i64())
    }

    /// Default "featured" ranking score: `rate * 2 + count / 10`.
    #[must_use]
    pub fn featured_score(&self) -> f64 {
        self.rating.rate.mul_add(2.0, f64::from(self.rating.count) / 10.0)
    }

    /// Whether the product has enough reviews to count as popular.
    #[must_use]
    pub const fn is_popular(&self) -> bool {
        self.rating.count >= POPULAR_REVIEW_THRESHOLD
    }

    /// Where the product comes from.
    #[must_use]
    pub const fn source(&self) -> ProductSource {
        if self.is_custom {
            ProductSource::Custom
        } else {
            ProductSource::Fakestore
        }
    }
}

/// Origin of a catalog product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSource {
    /// Remote catalog feed.
    Fakestore,
    /// Created through the admin API.
    Custom,
}

/// Listing state of a stored inventory row.
///
/// Persisted as the `isArchived` boolean for compatibility with existing
/// data files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "bool", into = "bool")]
pub enum Listing {
    #[default]
    Active,
    /// Soft-deleted: hidden from every catalog read, kept for history.
    Archived,
}

impl From<bool> for Listing {
    fn from(archived: bool) -> Self {
        if archived { Self::Archived } else { Self::Active }
    }
}

impl From<Listing> for bool {
    fn from(listing: Listing) -> Self {
        matches!(listing, Listing::Archived)
    }
}

/// A row of the local inventory overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryRecord {
    #[serde(flatten)]
    pub product: Product,
    #[serde(rename = "isArchived", default)]
    pub listing: Listing,
}

impl InventoryRecord {
    /// Wrap a product as an active inventory row.
    #[must_use]
    pub const fn active(product: Product) -> Self {
        Self {
            product,
            listing: Listing::Active,
        }
    }

    /// The row's product id.
    #[must_use]
    pub const fn id(&self) -> ProductId {
        self.product.id
    }

    /// Whether the row is visible in the catalog.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.listing, Listing::Active)
    }

    /// The product, if the row is active.
    #[must_use]
    pub const fn as_active(&self) -> Option<&Product> {
        match self.listing {
            Listing::Active => Some(&self.product),
            Listing::Archived => None,
        }
    }

    /// Consume the row, returning the product only if it is active.
    #[must_use]
    pub fn into_active(self) -> Option<Product> {
        match self.listing {
            Listing::Active => Some(self.product),
            Listing::Archived => None,
        }
    }
}
