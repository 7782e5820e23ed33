//! Core types for Kranes Market.
//!
//! This module provides type-safe wrappers for common domain concepts and
//! the record shapes persisted by the record store.

pub mod account;
pub mod analytics;
pub mod email;
pub mod id;
pub mod order;
pub mod price;
pub mod product;
pub mod status;

pub use account::{
    AddressRecord, CardBrand, CardRecord, NewAddress, NewCard, PublicUser, UserRecord,
};
pub use analytics::{ANALYTICS_EVENT_CAP, AnalyticsEvent};
pub use email::{Email, EmailError};
pub use id::*;
pub use order::{OrderItemRecord, OrderRecord, PaymentRecord, ReturnRecord, StageProgress};
pub use price::{CurrencyCode, OrderTotals};
pub use product::{
    DEFAULT_REMOTE_STOCK, InventoryRecord, Listing, POPULAR_REVIEW_THRESHOLD, Product,
    ProductSource, Rating,
};
pub use status::*;
