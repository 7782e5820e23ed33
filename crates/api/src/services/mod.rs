//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Registration, login, token resolution, admin bootstrap
//! - `tokens` - Session token signing and verification
//! - `orders` - Checkout with stock reservation
//! - `account` - Addresses, cards, order history, tracking, returns
//! - `admin` - Catalog management, fulfillment, inventory, reporting
//! - `analytics` - Event log and experiment assignment
//!
//! Services borrow the shared [`Store`](crate::db::Store) and
//! [`CatalogService`](crate::catalog::CatalogService) from application state,
//! so they are cheap to construct per request.

pub mod account;
pub mod admin;
pub mod analytics;
pub mod auth;
pub mod orders;
pub mod tokens;
