//! HTTP route handlers.
//!
//! # Route Structure
//!
//! Everything is nested under `/api`:
//!
//! ```text
//! GET    /health                        - Health check
//!
//! # Catalog
//! GET    /products                      - Filtered, sorted, paginated catalog
//! GET    /products/meta/categories      - Distinct categories
//! GET    /products/{id}                 - Product detail
//! GET    /inventory/{productId}         - Stock level
//!
//! # Auth
//! POST   /auth/register                 - Create a customer account
//! POST   /auth/login                    - Exchange credentials for a token
//! GET    /auth/me                       - Current user (bearer)
//!
//! # Account (bearer)
//! GET    /account/addresses             - Saved addresses
//! POST   /account/addresses             - Add address
//! DELETE /account/addresses/{id}        - Remove address
//! GET    /account/cards                 - Saved cards
//! POST   /account/cards                 - Add card
//! DELETE /account/cards/{id}            - Remove card
//! GET    /account/orders                - Order history
//! GET    /account/tracking/{orderId}    - Order tracking timeline
//! GET    /account/returns               - Return requests
//! POST   /account/returns               - Request a return
//! POST   /orders                        - Place an order
//!
//! # Admin (bearer, admin role)
//! GET    /admin/overview                - Store counters
//! GET    /admin/products                - Merged catalog
//! POST   /admin/products                - Create custom product
//! PATCH  /admin/products/{id}           - Update product
//! DELETE /admin/products/{id}           - Remove or archive product
//! GET    /admin/orders                  - All orders
//! PATCH  /admin/orders/{id}/status      - Set order status
//! GET    /admin/returns                 - All returns
//! PATCH  /admin/returns/{id}/status     - Set return status
//! GET    /admin/inventory               - Stock levels
//! PATCH  /admin/inventory/{productId}   - Set stock
//! GET    /admin/analytics               - Event dashboard
//!
//! # Analytics
//! POST   /analytics/events              - Record an event (optional bearer)
//! GET    /analytics/summary             - Event totals
//! GET    /experiments                   - A/B variant assignment
//! ```

pub mod account;
pub mod admin;
pub mod analytics;
pub mod auth;
pub mod orders;
pub mod products;

use axum::{
    Router,
    routing::{delete, get, patch, post},
};

use kranes_core::ProductId;

use crate::error::{AppError, Result};
use crate::state::AppState;

/// All `/api` routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(products::health))
        .route("/products", get(products::list))
        .route("/products/meta/categories", get(products::categories))
        .route("/products/{id}", get(products::show))
        .route("/inventory/{product_id}", get(products::inventory))
        .nest("/auth", auth_routes())
        .nest("/account", account_routes())
        .route("/orders", post(orders::place))
        .nest("/admin", admin_routes())
        .route("/analytics/events", post(analytics::track))
        .route("/analytics/summary", get(analytics::summary))
        .route("/experiments", get(analytics::experiments))
        .fallback(not_found)
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/me", get(auth::me))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/addresses",
            get(account::addresses).post(account::add_address),
        )
        .route("/addresses/{id}", delete(account::remove_address))
        .route("/cards", get(account::cards).post(account::add_card))
        .route("/cards/{id}", delete(account::remove_card))
        .route("/orders", get(account::orders))
        .route("/tracking/{order_id}", get(account::tracking))
        .route(
            "/returns",
            get(account::returns).post(account::request_return),
        )
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/overview", get(admin::overview))
        .route(
            "/products",
            get(admin::products).post(admin::create_product),
        )
        .route(
            "/products/{id}",
            patch(admin::update_product).delete(admin::delete_product),
        )
        .route("/orders", get(admin::orders))
        .route("/orders/{id}/status", patch(admin::set_order_status))
        .route("/returns", get(admin::returns))
        .route("/returns/{id}/status", patch(admin::set_return_status))
        .route("/inventory", get(admin::inventory))
        .route("/inventory/{product_id}", patch(admin::set_stock))
        .route("/analytics", get(admin::analytics))
}

/// Fallback for unknown `/api` paths.
async fn not_found() -> AppError {
    AppError::NotFound("API route not found".to_string())
}

/// Parse a product id path segment. Anything unparseable is treated as an
/// unknown product.
fn product_id(raw: &str, not_found: &str) -> Result<ProductId> {
    raw.parse()
        .map_err(|_| AppError::NotFound(not_found.to_string()))
}
