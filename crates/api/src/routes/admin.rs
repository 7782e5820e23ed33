//! Admin route handlers. Every handler requires an admin token.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

use kranes_core::{
    InventoryRecord, OrderId, OrderRecord, OrderStatus, Product, ReturnId, ReturnRecord,
    ReturnStatus,
};

use crate::error::Result;
use crate::middleware::{RequireAdmin, ValidJson, Validate};
use crate::services::admin::{InventoryItem, NewProduct, Overview, ProductPatch, StockLevel};
use crate::services::analytics::AnalyticsDashboard;
use crate::state::AppState;

use super::product_id;

/// Status change form. Unknown statuses fail to deserialize.
#[derive(Debug, Deserialize)]
pub struct StatusUpdate<T> {
    pub status: T,
}

impl Validate for StatusUpdate<OrderStatus> {
    const REJECTION: &'static str = "Invalid order status payload";

    fn is_valid(&self) -> bool {
        true
    }
}

impl Validate for StatusUpdate<ReturnStatus> {
    const REJECTION: &'static str = "Invalid return status payload";

    fn is_valid(&self) -> bool {
        true
    }
}

/// Stock edit form. Negative and fractional values fail to deserialize.
#[derive(Debug, Deserialize)]
pub struct StockUpdate {
    pub stock: u32,
}

impl Validate for StockUpdate {
    const REJECTION: &'static str = "Invalid inventory payload";

    fn is_valid(&self) -> bool {
        true
    }
}

/// GET /api/admin/overview
///
/// # Errors
///
/// Returns 502 if the catalog is unavailable.
pub async fn overview(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
) -> Result<Json<Overview>> {
    Ok(Json(state.admin().overview().await?))
}

/// GET /api/admin/products
///
/// # Errors
///
/// Returns 502 if the catalog is unavailable.
pub async fn products(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
) -> Result<Json<Vec<Product>>> {
    Ok(Json(state.admin().products().await?))
}

/// POST /api/admin/products
///
/// # Errors
///
/// Returns 400 for an invalid product.
pub async fn create_product(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    ValidJson(input): ValidJson<NewProduct>,
) -> Result<(StatusCode, Json<Product>)> {
    let product = state.admin().create_product(input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// PATCH /api/admin/products/{id}
///
/// # Errors
///
/// Returns 404 if the product is neither stored locally nor in the catalog.
pub async fn update_product(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(id): Path<String>,
    ValidJson(patch): ValidJson<ProductPatch>,
) -> Result<Json<InventoryRecord>> {
    let id = product_id(&id, "Product not found")?;
    Ok(Json(state.admin().update_product(id, patch).await?))
}

/// DELETE /api/admin/products/{id}
///
/// # Errors
///
/// Returns 404 if the product has no local row.
pub async fn delete_product(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let id = product_id(&id, "Product not found in local managed catalog")?;
    state.admin().delete_product(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// All orders, newest first.
///
/// GET /api/admin/orders
///
/// # Errors
///
/// Returns 500 if orders cannot be read.
pub async fn orders(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
) -> Result<Json<Vec<OrderRecord>>> {
    Ok(Json(state.admin().orders().await?))
}

/// PATCH /api/admin/orders/{id}/status
///
/// # Errors
///
/// Returns 400 for an unknown status and 404 for an unknown order.
pub async fn set_order_status(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(id): Path<OrderId>,
    ValidJson(update): ValidJson<StatusUpdate<OrderStatus>>,
) -> Result<Json<OrderRecord>> {
    Ok(Json(state.admin().set_order_status(&id, update.status).await?))
}

/// GET /api/admin/returns
///
/// # Errors
///
/// Returns 500 if returns cannot be read.
pub async fn returns(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
) -> Result<Json<Vec<ReturnRecord>>> {
    Ok(Json(state.admin().returns().await?))
}

/// PATCH /api/admin/returns/{id}/status
///
/// # Errors
///
/// Returns 400 for an unknown status and 404 for an unknown return.
pub async fn set_return_status(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(id): Path<ReturnId>,
    ValidJson(update): ValidJson<StatusUpdate<ReturnStatus>>,
) -> Result<Json<ReturnRecord>> {
    Ok(Json(
        state.admin().set_return_status(&id, update.status).await?,
    ))
}

/// GET /api/admin/inventory
///
/// # Errors
///
/// Returns 502 if the catalog is unavailable.
pub async fn inventory(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
) -> Result<Json<Vec<InventoryItem>>> {
    Ok(Json(state.admin().inventory().await?))
}

/// PATCH /api/admin/inventory/{productId}
///
/// # Errors
///
/// Returns 404 if the product is neither stored locally nor in the catalog.
pub async fn set_stock(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(product_id_raw): Path<String>,
    ValidJson(update): ValidJson<StockUpdate>,
) -> Result<Json<StockLevel>> {
    let id = product_id(&product_id_raw, "Product not found")?;
    Ok(Json(state.admin().set_stock(id, update.stock).await?))
}

/// GET /api/admin/analytics
///
/// # Errors
///
/// Returns 500 if the event log cannot be read.
pub async fn analytics(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
) -> Result<Json<AnalyticsDashboard>> {
    Ok(Json(state.analytics().dashboard().await?))
}
