//! Catalog route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Serialize;
use serde_json::{Value, json};

use kranes_core::{Product, ProductId};

use crate::catalog::{ProductPage, ProductQueryParams};
use crate::error::{AppError, Result};
use crate::state::AppState;

use super::product_id;

/// Stock level of one product.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryLevel {
    pub product_id: ProductId,
    pub sku: String,
    pub stock: u32,
}

/// Liveness probe.
///
/// GET /api/health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "service": "kranes-api" }))
}

/// Filtered, sorted, paginated catalog.
///
/// GET /api/products
///
/// # Errors
///
/// Returns 502 if the remote catalog is unavailable.
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ProductQueryParams>,
) -> Result<Json<ProductPage>> {
    Ok(Json(state.catalog().query(&params).await?))
}

/// Distinct categories in catalog order.
///
/// GET /api/products/meta/categories
///
/// # Errors
///
/// Returns 502 if the remote catalog is unavailable.
pub async fn categories(State(state): State<AppState>) -> Result<Json<Vec<String>>> {
    Ok(Json(state.catalog().categories().await?))
}

/// Product detail. Archived products are not found.
///
/// GET /api/products/{id}
///
/// # Errors
///
/// Returns 404 for unknown or archived products.
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Product>> {
    let id = product_id(&id, "Product not found")?;
    state
        .catalog()
        .product(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))
}

/// Current stock and SKU.
///
/// GET /api/inventory/{productId}
///
/// # Errors
///
/// Returns 404 for unknown or archived products.
pub async fn inventory(
    State(state): State<AppState>,
    Path(product_id_raw): Path<String>,
) -> Result<Json<InventoryLevel>> {
    let id = product_id(&product_id_raw, "Product not found")?;
    let product = state
        .catalog()
        .product(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    Ok(Json(InventoryLevel {
        product_id: product.id,
        sku: product.sku,
        stock: product.stock,
    }))
}
