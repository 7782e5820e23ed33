//! Checkout handler.

use axum::{Json, extract::State, http::StatusCode};

use kranes_core::OrderRecord;

use crate::error::Result;
use crate::middleware::{RequireAuth, ValidJson};
use crate::services::orders::PlaceOrder;
use crate::state::AppState;

/// Place an order with a saved address and card.
///
/// POST /api/orders
///
/// # Errors
///
/// Returns 400 for an invalid cart, unknown product, unsaved address or
/// card, or insufficient stock, and 502 if the catalog is unavailable.
pub async fn place(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ValidJson(order): ValidJson<PlaceOrder>,
) -> Result<(StatusCode, Json<OrderRecord>)> {
    let order = state.orders().place_order(&user.id, &order).await?;
    Ok((StatusCode::CREATED, Json(order)))
}
