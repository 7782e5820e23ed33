//! Account route handlers for the signed-in user.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

use kranes_core::{
    AddressId, AddressRecord, CardId, CardRecord, NewAddress, NewCard, OrderId, OrderRecord,
    ReturnRecord,
};

use crate::error::Result;
use crate::middleware::{RequireAuth, ValidJson, Validate, validate::min_chars};
use crate::services::account::OrderTracking;
use crate::state::AppState;

/// Return request form.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnRequest {
    pub order_id: OrderId,
    pub reason: String,
}

impl Validate for ReturnRequest {
    const REJECTION: &'static str = "Invalid return request";

    fn is_valid(&self) -> bool {
        min_chars(&self.reason, 6)
    }
}

/// GET /api/account/addresses
pub async fn addresses(RequireAuth(user): RequireAuth) -> Json<Vec<AddressRecord>> {
    Json(user.addresses)
}

/// POST /api/account/addresses
///
/// # Errors
///
/// Returns 404 if the account no longer exists.
pub async fn add_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ValidJson(address): ValidJson<NewAddress>,
) -> Result<(StatusCode, Json<AddressRecord>)> {
    let address = state.account().add_address(&user.id, address).await?;
    Ok((StatusCode::CREATED, Json(address)))
}

/// DELETE /api/account/addresses/{id}
///
/// # Errors
///
/// Returns 404 if the account no longer exists.
pub async fn remove_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<AddressId>,
) -> Result<StatusCode> {
    state.account().remove_address(&user.id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/account/cards
pub async fn cards(RequireAuth(user): RequireAuth) -> Json<Vec<CardRecord>> {
    Json(user.cards)
}

/// POST /api/account/cards
///
/// # Errors
///
/// Returns 404 if the account no longer exists.
pub async fn add_card(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ValidJson(card): ValidJson<NewCard>,
) -> Result<(StatusCode, Json<CardRecord>)> {
    let card = state.account().add_card(&user.id, card).await?;
    Ok((StatusCode::CREATED, Json(card)))
}

/// DELETE /api/account/cards/{id}
///
/// # Errors
///
/// Returns 404 if the account no longer exists.
pub async fn remove_card(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<CardId>,
) -> Result<StatusCode> {
    state.account().remove_card(&user.id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Order history, newest first.
///
/// GET /api/account/orders
///
/// # Errors
///
/// Returns 500 if orders cannot be read.
pub async fn orders(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<OrderRecord>>> {
    Ok(Json(state.account().orders(&user.id).await?))
}

/// GET /api/account/tracking/{orderId}
///
/// # Errors
///
/// Returns 404 if the order is not one of the user's.
pub async fn tracking(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(order_id): Path<OrderId>,
) -> Result<Json<OrderTracking>> {
    Ok(Json(state.account().tracking(&user.id, &order_id).await?))
}

/// GET /api/account/returns
///
/// # Errors
///
/// Returns 500 if returns cannot be read.
pub async fn returns(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<ReturnRecord>>> {
    Ok(Json(state.account().returns(&user.id).await?))
}

/// POST /api/account/returns
///
/// # Errors
///
/// Returns 404 if the order is not one of the user's.
pub async fn request_return(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ValidJson(form): ValidJson<ReturnRequest>,
) -> Result<(StatusCode, Json<ReturnRecord>)> {
    let request = state
        .account()
        .request_return(&user.id, &form.order_id, &form.reason)
        .await?;
    Ok((StatusCode::CREATED, Json(request)))
}
