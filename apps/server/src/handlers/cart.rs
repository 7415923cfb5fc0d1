//! Cart endpoints.
//!
//! The cart is always the *acting customer's* cart; there is no way to
//! address another account's cart. Staff and admin accounts do not shop,
//! so every endpoint here requires the place-orders capability.
//!
//! ## Order Placement
//! `place-order` is the one-shot path: checkout the cart into a DRAFT
//! bill, confirm it (taking stock), and clear the cart. The cart is only
//! cleared after the confirm succeeds, so a stock race leaves the cart
//! intact for the customer to adjust.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use bookshop_core::{Bill, Cart, CartItem, UserRole};

use crate::auth::{authenticate, require};
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CartResponse {
    #[serde(flatten)]
    pub cart: Cart,
    pub items: Vec<CartItem>,
}

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub item_id: String,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: i64,
}

/// `GET /api/cart` - the acting customer's cart with its lines.
pub async fn get(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<CartResponse>> {
    let actor = authenticate(&state, &headers).await?;
    require(&actor, UserRole::can_place_orders)?;

    let (cart, items) = state.db.carts().get_with_items(&actor.id).await?;
    Ok(Json(CartResponse { cart, items }))
}

/// `POST /api/cart/items` - adds a quantity of an item; repeat adds merge.
pub async fn add_item(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<AddItemRequest>,
) -> ApiResult<Json<CartItem>> {
    let actor = authenticate(&state, &headers).await?;
    require(&actor, UserRole::can_place_orders)?;

    let line = state
        .db
        .carts()
        .add_item(&actor.id, &req.item_id, req.quantity)
        .await?;

    Ok(Json(line))
}

/// `PUT /api/cart/items/:item_id` - sets a line's quantity (must be >= 1).
pub async fn update_quantity(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(item_id): Path<String>,
    Json(req): Json<UpdateQuantityRequest>,
) -> ApiResult<Json<CartResponse>> {
    let actor = authenticate(&state, &headers).await?;
    require(&actor, UserRole::can_place_orders)?;

    state
        .db
        .carts()
        .update_quantity(&actor.id, &item_id, req.quantity)
        .await?;

    let (cart, items) = state.db.carts().get_with_items(&actor.id).await?;
    Ok(Json(CartResponse { cart, items }))
}

/// `DELETE /api/cart/items/:item_id` - removes a line (idempotent).
pub async fn remove_item(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(item_id): Path<String>,
) -> ApiResult<Json<CartResponse>> {
    let actor = authenticate(&state, &headers).await?;
    require(&actor, UserRole::can_place_orders)?;

    state.db.carts().remove_item(&actor.id, &item_id).await?;

    let (cart, items) = state.db.carts().get_with_items(&actor.id).await?;
    Ok(Json(CartResponse { cart, items }))
}

/// `DELETE /api/cart` - empties the cart.
pub async fn clear(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<CartResponse>> {
    let actor = authenticate(&state, &headers).await?;
    require(&actor, UserRole::can_place_orders)?;

    state.db.carts().clear(&actor.id).await?;

    let (cart, items) = state.db.carts().get_with_items(&actor.id).await?;
    Ok(Json(CartResponse { cart, items }))
}

/// `POST /api/cart/checkout` - converts the cart into a DRAFT bill.
///
/// The cart and stock are untouched; the bill can still be edited or
/// abandoned before confirmation.
pub async fn checkout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<Bill>> {
    let actor = authenticate(&state, &headers).await?;
    require(&actor, UserRole::can_place_orders)?;

    let bill = state.db.carts().checkout(&actor.id).await?;
    Ok(Json(bill))
}

/// `POST /api/cart/place-order` - checkout, confirm, and clear in sequence.
pub async fn place_order(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<Bill>> {
    let actor = authenticate(&state, &headers).await?;
    require(&actor, UserRole::can_place_orders)?;

    let draft = state.db.carts().checkout(&actor.id).await?;
    let bill = match state.db.bills().confirm(&draft.id).await {
        Ok(bill) => bill,
        Err(e) => {
            // Don't leave an orphaned draft behind; the cart still has the
            // lines, so the customer can adjust and retry
            let _ = state.db.bills().cancel(&draft.id).await;
            return Err(e.into());
        }
    };

    // Only now is it safe to drop the cart lines
    state.db.carts().clear(&actor.id).await?;

    info!(
        customer = %actor.username,
        bill_number = %bill.bill_number,
        final_cents = bill.final_cents,
        "Order placed"
    );

    Ok(Json(bill))
}
