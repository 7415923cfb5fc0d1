//! Order (bill) endpoints.
//!
//! Customers see their own bills; accounts with the order-management
//! capability (staff, admin) see and drive every bill. Draft editing,
//! discounts, confirmation, payment, and cancellation are management
//! operations - the customer-facing path is the cart.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use bookshop_core::{Bill, BillItem, BillStatus, UserRole};
use bookshop_db::DbError;

use crate::auth::{authenticate, require};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct BillResponse {
    #[serde(flatten)]
    pub bill: Bill,
    pub items: Vec<BillItem>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<BillStatus>,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    100
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub customer_id: String,
}

#[derive(Debug, Deserialize)]
pub struct AddLineRequest {
    pub item_id: String,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateLineRequest {
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct SetDiscountRequest {
    pub discount_cents: i64,
}

/// `GET /api/orders` - bill history, newest first.
///
/// Customers get their own bills; managers get everything, optionally
/// filtered by status.
pub async fn list(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<Bill>>> {
    let actor = authenticate(&state, &headers).await?;

    let bills = if actor.role.can_manage_orders() {
        match query.status {
            Some(status) => state.db.bills().list_by_status(status).await?,
            None => state.db.bills().list_all(query.limit).await?,
        }
    } else {
        state.db.bills().list_by_customer(&actor.id).await?
    };

    Ok(Json(bills))
}

/// `GET /api/orders/:id` - one bill with its lines (owner or manager).
pub async fn get(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<BillResponse>> {
    let actor = authenticate(&state, &headers).await?;

    let (bill, items) = state.db.bills().get_with_items(&id).await?;

    if bill.customer_id != actor.id && !actor.role.can_manage_orders() {
        // Hide the bill's existence from non-owners
        return Err(ApiError::Db(DbError::not_found("Bill", &id)));
    }

    Ok(Json(BillResponse { bill, items }))
}

/// `POST /api/orders` - opens an empty DRAFT bill for a customer
/// (manager only; e.g. a phone order taken at the counter).
pub async fn create(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateOrderRequest>,
) -> ApiResult<Json<Bill>> {
    let actor = authenticate(&state, &headers).await?;
    require(&actor, UserRole::can_manage_orders)?;

    let bill = state.db.bills().create(&req.customer_id).await?;
    Ok(Json(bill))
}

/// `POST /api/orders/:id/items` - adds a line to a DRAFT bill (manager).
pub async fn add_line(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<AddLineRequest>,
) -> ApiResult<Json<BillItem>> {
    let actor = authenticate(&state, &headers).await?;
    require(&actor, UserRole::can_manage_orders)?;

    let line = state
        .db
        .bills()
        .add_line(&id, &req.item_id, req.quantity)
        .await?;

    Ok(Json(line))
}

/// `PUT /api/orders/:id/items/:item_id` - sets a line's quantity (manager).
pub async fn update_line(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((id, item_id)): Path<(String, String)>,
    Json(req): Json<UpdateLineRequest>,
) -> ApiResult<Json<BillResponse>> {
    let actor = authenticate(&state, &headers).await?;
    require(&actor, UserRole::can_manage_orders)?;

    state.db.bills().update_line(&id, &item_id, req.quantity).await?;

    let (bill, items) = state.db.bills().get_with_items(&id).await?;
    Ok(Json(BillResponse { bill, items }))
}

/// `DELETE /api/orders/:id/items/:item_id` - removes a line (manager).
pub async fn remove_line(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((id, item_id)): Path<(String, String)>,
) -> ApiResult<Json<BillResponse>> {
    let actor = authenticate(&state, &headers).await?;
    require(&actor, UserRole::can_manage_orders)?;

    state.db.bills().remove_line(&id, &item_id).await?;

    let (bill, items) = state.db.bills().get_with_items(&id).await?;
    Ok(Json(BillResponse { bill, items }))
}

/// `PUT /api/orders/:id/discount` - sets the discount on a DRAFT bill
/// (manager).
pub async fn set_discount(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<SetDiscountRequest>,
) -> ApiResult<Json<Bill>> {
    let actor = authenticate(&state, &headers).await?;
    require(&actor, UserRole::can_manage_orders)?;

    let bill = state.db.bills().set_discount(&id, req.discount_cents).await?;
    Ok(Json(bill))
}

/// `POST /api/orders/:id/confirm` - confirms a DRAFT bill, taking stock
/// (manager).
pub async fn confirm(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<Bill>> {
    let actor = authenticate(&state, &headers).await?;
    require(&actor, UserRole::can_manage_orders)?;

    let bill = state.db.bills().confirm(&id).await?;
    info!(bill_number = %bill.bill_number, by = %actor.username, "Bill confirmed");

    Ok(Json(bill))
}

/// `POST /api/orders/:id/pay` - records payment on a CONFIRMED bill
/// (manager).
pub async fn pay(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<Bill>> {
    let actor = authenticate(&state, &headers).await?;
    require(&actor, UserRole::can_manage_orders)?;

    let bill = state.db.bills().mark_paid(&id).await?;
    info!(bill_number = %bill.bill_number, by = %actor.username, "Bill paid");

    Ok(Json(bill))
}

/// `POST /api/orders/:id/cancel` - cancels a DRAFT or CONFIRMED bill.
///
/// Customers may cancel their own DRAFT bills; anything further needs
/// the management capability.
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<Bill>> {
    let actor = authenticate(&state, &headers).await?;

    if !actor.role.can_manage_orders() {
        let bill = state
            .db
            .bills()
            .get_by_id(&id)
            .await?
            .ok_or_else(|| ApiError::Db(DbError::not_found("Bill", &id)))?;

        if bill.customer_id != actor.id {
            return Err(ApiError::Db(DbError::not_found("Bill", &id)));
        }
        if bill.status != BillStatus::Draft {
            return Err(ApiError::Forbidden);
        }
    }

    let bill = state.db.bills().cancel(&id).await?;
    info!(bill_number = %bill.bill_number, by = %actor.username, "Bill cancelled");

    Ok(Json(bill))
}
