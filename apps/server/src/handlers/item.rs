//! Catalog endpoints.
//!
//! Browsing is open to any authenticated account; mutation requires the
//! item-management capability and stock moves require the stock
//! capability (staff or admin).

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use bookshop_core::{Item, ItemStatus, UserRole};
use bookshop_db::DbError;

use crate::auth::{authenticate, require};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Substring search over item names.
    pub q: Option<String>,
    /// Include inactive and out-of-stock items (management view).
    #[serde(default)]
    pub all: bool,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    50
}

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    #[serde(default)]
    pub stock_quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
}

#[derive(Debug, Deserialize)]
pub struct SetStockRequest {
    pub stock_quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: ItemStatus,
}

/// `GET /api/items` - storefront listing or search.
pub async fn list(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<Item>>> {
    let actor = authenticate(&state, &headers).await?;

    let items = match query.q.as_deref() {
        Some(q) if !q.trim().is_empty() => state.db.items().search_by_name(q, query.limit).await?,
        _ if query.all => {
            // The full view exposes management state, so gate it
            require(&actor, UserRole::can_adjust_stock)?;
            state.db.items().list_all().await?
        }
        _ => state.db.items().list_active().await?,
    };

    Ok(Json(items))
}

/// `GET /api/items/:id`.
pub async fn get(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<Item>> {
    authenticate(&state, &headers).await?;

    let item = state
        .db
        .items()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::Db(DbError::not_found("Item", &id)))?;

    Ok(Json(item))
}

/// `POST /api/items` - adds a catalog item (admin).
pub async fn create(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateItemRequest>,
) -> ApiResult<Json<Item>> {
    let actor = authenticate(&state, &headers).await?;
    require(&actor, UserRole::can_manage_items)?;

    let now = Utc::now();
    let item = Item {
        id: Uuid::new_v4().to_string(),
        name: req.name,
        description: req.description,
        price_cents: req.price_cents,
        stock_quantity: req.stock_quantity,
        status: ItemStatus::Active,
        created_at: now,
        updated_at: now,
    };

    let item = state.db.items().insert(&item).await?;
    info!(name = %item.name, "Item created");

    Ok(Json(item))
}

/// `PUT /api/items/:id` - edits name, description, and price (admin).
///
/// Stock is deliberately not editable here; use the stock endpoint.
pub async fn update(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<UpdateItemRequest>,
) -> ApiResult<Json<Item>> {
    let actor = authenticate(&state, &headers).await?;
    require(&actor, UserRole::can_manage_items)?;

    state
        .db
        .items()
        .update(&id, &req.name, req.description.as_deref(), req.price_cents)
        .await?;

    let item = state
        .db
        .items()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::Db(DbError::not_found("Item", &id)))?;

    Ok(Json(item))
}

/// `DELETE /api/items/:id` (admin).
///
/// Refused with 409 while the item is referenced by cart or bill lines;
/// deactivate it instead.
pub async fn remove(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let actor = authenticate(&state, &headers).await?;
    require(&actor, UserRole::can_manage_items)?;

    state.db.items().delete(&id).await?;
    info!(id = %id, "Item deleted");

    Ok(Json(serde_json::json!({ "deleted": id })))
}

/// `PUT /api/items/:id/stock` - sets an absolute stock level (staff/admin).
pub async fn set_stock(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<SetStockRequest>,
) -> ApiResult<Json<Item>> {
    let actor = authenticate(&state, &headers).await?;
    require(&actor, UserRole::can_adjust_stock)?;

    let item = state.db.items().set_stock(&id, req.stock_quantity).await?;
    info!(id = %id, stock = item.stock_quantity, status = ?item.status, "Stock adjusted");

    Ok(Json(item))
}

/// `PUT /api/items/:id/status` - shelves or reactivates an item
/// (staff/admin). The stored status is reconciled against current stock.
pub async fn set_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<SetStatusRequest>,
) -> ApiResult<Json<Item>> {
    let actor = authenticate(&state, &headers).await?;
    require(&actor, UserRole::can_adjust_stock)?;

    let item = state.db.items().set_status(&id, req.status).await?;
    Ok(Json(item))
}
