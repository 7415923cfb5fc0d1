//! # HTTP Handlers
//!
//! One module per API area. Every protected handler follows the same
//! shape: resolve the acting account from `x-account-id`, check the
//! capability its operation needs, delegate to a repository, and let
//! [`ApiError`](crate::error::ApiError) translate failures.
//!
//! ## Modules
//! - [`auth`]  - register and login
//! - [`item`]  - catalog browsing and administration
//! - [`cart`]  - the acting customer's cart and order placement
//! - [`order`] - bill lifecycle and history
//! - [`user`]  - account directory

pub mod auth;
pub mod cart;
pub mod item;
pub mod order;
pub mod user;

use axum::Json;
use serde_json::{json, Value};

/// Liveness probe.
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
