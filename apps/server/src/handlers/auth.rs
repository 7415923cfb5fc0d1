//! Registration and login.
//!
//! Login returns the account row (password hash excluded by serde); the
//! client sends the returned `id` as `x-account-id` on subsequent
//! requests.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use bookshop_core::{validation, CoreError, User, UserRole};
use bookshop_db::DbError;

use crate::auth::{hash_password, verify_password};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub telephone: String,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// `POST /api/auth/register` - creates a CUSTOMER account.
///
/// Staff and admin accounts are never self-service; an admin promotes an
/// existing account via `PUT /api/users/:id/role`.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Json<User>> {
    validation::validate_password(&req.password)
        .map_err(|e| DbError::Core(CoreError::Validation(e)))?;

    let user = User {
        id: Uuid::new_v4().to_string(),
        name: req.name,
        username: req.username,
        email: req.email,
        password_hash: hash_password(&req.password)?,
        address: req.address,
        telephone: req.telephone,
        role: UserRole::Customer,
        created_at: Utc::now(),
    };

    let user = state.db.users().insert(&user).await?;
    info!(username = %user.username, "Account registered");

    Ok(Json(user))
}

/// `POST /api/auth/login` - verifies credentials and returns the account.
///
/// Unknown usernames and wrong passwords produce the same error, so the
/// endpoint does not leak which usernames exist.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<User>> {
    let user = state
        .db
        .users()
        .get_by_username(&req.username)
        .await?
        .ok_or(ApiError::BadCredentials)?;

    if !verify_password(&req.password, &user.password_hash) {
        return Err(ApiError::BadCredentials);
    }

    info!(username = %user.username, "Login succeeded");
    Ok(Json(user))
}
