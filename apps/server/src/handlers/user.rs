//! Account directory endpoints.
//!
//! Self-service is limited to viewing and editing one's own profile and
//! password; everything else needs the user-management capability.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use tracing::info;

use bookshop_core::{validation, CoreError, User, UserRole};
use bookshop_db::DbError;

use crate::auth::{authenticate, hash_password, require, require_self_or, verify_password};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub role: Option<UserRole>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: String,
    pub email: String,
    pub address: Option<String>,
    pub telephone: String,
}

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: UserRole,
}

#[derive(Debug, Deserialize)]
pub struct SetPasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// `GET /api/users` - the directory, optionally filtered by role (admin).
pub async fn list(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<User>>> {
    let actor = authenticate(&state, &headers).await?;
    require(&actor, UserRole::can_manage_users)?;

    let users = match query.role {
        Some(role) => state.db.users().list_by_role(role).await?,
        None => state.db.users().list_all().await?,
    };

    Ok(Json(users))
}

/// `GET /api/users/me` - the acting account.
pub async fn me(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<User>> {
    let actor = authenticate(&state, &headers).await?;
    Ok(Json(actor))
}

/// `GET /api/users/:id` (self or admin).
pub async fn get(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<User>> {
    let actor = authenticate(&state, &headers).await?;
    require_self_or(&actor, &id, UserRole::can_manage_users)?;

    let user = state
        .db
        .users()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::Db(DbError::not_found("User", &id)))?;

    Ok(Json(user))
}

/// `PUT /api/users/:id` - profile fields (self or admin).
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<User>> {
    let actor = authenticate(&state, &headers).await?;
    require_self_or(&actor, &id, UserRole::can_manage_users)?;

    state
        .db
        .users()
        .update_profile(
            &id,
            &req.name,
            &req.email,
            req.address.as_deref(),
            &req.telephone,
        )
        .await?;

    let user = state
        .db
        .users()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::Db(DbError::not_found("User", &id)))?;

    Ok(Json(user))
}

/// `PUT /api/users/:id/role` - changes an account's role (admin).
///
/// Admins cannot demote themselves; that guards against locking every
/// admin out of the directory.
pub async fn set_role(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<SetRoleRequest>,
) -> ApiResult<Json<User>> {
    let actor = authenticate(&state, &headers).await?;
    require(&actor, UserRole::can_manage_users)?;

    if actor.id == id && req.role != actor.role {
        return Err(ApiError::BadRequest(
            "Cannot change your own role".to_string(),
        ));
    }

    state.db.users().set_role(&id, req.role).await?;
    info!(id = %id, role = ?req.role, by = %actor.username, "Role changed");

    let user = state
        .db
        .users()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::Db(DbError::not_found("User", &id)))?;

    Ok(Json(user))
}

/// `PUT /api/users/:id/password` - changes an account's password (self).
///
/// The current password must verify; an admin resetting someone else's
/// forgotten password is out of scope for self-service.
pub async fn set_password(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<SetPasswordRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let actor = authenticate(&state, &headers).await?;

    if actor.id != id {
        return Err(ApiError::Forbidden);
    }

    if !verify_password(&req.current_password, &actor.password_hash) {
        return Err(ApiError::BadCredentials);
    }

    validation::validate_password(&req.new_password)
        .map_err(|e| DbError::Core(CoreError::Validation(e)))?;

    let hash = hash_password(&req.new_password)?;
    state.db.users().update_password(&id, &hash).await?;
    info!(id = %id, "Password changed");

    Ok(Json(serde_json::json!({ "updated": id })))
}

/// `DELETE /api/users/:id` (admin).
pub async fn remove(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let actor = authenticate(&state, &headers).await?;
    require(&actor, UserRole::can_manage_users)?;

    if actor.id == id {
        return Err(ApiError::BadRequest(
            "Cannot delete your own account".to_string(),
        ));
    }

    state.db.users().delete(&id).await?;
    info!(id = %id, by = %actor.username, "Account deleted");

    Ok(Json(serde_json::json!({ "deleted": id })))
}
