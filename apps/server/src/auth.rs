//! # Authentication and Authorization
//!
//! Password hashing plus the acting-identity lookup used by every
//! protected handler.
//!
//! ## Acting Identity
//! Clients authenticate once via `POST /api/auth/login` and then send
//! their account id in the `x-account-id` header on every request. The
//! server resolves that header to a [`User`] row; role capability checks
//! run against the resolved account, never against anything the client
//! claims about itself.

use axum::http::HeaderMap;

use bookshop_core::{User, UserRole};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Header carrying the acting account's id.
pub const ACCOUNT_HEADER: &str = "x-account-id";

/// Hashes a password with argon2 and a fresh random salt.
pub fn hash_password(password: &str) -> ApiResult<String> {
    use argon2::{
        password_hash::{rand_core::OsRng, SaltString},
        Argon2, PasswordHasher,
    };

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(format!("Failed to hash password: {}", e)))?;

    Ok(hash.to_string())
}

/// Verifies a password against its stored argon2 hash.
///
/// A malformed stored hash verifies as false rather than erroring; the
/// caller cannot distinguish it from a wrong password.
pub fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::{Argon2, PasswordHash, PasswordVerifier};

    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Resolves the acting account from the request headers.
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> ApiResult<User> {
    let account_id = headers
        .get(ACCOUNT_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;

    state
        .db
        .users()
        .get_by_id(account_id)
        .await?
        .ok_or(ApiError::Unauthorized)
}

/// Requires the acting account's role to pass the given capability check.
pub fn require(actor: &User, capability: fn(&UserRole) -> bool) -> ApiResult<()> {
    if capability(&actor.role) {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

/// Requires the actor to either be the given account or pass a capability
/// check. Used for "self or admin" endpoints.
pub fn require_self_or(
    actor: &User,
    account_id: &str,
    capability: fn(&UserRole) -> bool,
) -> ApiResult<()> {
    if actor.id == account_id || capability(&actor.role) {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_roundtrip() {
        let hash = hash_password("swordfish").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("swordfish", &hash));
        assert!(!verify_password("wrong", &hash));
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-hash"));
        assert!(!verify_password("anything", ""));
    }
}
