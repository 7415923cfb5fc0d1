//! # API Error Types
//!
//! The outermost error layer: everything the repositories and handlers can
//! raise is mapped to an HTTP status and a `{code, message}` JSON body.
//!
//! ## Status Mapping
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  DbError::NotFound                 → 404 NOT_FOUND                  │
//! │  DbError::UniqueViolation          → 409 DUPLICATE                  │
//! │  DbError::ForeignKeyViolation      → 409 STILL_REFERENCED           │
//! │  CoreError::Validation             → 422 VALIDATION_FAILED          │
//! │  CoreError::InsufficientStock      → 409 INSUFFICIENT_STOCK         │
//! │  CoreError::ItemUnavailable        → 409 ITEM_UNAVAILABLE           │
//! │  CoreError::InvalidOrderStatus     → 409 INVALID_ORDER_STATUS       │
//! │  CoreError::EmptyCart/EmptyOrder   → 400 EMPTY_ORDER                │
//! │  Unauthorized / Forbidden          → 401 / 403                      │
//! │  anything else                     → 500 INTERNAL (details logged)  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use bookshop_core::CoreError;
use bookshop_db::DbError;

/// JSON body returned for every error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Stable machine-readable code.
    pub code: String,
    /// Human-readable description.
    pub message: String,
}

/// Errors a handler can return.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or unknown acting account (`x-account-id` header).
    #[error("Authentication required")]
    Unauthorized,

    /// Wrong username or password at login.
    #[error("Invalid username or password")]
    BadCredentials,

    /// The acting account's role does not grant this operation.
    #[error("Operation not permitted for this account")]
    Forbidden,

    /// Malformed request outside of field validation.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Anything raised by the storage layer, including business failures
    /// carried through `DbError::Core`.
    #[error(transparent)]
    Db(#[from] DbError),

    /// Password hashing failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::BadCredentials => (StatusCode::UNAUTHORIZED, "BAD_CREDENTIALS"),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),

            ApiError::Db(db) => match db {
                DbError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                DbError::UniqueViolation { .. } => (StatusCode::CONFLICT, "DUPLICATE"),
                DbError::ForeignKeyViolation { .. } => {
                    (StatusCode::CONFLICT, "STILL_REFERENCED")
                }
                DbError::Core(core) => match core {
                    CoreError::Validation(_) => {
                        (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_FAILED")
                    }
                    CoreError::InsufficientStock { .. } => {
                        (StatusCode::CONFLICT, "INSUFFICIENT_STOCK")
                    }
                    CoreError::ItemUnavailable { .. } => {
                        (StatusCode::CONFLICT, "ITEM_UNAVAILABLE")
                    }
                    CoreError::InvalidOrderStatus { .. } => {
                        (StatusCode::CONFLICT, "INVALID_ORDER_STATUS")
                    }
                    CoreError::EmptyCart => (StatusCode::BAD_REQUEST, "EMPTY_CART"),
                    CoreError::EmptyOrder => (StatusCode::BAD_REQUEST, "EMPTY_ORDER"),
                    CoreError::InvalidQuantity { .. } => {
                        (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_QUANTITY")
                    }
                    CoreError::CartTooLarge { .. } => {
                        (StatusCode::BAD_REQUEST, "CART_TOO_LARGE")
                    }
                },
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            },

            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Server-side faults keep their details in the log, not the body
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(code, error = %self, "Request failed");
            "An internal error occurred".to_string()
        } else {
            tracing::debug!(code, error = %self, "Request rejected");
            self.to_string()
        };

        let body = ErrorResponse {
            code: code.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let err = ApiError::Db(DbError::not_found("Item", "x"));
        assert_eq!(err.status_and_code().0, StatusCode::NOT_FOUND);

        let err = ApiError::Db(DbError::duplicate("username", "alice"));
        assert_eq!(err.status_and_code().0, StatusCode::CONFLICT);

        let err = ApiError::Db(DbError::Core(CoreError::InsufficientStock {
            name: "Widget".to_string(),
            available: 1,
            requested: 2,
        }));
        let (status, code) = err.status_and_code();
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(code, "INSUFFICIENT_STOCK");

        let err = ApiError::Db(DbError::Core(CoreError::EmptyCart));
        assert_eq!(err.status_and_code().0, StatusCode::BAD_REQUEST);

        let err = ApiError::Forbidden;
        assert_eq!(err.status_and_code().0, StatusCode::FORBIDDEN);
    }
}
