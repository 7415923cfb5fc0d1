//! # Error Types
//!
//! Domain-specific error types for bookshop-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                 │
//! │                                                                     │
//! │  bookshop-core errors (this file)                                   │
//! │  ├── CoreError        - Business rule violations                    │
//! │  └── ValidationError  - Input validation failures                   │
//! │                                                                     │
//! │  bookshop-db errors (separate crate)                                │
//! │  └── DbError          - Storage failures, wraps CoreError so the    │
//! │                         transactional workflows surface both        │
//! │                                                                     │
//! │  Server errors (apps/server)                                        │
//! │  └── ApiError         - {code, message} JSON for clients            │
//! │                                                                     │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Client    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (item name, available vs requested)
//! 3. Errors are enum variants, never String

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations.
///
/// These should be caught and translated to user-facing messages; none are
/// retried automatically.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A purchase path touched an item that is not ACTIVE.
    #[error("Item '{name}' is not available for sale")]
    ItemUnavailable { name: String },

    /// Requested quantity exceeds live stock.
    ///
    /// ## When This Occurs
    /// - Adding to a cart beyond available stock (including the quantity
    ///   already sitting in the cart)
    /// - Authoritatively, at bill confirmation when the conditional
    ///   decrement finds the stock has dropped
    ///
    /// ## User Workflow
    /// ```text
    /// Add to Cart (qty: 5)
    ///      │
    ///      ▼
    /// Check stock: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { name: "Widget", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// UI shows: "Only 3 Widget in stock"
    /// ```
    #[error("Insufficient stock for '{name}': available {available}, requested {requested}")]
    InsufficientStock {
        name: String,
        available: i64,
        requested: i64,
    },

    /// Non-positive (or over-limit) quantity supplied to a cart or bill edit.
    #[error("Invalid quantity: {requested}")]
    InvalidQuantity { requested: i64 },

    /// Checkout attempted with no cart lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// Confirmation attempted with no bill lines.
    #[error("Order has no line items")]
    EmptyOrder,

    /// The bill is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Editing lines on a bill that has left DRAFT
    /// - Confirming a bill twice
    /// - Marking a draft as paid
    #[error("Bill {bill_id} is {current_status}, cannot perform operation")]
    InvalidOrderStatus {
        bill_id: String,
        current_status: String,
    },

    /// Cart has exceeded the maximum allowed distinct lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when user input doesn't meet requirements, before any
/// business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., telephone with letters).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., username already taken).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            name: "Widget".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for 'Widget': available 3, requested 5"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "name".to_string(),
        };
        assert_eq!(err.to_string(), "name is required");

        let err = ValidationError::Duplicate {
            field: "username".to_string(),
            value: "alice".to_string(),
        };
        assert_eq!(err.to_string(), "username 'alice' already exists");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "telephone".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
