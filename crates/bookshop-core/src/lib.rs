//! # bookshop-core: Pure Business Logic for the Bookshop
//!
//! This crate is the heart of the bookshop backend. It contains all business
//! logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Bookshop Architecture                          │
//! │                                                                     │
//! │  ┌───────────────────────────────────────────────────────────────┐ │
//! │  │                    apps/server (axum)                         │ │
//! │  │   register, login, catalog, cart, orders, administration      │ │
//! │  └──────────────────────────────┬────────────────────────────────┘ │
//! │                                 │                                   │
//! │  ┌──────────────────────────────▼────────────────────────────────┐ │
//! │  │              ★ bookshop-core (THIS CRATE) ★                   │ │
//! │  │                                                               │ │
//! │  │   ┌──────────┐  ┌──────────┐  ┌──────────┐  ┌────────────┐   │ │
//! │  │   │  types   │  │  money   │  │  error   │  │ validation │   │ │
//! │  │   │ Item,    │  │  Money   │  │ CoreError│  │   rules    │   │ │
//! │  │   │ Bill,... │  │ TaxRate  │  │          │  │   checks   │   │ │
//! │  │   └──────────┘  └──────────┘  └──────────┘  └────────────┘   │ │
//! │  │                                                               │ │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS          │ │
//! │  └──────────────────────────────┬────────────────────────────────┘ │
//! │                                 │                                   │
//! │  ┌──────────────────────────────▼────────────────────────────────┐ │
//! │  │                 bookshop-db (Database Layer)                  │ │
//! │  │        SQLite queries, migrations, repositories               │ │
//! │  └───────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Item, User, Cart, Bill, line items)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64)
//! 4. **Explicit Errors**: All errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use bookshop_core::Money` instead of
// `use bookshop_core::money::Money`

pub use error::{CoreError, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Sales tax applied to every bill, in basis points (1000 bps = 10%).
///
/// ## Why a constant?
/// The shop charges one flat rate. Per-item or per-region rates would move
/// this onto `Item` or a configuration table; until then a single constant
/// keeps every caller consistent.
pub const DEFAULT_TAX_RATE_BPS: u32 = 1000;

/// Maximum distinct lines allowed in a single cart.
///
/// ## Business Reason
/// Prevents runaway carts and keeps checkout sizes reasonable.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single item in a cart or bill line.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;
