//! # bookshop-db: Database Layer for the Bookshop
//!
//! This crate provides database access for the bookshop backend.
//! It uses SQLite with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Bookshop Data Flow                             │
//! │                                                                     │
//! │  HTTP handler (place_order, add_to_cart, ...)                       │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  ┌───────────────────────────────────────────────────────────────┐ │
//! │  │                  bookshop-db (THIS CRATE)                     │ │
//! │  │                                                               │ │
//! │  │   ┌─────────────┐   ┌────────────────┐   ┌──────────────┐    │ │
//! │  │   │  Database   │   │  Repositories  │   │  Migrations  │    │ │
//! │  │   │  (pool.rs)  │   │ item/user/cart │   │  (embedded)  │    │ │
//! │  │   │             │◄──│ /bill          │   │ 001_init.sql │    │ │
//! │  │   └─────────────┘   └────────────────┘   └──────────────┘    │ │
//! │  │                                                               │ │
//! │  └───────────────────────────────────────────────────────────────┘ │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  SQLite database file (WAL mode, foreign keys on)                   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (item, user, cart, bill)
//!
//! ## Transaction Discipline
//!
//! The cart and billing workflows are multi-step mutations. Each one runs
//! inside a single `pool.begin()` transaction; any failure drops the
//! transaction and rolls back, so partial stock decrements or stale cart
//! totals are never observable.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bookshop_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/bookshop.db")).await?;
//!
//! let cart = db.carts().get_or_create(&customer_id).await?;
//! db.carts().add_item(&customer_id, &item_id, 2).await?;
//! let bill = db.carts().checkout(&customer_id).await?;
//! db.bills().confirm(&bill.id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::DbError;
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::bill::BillRepository;
pub use repository::cart::CartRepository;
pub use repository::item::ItemRepository;
pub use repository::user::UserRepository;
