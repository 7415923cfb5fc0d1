//! # Repository Module
//!
//! Database repository implementations for the bookshop backend.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  The Repository pattern abstracts database access behind a clean API.  │
//! │                                                                         │
//! │  HTTP Handler                                                          │
//! │       │                                                                 │
//! │       │  db.carts().add_item(&customer_id, &item_id, 2)                │
//! │       │  ↓                                                              │
//! │       ▼                                                                 │
//! │  CartRepository                                                        │
//! │  ├── get_or_create(&self, customer_id)                                 │
//! │  ├── add_item(&self, customer_id, item_id, quantity)                   │
//! │  ├── update_quantity(&self, customer_id, item_id, quantity)            │
//! │  └── checkout(&self, customer_id)                                      │
//! │       │                                                                 │
//! │       │  SQL (inside one transaction per workflow)                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Benefits:                                                              │
//! │  • Clean separation of concerns                                        │
//! │  • Easy to test against an in-memory database                          │
//! │  • SQL is isolated in one place                                        │
//! │  • Transaction boundaries live next to the queries they protect        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`item::ItemRepository`] - Catalog CRUD, search, and stock adjustment
//! - [`user::UserRepository`] - Account directory operations
//! - [`cart::CartRepository`] - Per-customer cart workflows and checkout
//! - [`bill::BillRepository`] - Bill lifecycle: draft, confirm, pay, cancel

pub mod bill;
pub mod cart;
pub mod item;
pub mod user;
