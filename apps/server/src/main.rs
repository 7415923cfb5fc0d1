//! # Bookshop API Server
//!
//! JSON HTTP API over the bookshop repositories.
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        Request Flow                                 │
//! │                                                                     │
//! │  Client ──HTTP──► Router ──► handler                                │
//! │                               │                                     │
//! │                               ├── authenticate (x-account-id)       │
//! │                               ├── capability check (role table)     │
//! │                               ├── repository call (bookshop-db)     │
//! │                               └── JSON response / ApiError          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Surface
//! - `/api/auth`   - register, login
//! - `/api/items`  - catalog browsing and administration
//! - `/api/cart`   - the acting customer's cart and order placement
//! - `/api/orders` - bill lifecycle and history
//! - `/api/users`  - account directory

mod auth;
mod config;
mod error;
mod handlers;
mod state;

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bookshop_db::{Database, DbConfig};

use crate::config::Config;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,bookshop_server=debug,bookshop_db=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting bookshop server");

    let config = Config::from_env()?;
    info!(port = config.port, "Configuration loaded");

    let db = Database::new(DbConfig::new(&config.database_path)).await?;
    info!("Database ready");

    let state = Arc::new(AppState::new(db));
    let app = router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "Bookshop server is listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Builds the application router.
fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        // Authentication
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        // Catalog
        .route("/api/items", get(handlers::item::list).post(handlers::item::create))
        .route(
            "/api/items/:id",
            get(handlers::item::get)
                .put(handlers::item::update)
                .delete(handlers::item::remove),
        )
        .route("/api/items/:id/stock", put(handlers::item::set_stock))
        .route("/api/items/:id/status", put(handlers::item::set_status))
        // Cart
        .route("/api/cart", get(handlers::cart::get).delete(handlers::cart::clear))
        .route("/api/cart/items", post(handlers::cart::add_item))
        .route(
            "/api/cart/items/:item_id",
            put(handlers::cart::update_quantity).delete(handlers::cart::remove_item),
        )
        .route("/api/cart/checkout", post(handlers::cart::checkout))
        .route("/api/cart/place-order", post(handlers::cart::place_order))
        // Orders
        .route("/api/orders", get(handlers::order::list).post(handlers::order::create))
        .route("/api/orders/:id", get(handlers::order::get))
        .route("/api/orders/:id/items", post(handlers::order::add_line))
        .route(
            "/api/orders/:id/items/:item_id",
            put(handlers::order::update_line).delete(handlers::order::remove_line),
        )
        .route("/api/orders/:id/discount", put(handlers::order::set_discount))
        .route("/api/orders/:id/confirm", post(handlers::order::confirm))
        .route("/api/orders/:id/pay", post(handlers::order::pay))
        .route("/api/orders/:id/cancel", post(handlers::order::cancel))
        // Accounts
        .route("/api/users", get(handlers::user::list))
        .route("/api/users/me", get(handlers::user::me))
        .route(
            "/api/users/:id",
            get(handlers::user::get)
                .put(handlers::user::update_profile)
                .delete(handlers::user::remove),
        )
        .route("/api/users/:id/role", put(handlers::user::set_role))
        .route("/api/users/:id/password", put(handlers::user::set_password))
        // Middleware
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Resolves on ctrl-c so in-flight requests can drain.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install ctrl-c handler");
        return;
    }
    info!("Shutdown signal received");
}
