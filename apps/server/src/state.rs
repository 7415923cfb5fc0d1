//! Shared application state handed to every handler.

use bookshop_db::Database;

/// Application state.
///
/// `Database` is a thin wrapper over a connection pool, so cloning per
/// request is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Database handle providing repository access.
    pub db: Database,
}

impl AppState {
    /// Creates the application state.
    pub fn new(db: Database) -> Self {
        AppState { db }
    }
}
