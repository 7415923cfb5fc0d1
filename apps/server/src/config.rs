//! # Server Configuration
//!
//! Environment-driven configuration, parsed once at startup so a bad value
//! fails the boot instead of a request.
//!
//! ## Variables
//! | Variable        | Default          | Meaning                       |
//! |-----------------|------------------|-------------------------------|
//! | `PORT`          | `8080`           | HTTP listen port              |
//! | `DATABASE_PATH` | `./bookshop.db`  | SQLite database file          |
//! | `RUST_LOG`      | (see main)       | Tracing filter                |

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP listen port.
    pub port: u16,

    /// Path to the SQLite database file. Created on first run.
    pub database_path: PathBuf,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Failed to parse PORT as a number")?,

            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "./bookshop.db".to_string())
                .into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Process environment is global; tests mutating it must not interleave
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_defaults() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::remove_var("PORT");
        env::remove_var("DATABASE_PATH");

        let config = Config::from_env().unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.database_path, PathBuf::from("./bookshop.db"));
    }

    #[test]
    fn test_port_override() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::set_var("PORT", "9001");
        let config = Config::from_env().unwrap();
        assert_eq!(config.port, 9001);
        env::remove_var("PORT");
    }
}
