//! Application configuration
//!
//! Assembles the server, database and token settings from environment
//! variables. Development defaults apply everywhere except DATABASE_URL,
//! which has no safe default.

use crate::core::auth::jwt::{JwtConfig, TokenError};
use crate::core::db::pool::{DbConfig, DbError};

/// Default bind address for development
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Database(#[from] DbError),

    #[error(transparent)]
    Token(#[from] TokenError),
}

/// Top-level application configuration
#[derive(Clone)]
pub struct AppConfig {
    /// Socket address the server binds to
    pub bind_addr: String,
    pub database: DbConfig,
    pub jwt: JwtConfig,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads `WARDEN_BIND_ADDR`, `DATABASE_URL`, `WARDEN_JWT_SECRET` and
    /// `WARDEN_JWT_LIFETIME_SECS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_addr =
            std::env::var("WARDEN_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());

        Ok(Self {
            bind_addr,
            database: DbConfig::from_env()?,
            jwt: JwtConfig::from_env()?,
        })
    }
}
