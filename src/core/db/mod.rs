//! Database module
//!
//! Connectivity, models and repositories for the credential store, backed by
//! PostgreSQL through SQLx.

pub mod models;
pub mod pool;
pub mod repositories;

pub use models::*;
pub use pool::{DbConfig, DbError, create_pool, create_pool_with_migrations};
pub use repositories::{
    PermissionRepository, PermissionRepositoryError, RoleRepository, RoleRepositoryError,
    UserRepository, UserRepositoryError,
};

pub use sqlx::PgPool;
