//! Database models
//!
//! Entity structs mapping to the PostgreSQL tables behind the credential
//! store, plus the request/response DTOs built from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ============================================================================
// User Model
// ============================================================================

/// User entity representing a registered account
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub email: Option<String>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Registration payload (plain-text password, hashed before storage)
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub email: Option<String>,
}

// ============================================================================
// Role / Permission Models
// ============================================================================

/// Role entity; permissions attach via the role_permissions join table
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

/// Permission entity: one (resource, action) capability, addressed by name
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Permission {
    pub id: Uuid,
    pub name: String,
    pub resource: String,
    pub action: String,
}

// ============================================================================
// Response DTOs
// ============================================================================

/// User payload embedded in the login response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    /// Empty string when the account has no email on file
    pub email: String,
    pub roles: Vec<String>,
}

impl UserResponse {
    pub fn new(user: &User, roles: &[Role]) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone().unwrap_or_default(),
            roles: roles.iter().map(|role| role.name.clone()).collect(),
        }
    }
}

/// Full account profile returned to the authenticated user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub roles: Vec<String>,
}

impl ProfileResponse {
    pub fn new(user: &User, roles: &[Role]) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            enabled: user.enabled,
            created_at: user.created_at,
            last_login: user.last_login,
            roles: roles.iter().map(|role| role.name.clone()).collect(),
        }
    }
}
