//! User repository
//!
//! Account persistence with bcrypt password hashing, plus the user side of
//! the user↔role graph: grants, and the role/permission sets used to snapshot
//! claims at token issuance.

use sqlx::PgPool;
use uuid::Uuid;

use crate::core::db::models::{Permission, Role, User};

/// Cost factor for bcrypt hashing (12 is recommended for production)
const BCRYPT_COST: u32 = 12;

/// User repository error types
#[derive(Debug, thiserror::Error)]
pub enum UserRepositoryError {
    #[error("user not found")]
    NotFound,

    #[error("username already exists")]
    UsernameAlreadyExists,

    #[error("password hashing failed: {0}")]
    HashingError(String),

    #[error("database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// User repository for database operations
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Hash a password using bcrypt with automatic salt generation
    pub fn hash_password(password: &str) -> Result<String, UserRepositoryError> {
        bcrypt::hash(password, BCRYPT_COST)
            .map_err(|e| UserRepositoryError::HashingError(e.to_string()))
    }

    /// Verify a password against a bcrypt hash
    pub fn verify_password(password: &str, hash: &str) -> Result<bool, UserRepositoryError> {
        bcrypt::verify(password, hash).map_err(|e| UserRepositoryError::HashingError(e.to_string()))
    }

    /// Create a new user with a plain-text password (hashed here)
    pub async fn create(
        &self,
        username: &str,
        password: &str,
        email: Option<&str>,
    ) -> Result<User, UserRepositoryError> {
        if self.find_by_username(username).await?.is_some() {
            return Err(UserRepositoryError::UsernameAlreadyExists);
        }

        let password_hash = Self::hash_password(password)?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password_hash, email)
            VALUES ($1, $2, $3)
            RETURNING id, username, password_hash, email, enabled, created_at, last_login
            "#,
        )
        .bind(username)
        .bind(&password_hash)
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    /// Find a user by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, UserRepositoryError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, email, enabled, created_at, last_login
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Find a user by username
    pub async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<User>, UserRepositoryError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, email, enabled, created_at, last_login
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Stamp the user's last-login timestamp, returning the updated row
    pub async fn touch_last_login(&self, id: Uuid) -> Result<User, UserRepositoryError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET last_login = now()
            WHERE id = $1
            RETURNING id, username, password_hash, email, enabled, created_at, last_login
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(UserRepositoryError::NotFound)?;

        Ok(user)
    }

    /// Enable or disable an account
    pub async fn set_enabled(&self, id: Uuid, enabled: bool) -> Result<(), UserRepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET enabled = $2
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(enabled)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(UserRepositoryError::NotFound);
        }

        Ok(())
    }

    /// Grant a role to a user; already-granted roles are left as-is
    pub async fn add_role(&self, user_id: Uuid, role_id: Uuid) -> Result<(), UserRepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(role_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Revoke a role from a user
    pub async fn remove_role(
        &self,
        user_id: Uuid,
        role_id: Uuid,
    ) -> Result<(), UserRepositoryError> {
        sqlx::query(
            r#"
            DELETE FROM user_roles
            WHERE user_id = $1 AND role_id = $2
            "#,
        )
        .bind(user_id)
        .bind(role_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Roles currently held by a user, name-ordered
    pub async fn roles_for_user(&self, user_id: Uuid) -> Result<Vec<Role>, UserRepositoryError> {
        let roles = sqlx::query_as::<_, Role>(
            r#"
            SELECT r.id, r.name, r.description
            FROM roles r
            JOIN user_roles ur ON ur.role_id = r.id
            WHERE ur.user_id = $1
            ORDER BY r.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(roles)
    }

    /// Effective permissions: the de-duplicated union across all held roles
    pub async fn permissions_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<Permission>, UserRepositoryError> {
        let permissions = sqlx::query_as::<_, Permission>(
            r#"
            SELECT DISTINCT p.id, p.name, p.resource, p.action
            FROM permissions p
            JOIN role_permissions rp ON rp.permission_id = p.id
            JOIN user_roles ur ON ur.role_id = rp.role_id
            WHERE ur.user_id = $1
            ORDER BY p.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(permissions)
    }

    /// Number of users currently holding a role
    pub async fn count_with_role(&self, role_id: Uuid) -> Result<i64, UserRepositoryError> {
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM user_roles WHERE role_id = $1
            "#,
        )
        .bind(role_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0)
    }
}
