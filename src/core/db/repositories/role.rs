//! Role repository
//!
//! Role persistence and the role side of the role↔permission graph.

use sqlx::PgPool;
use uuid::Uuid;

use crate::core::db::models::{Permission, Role};

/// Role repository error types
#[derive(Debug, thiserror::Error)]
pub enum RoleRepositoryError {
    #[error("role not found")]
    NotFound,

    #[error("database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Role repository for database operations
#[derive(Clone)]
pub struct RoleRepository {
    pool: PgPool,
}

impl RoleRepository {
    /// Create a new role repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new role
    pub async fn create(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<Role, RoleRepositoryError> {
        let role = sqlx::query_as::<_, Role>(
            r#"
            INSERT INTO roles (name, description)
            VALUES ($1, $2)
            RETURNING id, name, description
            "#,
        )
        .bind(name)
        .bind(description)
        .fetch_one(&self.pool)
        .await?;

        Ok(role)
    }

    /// Find a role by name
    pub async fn find_by_name(&self, name: &str) -> Result<Option<Role>, RoleRepositoryError> {
        let role = sqlx::query_as::<_, Role>(
            r#"
            SELECT id, name, description
            FROM roles
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(role)
    }

    /// Check whether a role name is taken
    pub async fn exists_by_name(&self, name: &str) -> Result<bool, RoleRepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM roles WHERE name = $1)")
                .bind(name)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    /// Update a role's description, returning the updated row
    pub async fn update_description(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<Role, RoleRepositoryError> {
        let role = sqlx::query_as::<_, Role>(
            r#"
            UPDATE roles
            SET description = $2
            WHERE name = $1
            RETURNING id, name, description
            "#,
        )
        .bind(name)
        .bind(description)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RoleRepositoryError::NotFound)?;

        Ok(role)
    }

    /// Delete a role by ID
    pub async fn delete(&self, id: Uuid) -> Result<bool, RoleRepositoryError> {
        let result = sqlx::query(
            r#"
            DELETE FROM roles
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Attach a permission to a role; existing attachments are left as-is
    pub async fn add_permission(
        &self,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> Result<(), RoleRepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO role_permissions (role_id, permission_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(role_id)
        .bind(permission_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Detach a permission from a role
    pub async fn remove_permission(
        &self,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> Result<(), RoleRepositoryError> {
        sqlx::query(
            r#"
            DELETE FROM role_permissions
            WHERE role_id = $1 AND permission_id = $2
            "#,
        )
        .bind(role_id)
        .bind(permission_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Permissions attached to a role, name-ordered
    pub async fn permissions_for_role(
        &self,
        role_id: Uuid,
    ) -> Result<Vec<Permission>, RoleRepositoryError> {
        let permissions = sqlx::query_as::<_, Permission>(
            r#"
            SELECT p.id, p.name, p.resource, p.action
            FROM permissions p
            JOIN role_permissions rp ON rp.permission_id = p.id
            WHERE rp.role_id = $1
            ORDER BY p.name
            "#,
        )
        .bind(role_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(permissions)
    }
}
