//! Permission repository

use sqlx::PgPool;

use crate::core::db::models::Permission;

/// Permission repository error types
#[derive(Debug, thiserror::Error)]
pub enum PermissionRepositoryError {
    #[error("database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Permission repository for database operations
#[derive(Clone)]
pub struct PermissionRepository {
    pool: PgPool,
}

impl PermissionRepository {
    /// Create a new permission repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new permission
    pub async fn create(
        &self,
        name: &str,
        resource: &str,
        action: &str,
    ) -> Result<Permission, PermissionRepositoryError> {
        let permission = sqlx::query_as::<_, Permission>(
            r#"
            INSERT INTO permissions (name, resource, action)
            VALUES ($1, $2, $3)
            RETURNING id, name, resource, action
            "#,
        )
        .bind(name)
        .bind(resource)
        .bind(action)
        .fetch_one(&self.pool)
        .await?;

        Ok(permission)
    }

    /// Find a permission by name
    pub async fn find_by_name(
        &self,
        name: &str,
    ) -> Result<Option<Permission>, PermissionRepositoryError> {
        let permission = sqlx::query_as::<_, Permission>(
            r#"
            SELECT id, name, resource, action
            FROM permissions
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(permission)
    }

    /// List all permissions, name-ordered
    pub async fn list(&self) -> Result<Vec<Permission>, PermissionRepositoryError> {
        let permissions = sqlx::query_as::<_, Permission>(
            r#"
            SELECT id, name, resource, action
            FROM permissions
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(permissions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    async fn create_test_pool() -> PgPool {
        use crate::core::db::pool::{DbConfig, create_pool};

        let config = DbConfig::from_env().expect("DATABASE_URL must be set for tests");
        create_pool(&config)
            .await
            .expect("failed to create test pool")
    }

    #[tokio::test]
    #[ignore = "requires running PostgreSQL database"]
    async fn test_create_and_find_permission() {
        let repo = PermissionRepository::new(create_test_pool().await);
        let name = format!("report:export_{}", &Uuid::new_v4().to_string()[..8]);

        let created = repo.create(&name, "report", "export").await.unwrap();
        let found = repo.find_by_name(&name).await.unwrap().unwrap();

        assert_eq!(found.id, created.id);
        assert_eq!(found.resource, "report");
        assert_eq!(found.action, "export");
    }

    #[tokio::test]
    #[ignore = "requires running PostgreSQL database"]
    async fn test_find_unknown_permission() {
        let repo = PermissionRepository::new(create_test_pool().await);

        let found = repo.find_by_name("no_such_permission").await.unwrap();
        assert!(found.is_none());
    }
}
