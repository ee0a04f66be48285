//! Role and permission administration
//!
//! Mutates the role↔permission and user↔role graphs. Add operations are
//! strict (missing entities are errors); remove operations are lenient
//! no-ops when an entity is missing. A role still held by any user cannot
//! be deleted.

use crate::core::db::models::{Permission, Role};
use crate::core::db::repositories::{
    PermissionRepository, PermissionRepositoryError, RoleRepository, RoleRepositoryError,
    UserRepository, UserRepositoryError,
};

/// Role/permission administration error types
#[derive(Debug, thiserror::Error)]
pub enum RbacError {
    #[error("role not found: {0}")]
    RoleNotFound(String),

    #[error("permission not found: {0}")]
    PermissionNotFound(String),

    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("role already exists: {0}")]
    RoleAlreadyExists(String),

    #[error("permission already exists: {0}")]
    PermissionAlreadyExists(String),

    #[error("role {name} is still held by {count} user(s)")]
    RoleInUse { name: String, count: i64 },

    #[error("credential store failure: {0}")]
    Store(String),
}

impl From<RoleRepositoryError> for RbacError {
    fn from(err: RoleRepositoryError) -> Self {
        RbacError::Store(err.to_string())
    }
}

impl From<PermissionRepositoryError> for RbacError {
    fn from(err: PermissionRepositoryError) -> Self {
        RbacError::Store(err.to_string())
    }
}

impl From<UserRepositoryError> for RbacError {
    fn from(err: UserRepositoryError) -> Self {
        RbacError::Store(err.to_string())
    }
}

/// Role/permission administration service
#[derive(Clone)]
pub struct RoleService {
    roles: RoleRepository,
    permissions: PermissionRepository,
    users: UserRepository,
}

impl RoleService {
    /// Create a new role service
    pub fn new(
        roles: RoleRepository,
        permissions: PermissionRepository,
        users: UserRepository,
    ) -> Self {
        Self {
            roles,
            permissions,
            users,
        }
    }

    /// Create a role; fails when the name is taken
    pub async fn create_role(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<Role, RbacError> {
        if self.roles.exists_by_name(name).await? {
            return Err(RbacError::RoleAlreadyExists(name.to_string()));
        }

        let role = self.roles.create(name, description).await?;
        tracing::info!("role created: {}", role.name);

        Ok(role)
    }

    /// Create a permission; fails when the name is taken
    pub async fn create_permission(
        &self,
        name: &str,
        resource: &str,
        action: &str,
    ) -> Result<Permission, RbacError> {
        if self.permissions.find_by_name(name).await?.is_some() {
            return Err(RbacError::PermissionAlreadyExists(name.to_string()));
        }

        let permission = self.permissions.create(name, resource, action).await?;
        tracing::info!("permission created: {}", permission.name);

        Ok(permission)
    }

    /// All known permissions, name-ordered
    pub async fn list_permissions(&self) -> Result<Vec<Permission>, RbacError> {
        Ok(self.permissions.list().await?)
    }

    /// Attach a permission to a role. Strict: both sides must exist.
    pub async fn add_permission_to_role(
        &self,
        role_name: &str,
        permission_name: &str,
    ) -> Result<(), RbacError> {
        let role = self
            .roles
            .find_by_name(role_name)
            .await?
            .ok_or_else(|| RbacError::RoleNotFound(role_name.to_string()))?;

        let permission = self
            .permissions
            .find_by_name(permission_name)
            .await?
            .ok_or_else(|| RbacError::PermissionNotFound(permission_name.to_string()))?;

        self.roles.add_permission(role.id, permission.id).await?;

        Ok(())
    }

    /// Detach a permission from a role. Lenient: a missing role or
    /// permission makes this a no-op.
    pub async fn remove_permission_from_role(
        &self,
        role_name: &str,
        permission_name: &str,
    ) -> Result<(), RbacError> {
        let role = self.roles.find_by_name(role_name).await?;
        let permission = self.permissions.find_by_name(permission_name).await?;

        let (Some(role), Some(permission)) = (role, permission) else {
            return Ok(());
        };

        self.roles.remove_permission(role.id, permission.id).await?;

        Ok(())
    }

    /// Delete a role. A missing role is a no-op; a role still held by any
    /// user is not deleted.
    pub async fn delete_role(&self, name: &str) -> Result<(), RbacError> {
        let Some(role) = self.roles.find_by_name(name).await? else {
            return Ok(());
        };

        let count = self.users.count_with_role(role.id).await?;
        if count > 0 {
            return Err(RbacError::RoleInUse {
                name: name.to_string(),
                count,
            });
        }

        self.roles.delete(role.id).await?;
        tracing::info!("role deleted: {}", name);

        Ok(())
    }

    /// Update a role's description. Strict: the role must exist.
    pub async fn update_role(
        &self,
        name: &str,
        new_description: Option<&str>,
    ) -> Result<Role, RbacError> {
        match self.roles.update_description(name, new_description).await {
            Ok(role) => Ok(role),
            Err(RoleRepositoryError::NotFound) => Err(RbacError::RoleNotFound(name.to_string())),
            Err(err) => Err(err.into()),
        }
    }

    /// Permissions attached to a role. Strict: the role must exist.
    pub async fn role_permissions(&self, name: &str) -> Result<Vec<Permission>, RbacError> {
        let role = self
            .roles
            .find_by_name(name)
            .await?
            .ok_or_else(|| RbacError::RoleNotFound(name.to_string()))?;

        Ok(self.roles.permissions_for_role(role.id).await?)
    }

    /// Grant a role to a user. Strict: both sides must exist.
    pub async fn add_role_to_user(&self, username: &str, role_name: &str) -> Result<(), RbacError> {
        let user = self
            .users
            .find_by_username(username)
            .await?
            .ok_or_else(|| RbacError::UserNotFound(username.to_string()))?;

        let role = self
            .roles
            .find_by_name(role_name)
            .await?
            .ok_or_else(|| RbacError::RoleNotFound(role_name.to_string()))?;

        self.users.add_role(user.id, role.id).await?;

        Ok(())
    }

    /// Revoke a role from a user. Strict on the user; a missing role makes
    /// this a no-op.
    pub async fn remove_role_from_user(
        &self,
        username: &str,
        role_name: &str,
    ) -> Result<(), RbacError> {
        let user = self
            .users
            .find_by_username(username)
            .await?
            .ok_or_else(|| RbacError::UserNotFound(username.to_string()))?;

        let Some(role) = self.roles.find_by_name(role_name).await? else {
            return Ok(());
        };

        self.users.remove_role(user.id, role.id).await?;

        Ok(())
    }

    /// Roles currently held by a user. Strict: the user must exist.
    pub async fn user_roles(&self, username: &str) -> Result<Vec<Role>, RbacError> {
        let user = self
            .users
            .find_by_username(username)
            .await?
            .ok_or_else(|| RbacError::UserNotFound(username.to_string()))?;

        Ok(self.users.roles_for_user(user.id).await?)
    }

    /// Enable or disable an account. Strict: the user must exist.
    pub async fn set_user_enabled(&self, username: &str, enabled: bool) -> Result<(), RbacError> {
        let user = self
            .users
            .find_by_username(username)
            .await?
            .ok_or_else(|| RbacError::UserNotFound(username.to_string()))?;

        self.users.set_enabled(user.id, enabled).await?;
        tracing::info!("user {} enabled={}", username, enabled);

        Ok(())
    }
}
