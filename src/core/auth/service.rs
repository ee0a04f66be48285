//! Authentication service
//!
//! Credential verification, account registration and token issuance.
//! Coordinates between the user/role repositories and the token codec.

use crate::core::auth::jwt::{TokenCodec, TokenError};
use crate::core::db::models::{NewUser, ProfileResponse, Role, User};
use crate::core::db::repositories::{
    RoleRepository, RoleRepositoryError, UserRepository, UserRepositoryError,
};

/// Role granted automatically to every newly registered account
pub const DEFAULT_ROLE: &str = "USER";

/// Authentication service error types
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("username already taken")]
    DuplicateAccount,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("credential store failure: {0}")]
    Store(String),
}

impl From<UserRepositoryError> for AuthError {
    fn from(err: UserRepositoryError) -> Self {
        match err {
            UserRepositoryError::UsernameAlreadyExists => AuthError::DuplicateAccount,
            other => AuthError::Store(other.to_string()),
        }
    }
}

impl From<RoleRepositoryError> for AuthError {
    fn from(err: RoleRepositoryError) -> Self {
        AuthError::Store(err.to_string())
    }
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    users: UserRepository,
    roles: RoleRepository,
    codec: TokenCodec,
    /// Compared against on username misses so unknown accounts still cost a
    /// full bcrypt verification.
    miss_hash: String,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(users: UserRepository, roles: RoleRepository, codec: TokenCodec) -> Self {
        let miss_hash =
            UserRepository::hash_password("warden.throwaway.credential").unwrap_or_default();

        Self {
            users,
            roles,
            codec,
            miss_hash,
        }
    }

    /// Verify a credential pair against the store.
    ///
    /// Returns `Ok(None)` uniformly for an unknown username, a disabled
    /// account, and a password mismatch; the caller cannot tell which branch
    /// failed. A successful match stamps `last_login` before returning.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<User>, AuthError> {
        let candidate = self.users.find_by_username(username).await?;

        let hash = candidate
            .as_ref()
            .map(|user| user.password_hash.as_str())
            .unwrap_or(self.miss_hash.as_str());
        let matches = UserRepository::verify_password(password, hash).unwrap_or(false);

        match candidate {
            Some(user) if matches && user.enabled => {
                let user = self.users.touch_last_login(user.id).await?;
                tracing::info!("user logged in: {}", user.username);
                Ok(Some(user))
            }
            _ => Ok(None),
        }
    }

    /// Register a new account.
    ///
    /// Fails with [`AuthError::DuplicateAccount`] when the username is taken.
    /// The default role is granted when it exists in the store; otherwise the
    /// account starts role-less.
    pub async fn register(&self, new_user: NewUser) -> Result<User, AuthError> {
        let user = self
            .users
            .create(
                &new_user.username,
                &new_user.password,
                new_user.email.as_deref(),
            )
            .await?;

        if let Some(role) = self.roles.find_by_name(DEFAULT_ROLE).await? {
            self.users.add_role(user.id, role.id).await?;
        }

        tracing::info!("user registered: {}", user.username);
        Ok(user)
    }

    /// Issue a session token embedding the user's current role/permission
    /// snapshot.
    pub async fn issue_token(&self, user: &User) -> Result<String, AuthError> {
        let roles = self.users.roles_for_user(user.id).await?;
        let permissions = self.users.permissions_for_user(user.id).await?;

        Ok(self.codec.issue(user, &roles, &permissions)?)
    }

    /// Re-sign a still-valid token with a fresh lifetime (claims carried over
    /// verbatim, no store re-check).
    pub fn refresh_token(&self, token: &str) -> Result<String, AuthError> {
        Ok(self.codec.refresh(token)?)
    }

    /// Roles currently held by a user
    pub async fn roles_for(&self, user: &User) -> Result<Vec<Role>, AuthError> {
        Ok(self.users.roles_for_user(user.id).await?)
    }

    /// Load the full profile for a username, with current roles
    pub async fn find_profile(
        &self,
        username: &str,
    ) -> Result<Option<ProfileResponse>, AuthError> {
        let Some(user) = self.users.find_by_username(username).await? else {
            return Ok(None);
        };
        let roles = self.users.roles_for_user(user.id).await?;

        Ok(Some(ProfileResponse::new(&user, &roles)))
    }

    /// Point-in-time check against the current store state, as opposed to the
    /// snapshot baked into an already-issued token.
    pub async fn has_permission(
        &self,
        username: &str,
        permission_name: &str,
    ) -> Result<bool, AuthError> {
        let Some(user) = self.users.find_by_username(username).await? else {
            return Ok(false);
        };

        let permissions = self.users.permissions_for_user(user.id).await?;
        Ok(permissions.iter().any(|p| p.name == permission_name))
    }

    /// Point-in-time role check against the current store state
    pub async fn has_role(&self, username: &str, role_name: &str) -> Result<bool, AuthError> {
        let Some(user) = self.users.find_by_username(username).await? else {
            return Ok(false);
        };

        let roles = self.users.roles_for_user(user.id).await?;
        Ok(roles.iter().any(|r| r.name == role_name))
    }
}
