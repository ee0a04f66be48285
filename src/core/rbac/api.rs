//! Admin endpoints for the role/permission graph
//!
//! Every route requires the ADMIN role; the guard runs after the
//! authentication layer has installed the request identity.

use axum::{
    Json, Router,
    extract::{Path, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use serde::Deserialize;
use std::sync::Arc;

use crate::core::auth::api::{ApiError, MessageResponse};
use crate::core::auth::middleware::{AccessDenied, AuthContext};
use crate::core::db::models::{Permission, Role};
use crate::core::rbac::service::{RbacError, RoleService};

/// Role required for every admin route
const ADMIN_ROLE: &str = "ADMIN";

/// Admin API state
#[derive(Clone)]
pub struct AdminApiState {
    pub role_service: RoleService,
}

impl IntoResponse for RbacError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            RbacError::RoleNotFound(_) => (StatusCode::NOT_FOUND, "ROLE_NOT_FOUND"),
            RbacError::PermissionNotFound(_) => (StatusCode::NOT_FOUND, "PERMISSION_NOT_FOUND"),
            RbacError::UserNotFound(_) => (StatusCode::NOT_FOUND, "USER_NOT_FOUND"),
            RbacError::RoleAlreadyExists(_) => (StatusCode::CONFLICT, "ROLE_EXISTS"),
            RbacError::PermissionAlreadyExists(_) => (StatusCode::CONFLICT, "PERMISSION_EXISTS"),
            RbacError::RoleInUse { .. } => (StatusCode::CONFLICT, "ROLE_IN_USE"),
            RbacError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORE_FAILURE"),
        };

        let body = ApiError::new(self.to_string(), code);

        (status, Json(body)).into_response()
    }
}

/// Guard layer: only authenticated callers holding ADMIN get through
pub async fn require_admin(request: Request, next: Next) -> Response {
    match request.extensions().get::<AuthContext>() {
        Some(identity) if identity.has_role(ADMIN_ROLE) => next.run(request).await,
        Some(_) => AccessDenied::forbidden("ADMIN role required").into_response(),
        None => AccessDenied::unauthorized("authentication required").into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateRoleRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePermissionRequest {
    pub name: String,
    pub resource: String,
    pub action: String,
}

#[derive(Debug, Deserialize)]
pub struct GrantPermissionRequest {
    pub permission: String,
}

#[derive(Debug, Deserialize)]
pub struct GrantRoleRequest {
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct SetEnabledRequest {
    pub enabled: bool,
}

/// Create the admin API router
pub fn admin_api_router(state: AdminApiState) -> Router {
    let state = Arc::new(state);

    Router::new()
        .route("/api/admin/roles", post(create_role_handler))
        .route(
            "/api/admin/roles/{name}",
            put(update_role_handler).delete(delete_role_handler),
        )
        .route(
            "/api/admin/roles/{name}/permissions",
            get(role_permissions_handler).post(grant_permission_handler),
        )
        .route(
            "/api/admin/roles/{name}/permissions/{permission}",
            delete(revoke_permission_handler),
        )
        .route(
            "/api/admin/permissions",
            get(list_permissions_handler).post(create_permission_handler),
        )
        .route(
            "/api/admin/users/{username}/roles",
            get(user_roles_handler).post(grant_role_handler),
        )
        .route(
            "/api/admin/users/{username}/roles/{role}",
            delete(revoke_role_handler),
        )
        .route(
            "/api/admin/users/{username}/enabled",
            put(set_enabled_handler),
        )
        .layer(middleware::from_fn(require_admin))
        .with_state(state)
}

/// POST /api/admin/roles
async fn create_role_handler(
    State(state): State<Arc<AdminApiState>>,
    Json(request): Json<CreateRoleRequest>,
) -> Result<Json<Role>, RbacError> {
    let role = state
        .role_service
        .create_role(&request.name, request.description.as_deref())
        .await?;

    Ok(Json(role))
}

/// PUT /api/admin/roles/{name}
async fn update_role_handler(
    State(state): State<Arc<AdminApiState>>,
    Path(name): Path<String>,
    Json(request): Json<UpdateRoleRequest>,
) -> Result<Json<Role>, RbacError> {
    let role = state
        .role_service
        .update_role(&name, request.description.as_deref())
        .await?;

    Ok(Json(role))
}

/// DELETE /api/admin/roles/{name}
async fn delete_role_handler(
    State(state): State<Arc<AdminApiState>>,
    Path(name): Path<String>,
) -> Result<Json<MessageResponse>, RbacError> {
    state.role_service.delete_role(&name).await?;

    Ok(Json(MessageResponse::new("role deleted")))
}

/// GET /api/admin/roles/{name}/permissions
async fn role_permissions_handler(
    State(state): State<Arc<AdminApiState>>,
    Path(name): Path<String>,
) -> Result<Json<Vec<Permission>>, RbacError> {
    let permissions = state.role_service.role_permissions(&name).await?;

    Ok(Json(permissions))
}

/// POST /api/admin/roles/{name}/permissions
async fn grant_permission_handler(
    State(state): State<Arc<AdminApiState>>,
    Path(name): Path<String>,
    Json(request): Json<GrantPermissionRequest>,
) -> Result<Json<MessageResponse>, RbacError> {
    state
        .role_service
        .add_permission_to_role(&name, &request.permission)
        .await?;

    Ok(Json(MessageResponse::new("permission granted")))
}

/// DELETE /api/admin/roles/{name}/permissions/{permission}
async fn revoke_permission_handler(
    State(state): State<Arc<AdminApiState>>,
    Path((name, permission)): Path<(String, String)>,
) -> Result<Json<MessageResponse>, RbacError> {
    state
        .role_service
        .remove_permission_from_role(&name, &permission)
        .await?;

    Ok(Json(MessageResponse::new("permission revoked")))
}

/// GET /api/admin/permissions
async fn list_permissions_handler(
    State(state): State<Arc<AdminApiState>>,
) -> Result<Json<Vec<Permission>>, RbacError> {
    let permissions = state.role_service.list_permissions().await?;

    Ok(Json(permissions))
}

/// POST /api/admin/permissions
async fn create_permission_handler(
    State(state): State<Arc<AdminApiState>>,
    Json(request): Json<CreatePermissionRequest>,
) -> Result<Json<Permission>, RbacError> {
    let permission = state
        .role_service
        .create_permission(&request.name, &request.resource, &request.action)
        .await?;

    Ok(Json(permission))
}

/// GET /api/admin/users/{username}/roles
async fn user_roles_handler(
    State(state): State<Arc<AdminApiState>>,
    Path(username): Path<String>,
) -> Result<Json<Vec<Role>>, RbacError> {
    let roles = state.role_service.user_roles(&username).await?;

    Ok(Json(roles))
}

/// POST /api/admin/users/{username}/roles
async fn grant_role_handler(
    State(state): State<Arc<AdminApiState>>,
    Path(username): Path<String>,
    Json(request): Json<GrantRoleRequest>,
) -> Result<Json<MessageResponse>, RbacError> {
    state
        .role_service
        .add_role_to_user(&username, &request.role)
        .await?;

    Ok(Json(MessageResponse::new("role granted")))
}

/// DELETE /api/admin/users/{username}/roles/{role}
async fn revoke_role_handler(
    State(state): State<Arc<AdminApiState>>,
    Path((username, role)): Path<(String, String)>,
) -> Result<Json<MessageResponse>, RbacError> {
    state
        .role_service
        .remove_role_from_user(&username, &role)
        .await?;

    Ok(Json(MessageResponse::new("role revoked")))
}

/// PUT /api/admin/users/{username}/enabled
async fn set_enabled_handler(
    State(state): State<Arc<AdminApiState>>,
    Path(username): Path<String>,
    Json(request): Json<SetEnabledRequest>,
) -> Result<Json<MessageResponse>, RbacError> {
    state
        .role_service
        .set_user_enabled(&username, request.enabled)
        .await?;

    Ok(Json(MessageResponse::new("user updated")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::auth::jwt::{JwtConfig, TokenCodec};
    use crate::core::auth::middleware::authenticate;
    use crate::core::db::models::{Role as RoleModel, User};
    use axum::{body::Body, http::Request as HttpRequest, http::header, routing::get as get_route};
    use chrono::Utc;
    use tower::ServiceExt;
    use uuid::Uuid;

    fn test_codec() -> TokenCodec {
        TokenCodec::new(
            JwtConfig::new("test_secret_key_for_testing_only_48_bytes_long!!").unwrap(),
        )
    }

    fn token_with_roles(codec: &TokenCodec, roles: &[&str]) -> String {
        let user = User {
            id: Uuid::new_v4(),
            username: "admin".to_string(),
            password_hash: "$2b$12$irrelevant".to_string(),
            email: None,
            enabled: true,
            created_at: Utc::now(),
            last_login: None,
        };
        let roles: Vec<RoleModel> = roles
            .iter()
            .map(|name| RoleModel {
                id: Uuid::new_v4(),
                name: name.to_string(),
                description: None,
            })
            .collect();
        codec.issue(&user, &roles, &[]).unwrap()
    }

    fn guarded_app(codec: TokenCodec) -> Router {
        Router::new()
            .route("/guarded", get_route(|| async { "ok" }))
            .layer(middleware::from_fn(require_admin))
            .layer(axum::middleware::from_fn_with_state(codec, authenticate))
    }

    #[tokio::test]
    async fn test_admin_guard_rejects_unauthenticated() {
        let app = guarded_app(test_codec());

        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/guarded")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_guard_rejects_non_admin() {
        let codec = test_codec();
        let token = token_with_roles(&codec, &["USER"]);
        let app = guarded_app(codec);

        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/guarded")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_admin_guard_allows_admin() {
        let codec = test_codec();
        let token = token_with_roles(&codec, &["USER", "ADMIN"]);
        let app = guarded_app(codec);

        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/guarded")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_rbac_error_status_mapping() {
        let response = RbacError::RoleNotFound("X".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = RbacError::RoleAlreadyExists("X".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = RbacError::RoleInUse {
            name: "X".to_string(),
            count: 1,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = RbacError::Store("down".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
