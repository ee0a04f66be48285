//! User-facing auth endpoints
//!
//! - POST /api/user/login - verify credentials and issue a session token
//! - POST /api/user/register - create an account with the default role
//! - POST /api/user/refresh - re-sign a still-valid token
//! - GET  /api/user/profile - full profile for the authenticated user

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core::auth::jwt::TokenError;
use crate::core::auth::middleware::{AccessDenied, CurrentUser, bearer_token};
use crate::core::auth::service::{AuthError, AuthService};
use crate::core::db::models::{NewUser, UserResponse};

/// Roles accepted by the profile endpoint
const PROFILE_ROLES: &[&str] = &["USER", "ADMIN"];

/// Auth API state
#[derive(Clone)]
pub struct AuthApiState {
    pub auth_service: AuthService,
}

/// API error response body
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
}

impl ApiError {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
            AuthError::DuplicateAccount => (StatusCode::BAD_REQUEST, "DUPLICATE_USERNAME"),
            AuthError::Token(TokenError::Expired) => (StatusCode::UNAUTHORIZED, "TOKEN_EXPIRED"),
            AuthError::Token(TokenError::Malformed) => {
                (StatusCode::UNAUTHORIZED, "TOKEN_MALFORMED")
            }
            AuthError::Token(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            AuthError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORE_FAILURE"),
        };

        let body = ApiError::new(self.to_string(), code);

        (status, Json(body)).into_response()
    }
}

/// Login request body
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response with the issued token and user payload
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    pub user: UserResponse,
}

/// Response for token refresh
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub token: String,
}

/// Generic message response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Create the user API router
pub fn user_api_router(state: AuthApiState) -> Router {
    let state = Arc::new(state);

    Router::new()
        .route("/api/user/login", post(login_handler))
        .route("/api/user/register", post(register_handler))
        .route("/api/user/refresh", post(refresh_handler))
        .route("/api/user/profile", get(profile_handler))
        .with_state(state)
}

/// POST /api/user/login
async fn login_handler(
    State(state): State<Arc<AuthApiState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AuthError> {
    let user = state
        .auth_service
        .login(&request.username, &request.password)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    let token = state.auth_service.issue_token(&user).await?;
    let roles = state.auth_service.roles_for(&user).await?;

    Ok(Json(LoginResponse {
        message: "login successful".to_string(),
        token,
        user: UserResponse::new(&user, &roles),
    }))
}

/// POST /api/user/register
async fn register_handler(
    State(state): State<Arc<AuthApiState>>,
    Json(request): Json<NewUser>,
) -> Result<Json<MessageResponse>, AuthError> {
    tracing::info!("registration attempt for username: {}", request.username);

    state.auth_service.register(request).await?;

    Ok(Json(MessageResponse::new("registration successful")))
}

/// POST /api/user/refresh
///
/// Re-signs the presented token with a fresh lifetime. The claim snapshot is
/// carried over as-is.
async fn refresh_handler(
    State(state): State<Arc<AuthApiState>>,
    headers: HeaderMap,
) -> Result<Json<RefreshResponse>, AuthError> {
    let token = bearer_token(&headers).ok_or(AuthError::Token(TokenError::Malformed))?;

    let token = state.auth_service.refresh_token(token)?;

    Ok(Json(RefreshResponse { token }))
}

/// GET /api/user/profile
async fn profile_handler(
    State(state): State<Arc<AuthApiState>>,
    CurrentUser(identity): CurrentUser,
) -> Response {
    if !identity.has_any_role(PROFILE_ROLES) {
        return AccessDenied::forbidden("USER or ADMIN role required").into_response();
    }

    match state.auth_service.find_profile(&identity.principal).await {
        Ok(Some(profile)) => Json(profile).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ApiError::new("user not found", "USER_NOT_FOUND")),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_serialization() {
        let error = ApiError::new("something went wrong", "ERROR_CODE");
        let json = serde_json::to_string(&error).unwrap();

        assert!(json.contains("something went wrong"));
        assert!(json.contains("ERROR_CODE"));
    }

    #[test]
    fn test_login_request_deserialization() {
        let json = r#"{"username": "alice", "password": "secret"}"#;

        let request: LoginRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.username, "alice");
        assert_eq!(request.password, "secret");
    }

    #[test]
    fn test_message_response_serialization() {
        let response = MessageResponse::new("registration successful");
        let json = serde_json::to_string(&response).unwrap();

        assert!(json.contains("registration successful"));
    }

    #[test]
    fn test_auth_error_status_mapping() {
        let response = AuthError::InvalidCredentials.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = AuthError::DuplicateAccount.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = AuthError::Token(TokenError::Expired).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = AuthError::Store("connection lost".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
