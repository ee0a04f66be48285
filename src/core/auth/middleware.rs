//! Request authentication layer
//!
//! Runs once per inbound request ahead of every route: extracts a bearer
//! token, verifies it, and on success installs an [`AuthContext`] into the
//! request extensions. Verification failures are swallowed and the request
//! proceeds unauthenticated; rejecting such requests is the job of the
//! downstream policy checks, never of this layer.

use axum::{
    Json,
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, StatusCode, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::core::auth::api::ApiError;
use crate::core::auth::jwt::{Claims, TokenCodec};

/// Request-scoped authenticated identity.
///
/// Travels as an explicit request-extension value down the handler chain;
/// there is no ambient global security context.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Subject claim (username)
    pub principal: String,
    /// User identifier claim
    pub user_id: Uuid,
    /// Granted authorities: `ROLE_<name>` entries first, then bare
    /// permission names, in claim order
    pub authorities: Vec<String>,
}

impl AuthContext {
    /// Build the identity from a verified claim set
    pub fn from_claims(claims: &Claims) -> Self {
        Self {
            principal: claims.sub.clone(),
            user_id: claims.user_id,
            authorities: claims.authorities(),
        }
    }

    /// Check for an exact authority string
    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.iter().any(|a| a == authority)
    }

    /// Check for a role authority (`ROLE_<name>`)
    pub fn has_role(&self, role: &str) -> bool {
        self.has_authority(&format!("ROLE_{}", role))
    }

    /// Check for any of the listed roles
    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        roles.iter().any(|role| self.has_role(role))
    }
}

/// Extract the bearer token from the Authorization header, if present
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
}

/// Authentication middleware.
///
/// Always continues to the next stage, authenticated or not. An identity
/// already attached to the request is left untouched.
pub async fn authenticate(
    State(codec): State<TokenCodec>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = bearer_token(request.headers()).map(str::to_owned);

    if let Some(token) = token {
        match codec.verify(&token) {
            Ok(claims) => {
                if request.extensions().get::<AuthContext>().is_none() {
                    request
                        .extensions_mut()
                        .insert(AuthContext::from_claims(&claims));
                }
            }
            Err(err) => {
                // Swallowed: the request proceeds unauthenticated.
                tracing::debug!("bearer token rejected: {}", err);
            }
        }
    }

    next.run(request).await
}

/// Extractor for handlers that require an authenticated caller.
///
/// This is the entry point of the downstream policy layer: it rejects with
/// 401 when the authentication layer installed no identity.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub AuthContext);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AccessDenied;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AccessDenied::unauthorized("authentication required"))
    }
}

/// Policy-layer rejection
#[derive(Debug)]
pub struct AccessDenied {
    pub status: StatusCode,
    pub message: String,
}

impl AccessDenied {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message: message.into(),
        }
    }
}

impl IntoResponse for AccessDenied {
    fn into_response(self) -> Response {
        let code = if self.status == StatusCode::UNAUTHORIZED {
            "UNAUTHORIZED"
        } else {
            "FORBIDDEN"
        };
        let body = ApiError::new(self.message, code);

        (self.status, Json(body)).into_response()
    }
}
