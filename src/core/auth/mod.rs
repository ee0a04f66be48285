//! Authentication module
//!
//! Token-based authentication:
//! - session token issuance and verification (HS512)
//! - credential verification and account registration
//! - per-request authentication layer and request-scoped identity
//! - user-facing REST endpoints

pub mod api;
pub mod jwt;
pub mod middleware;
pub mod service;

pub use api::{ApiError, AuthApiState, MessageResponse, user_api_router};
pub use jwt::{Claims, JwtConfig, TokenCodec, TokenError};
pub use middleware::{AccessDenied, AuthContext, CurrentUser, authenticate, bearer_token};
pub use service::{AuthError, AuthService, DEFAULT_ROLE};
