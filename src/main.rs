use axum::{Router, middleware};
use tower_http::trace::TraceLayer;

use warden::core::auth::{AuthApiState, AuthService, TokenCodec, authenticate, user_api_router};
use warden::core::config::AppConfig;
use warden::core::db::{
    PermissionRepository, RoleRepository, UserRepository, create_pool_with_migrations,
};
use warden::core::rbac::{AdminApiState, RoleService, admin_api_router};

#[tokio::main]
async fn main() {
    // Load .env file (if exists)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("invalid configuration: {}", err);
            std::process::exit(1);
        }
    };

    tracing::info!(
        "config loaded: bind={}, token_lifetime={}s",
        config.bind_addr,
        config.jwt.lifetime_secs
    );

    let pool = match create_pool_with_migrations(&config.database).await {
        Ok(pool) => pool,
        Err(err) => {
            tracing::error!("database setup failed: {}", err);
            std::process::exit(1);
        }
    };

    // The signing key lives in the codec, initialized once and never mutated.
    let codec = TokenCodec::new(config.jwt.clone());

    let users = UserRepository::new(pool.clone());
    let roles = RoleRepository::new(pool.clone());
    let permissions = PermissionRepository::new(pool);

    let auth_service = AuthService::new(users.clone(), roles.clone(), codec.clone());
    let role_service = RoleService::new(roles, permissions, users);

    // Authentication runs ahead of every route so the request identity is in
    // place before any policy check; the admin router carries its own guard.
    let app = Router::new()
        .merge(user_api_router(AuthApiState { auth_service }))
        .merge(admin_api_router(AdminApiState { role_service }))
        .layer(middleware::from_fn_with_state(codec, authenticate))
        .layer(TraceLayer::new_for_http());

    tracing::info!("listening on http://{}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .unwrap();
    axum::serve(listener, app.into_make_service()).await.unwrap();
}
