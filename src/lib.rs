pub mod api;
pub mod auth;
pub mod cli;
pub mod db;
pub mod jwt;
pub mod password;
pub mod rate_limit;
pub mod session;

use api::create_api_router;
use axum::Router;
use db::Database;
use jwt::{JwtConfig, TokenSettings};
use rate_limit::LoginRateLimit;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Prefix under which all user endpoints are mounted.
pub const USERS_API_PATH: &str = "/api/v1/users";

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Secret and lifetime for access tokens
    pub access_token: TokenSettings,
    /// Secret and lifetime for refresh tokens
    pub refresh_token: TokenSettings,
    /// Whether to set Secure flag on cookies (should be true in production with HTTPS)
    pub secure_cookies: bool,
    /// Login attempts allowed per client IP per minute. `None` disables the limit.
    pub login_rate_limit: Option<NonZeroU32>,
    /// Read the client IP from `X-Forwarded-For` (requires running behind a proxy)
    pub trust_forwarded_for: bool,
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let jwt = Arc::new(JwtConfig::new(&config.access_token, &config.refresh_token));

    let login_rate_limit = config
        .login_rate_limit
        .map(|limit| LoginRateLimit::per_minute(limit, config.trust_forwarded_for));

    let api_router = create_api_router(
        config.db.clone(),
        jwt,
        config.secure_cookies,
        login_rate_limit,
    );

    Router::new().nest(USERS_API_PATH, api_router)
}

/// Run the server on the given listener. This function blocks until the server exits.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}
