//! Session endpoints.
//!
//! - POST `/login` - Verify credentials, issue tokens and set both cookies
//! - POST `/logout` - Drop the stored refresh token and clear both cookies
//! - POST `/refreshToken` - Rotate the refresh token and issue a new access token
//! - POST `/change-password` - Replace the password after checking the old one

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderName, header::SET_COOKIE},
    middleware,
    response::{AppendHeaders, IntoResponse},
    routing::post,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::ApiError;
use super::json::ApiJson;
use super::response::{ApiResponse, Empty};
use crate::auth::{
    ACCESS_COOKIE_NAME, CurrentUser, REFRESH_COOKIE_NAME, clear_cookie, get_cookie, token_cookie,
};
use crate::db::{Database, PublicUser};
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;
use crate::rate_limit::{LoginRateLimit, rate_limit_login};
use crate::session::{Credentials, SessionController, TokenPair};

#[derive(Clone)]
pub struct SessionState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub sessions: SessionController,
    pub secure_cookies: bool,
}

impl_has_auth_backend!(SessionState);

pub fn router(state: SessionState, login_rate_limit: Option<LoginRateLimit>) -> Router {
    let login_router = Router::new()
        .route("/login", post(login))
        .with_state(state.clone());

    let login_router = match login_rate_limit {
        Some(limit) => login_router.layer(middleware::from_fn_with_state(limit, rate_limit_login)),
        None => login_router,
    };

    Router::new()
        .route("/logout", post(logout))
        .route("/refreshToken", post(refresh_token))
        .route("/change-password", post(change_password))
        .with_state(state)
        .merge(login_router)
}

#[derive(Deserialize)]
struct LoginRequest {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    user: PublicUser,
    access_token: String,
    refresh_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenPairResponse {
    access_token: String,
    refresh_token: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangePasswordRequest {
    #[serde(default)]
    old_password: String,
    #[serde(default)]
    new_password: String,
}

/// `Set-Cookie` values for a freshly issued token pair.
fn session_cookies(tokens: &TokenPair, secure: bool) -> AppendHeaders<[(HeaderName, String); 2]> {
    AppendHeaders([
        (
            SET_COOKIE,
            token_cookie(
                ACCESS_COOKIE_NAME,
                &tokens.access.token,
                tokens.access.duration,
                secure,
            ),
        ),
        (
            SET_COOKIE,
            token_cookie(
                REFRESH_COOKIE_NAME,
                &tokens.refresh.token,
                tokens.refresh.duration,
                secure,
            ),
        ),
    ])
}

async fn login(
    State(state): State<SessionState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let credentials = Credentials {
        username: payload.username.as_deref(),
        email: payload.email.as_deref(),
        password: &payload.password,
    };

    let outcome = state.sessions.login(&credentials).await?;
    let cookies = session_cookies(&outcome.tokens, state.secure_cookies);

    Ok((
        cookies,
        ApiResponse::ok(
            LoginResponse {
                user: outcome.user,
                access_token: outcome.tokens.access.token,
                refresh_token: outcome.tokens.refresh.token,
            },
            "User logged in successfully",
        ),
    ))
}

async fn logout(
    State(state): State<SessionState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    state.sessions.logout(&user.id).await?;

    Ok((
        AppendHeaders([
            (SET_COOKIE, clear_cookie(ACCESS_COOKIE_NAME, state.secure_cookies)),
            (SET_COOKIE, clear_cookie(REFRESH_COOKIE_NAME, state.secure_cookies)),
        ]),
        ApiResponse::ok(Empty {}, "User logged out"),
    ))
}

/// The refresh token comes from the cookie, or from the JSON body for non-cookie clients.
async fn refresh_token(
    State(state): State<SessionState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let from_body = if body.is_empty() {
        RefreshRequest::default()
    } else {
        serde_json::from_slice::<RefreshRequest>(&body)
            .map_err(|_| ApiError::bad_request("Malformed JSON body"))?
    };

    let presented = get_cookie(&headers, REFRESH_COOKIE_NAME)
        .filter(|t| !t.is_empty())
        .or(from_body.refresh_token.as_deref());

    let tokens = state.sessions.refresh(presented).await?;
    let cookies = session_cookies(&tokens, state.secure_cookies);

    Ok((
        cookies,
        ApiResponse::ok(
            TokenPairResponse {
                access_token: tokens.access.token,
                refresh_token: tokens.refresh.token,
            },
            "Access token refreshed successfully",
        ),
    ))
}

async fn change_password(
    State(state): State<SessionState>,
    CurrentUser(user): CurrentUser,
    ApiJson(payload): ApiJson<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .sessions
        .change_password(&user.id, &payload.old_password, &payload.new_password)
        .await?;

    Ok(ApiResponse::ok(Empty {}, "Password changed successfully"))
}
