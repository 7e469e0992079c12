//! Account and profile endpoints.

use axum::{
    Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, patch, post},
};
use serde::Deserialize;
use std::sync::Arc;

use super::error::{ApiError, ResultExt, is_unique_violation};
use super::json::ApiJson;
use super::response::ApiResponse;
use crate::auth::CurrentUser;
use crate::db::{Database, NewUser, PublicUser};
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;
use crate::password::spawn_hash_password;

#[derive(Clone)]
pub struct UsersState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
}

impl_has_auth_backend!(UsersState);

pub fn router(state: UsersState) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/current-user", get(current_user))
        .route("/update-account", patch(update_account))
        .route("/avatar", patch(update_avatar))
        .route("/cover-image", patch(update_cover_image))
        .route("/c/{username}", get(channel_profile))
        .route("/history", get(watch_history))
        .with_state(state)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest {
    #[serde(default)]
    full_name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
    /// URL of an already-uploaded avatar image
    #[serde(default)]
    avatar: String,
    #[serde(default)]
    cover_image: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateAccountRequest {
    #[serde(default)]
    full_name: String,
    #[serde(default)]
    email: String,
}

#[derive(Deserialize)]
struct AvatarRequest {
    #[serde(default)]
    avatar: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CoverImageRequest {
    #[serde(default)]
    cover_image: String,
}

async fn register(
    State(state): State<UsersState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let full_name = payload.full_name.trim();
    let email = payload.email.trim();
    let username = payload.username.trim().to_lowercase();

    if [full_name, email, username.as_str(), payload.password.as_str()]
        .iter()
        .any(|field| field.trim().is_empty())
    {
        return Err(ApiError::bad_request("All fields are required"));
    }

    let avatar = payload.avatar.trim();
    if avatar.is_empty() {
        return Err(ApiError::bad_request("Avatar file is required"));
    }

    let taken = state
        .db
        .users()
        .exists(&username, email)
        .await
        .db_err("Failed to check existing users")?;
    if taken {
        return Err(ApiError::conflict(
            "User with email or username already exists",
        ));
    }

    let password_hash = spawn_hash_password(payload.password.clone()).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to hash password");
        ApiError::internal("Something went wrong while registering the user")
    })?;

    let new_user = NewUser {
        username: &username,
        email,
        full_name,
        password_hash: &password_hash,
        avatar,
        cover_image: payload.cover_image.as_deref().map(str::trim).unwrap_or(""),
    };

    let id = match state.db.users().create(&new_user).await {
        Ok(id) => id,
        // Lost a race with a concurrent registration
        Err(e) if is_unique_violation(&e) => {
            return Err(ApiError::conflict(
                "User with email or username already exists",
            ));
        }
        Err(e) => return Err(ApiError::db_error("Failed to create user", e)),
    };

    let created = state
        .db
        .users()
        .get_by_id(&id)
        .await
        .db_err("Failed to load created user")?
        .ok_or_else(|| ApiError::internal("Something went wrong while registering the user"))?;

    tracing::info!(user_id = %id, "User registered");

    Ok(ApiResponse::created(
        PublicUser::from(created),
        "User registered successfully",
    ))
}

async fn current_user(CurrentUser(user): CurrentUser) -> impl IntoResponse {
    ApiResponse::ok(user, "Current user fetched successfully")
}

async fn update_account(
    State(state): State<UsersState>,
    CurrentUser(user): CurrentUser,
    ApiJson(payload): ApiJson<UpdateAccountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let full_name = payload.full_name.trim();
    let email = payload.email.trim();

    if full_name.is_empty() || email.is_empty() {
        return Err(ApiError::bad_request("All fields are required"));
    }

    let updated = match state.db.users().update_account(&user.id, full_name, email).await {
        Ok(updated) => updated,
        Err(e) if is_unique_violation(&e) => {
            return Err(ApiError::conflict("Email is already in use"));
        }
        Err(e) => return Err(ApiError::db_error("Failed to update account", e)),
    }
    .ok_or_else(|| ApiError::unauthorized("Invalid Access Token"))?;

    Ok(ApiResponse::ok(
        PublicUser::from(updated),
        "Account details updated successfully",
    ))
}

async fn update_avatar(
    State(state): State<UsersState>,
    CurrentUser(user): CurrentUser,
    ApiJson(payload): ApiJson<AvatarRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let avatar = payload.avatar.trim();
    if avatar.is_empty() {
        return Err(ApiError::bad_request("Avatar file is missing"));
    }

    let updated = state
        .db
        .users()
        .set_avatar(&user.id, avatar)
        .await
        .db_err("Failed to update avatar")?
        .ok_or_else(|| ApiError::unauthorized("Invalid Access Token"))?;

    Ok(ApiResponse::ok(
        PublicUser::from(updated),
        "Avatar image updated successfully",
    ))
}

async fn update_cover_image(
    State(state): State<UsersState>,
    CurrentUser(user): CurrentUser,
    ApiJson(payload): ApiJson<CoverImageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let cover_image = payload.cover_image.trim();
    if cover_image.is_empty() {
        return Err(ApiError::bad_request("Cover image file is missing"));
    }

    let updated = state
        .db
        .users()
        .set_cover_image(&user.id, cover_image)
        .await
        .db_err("Failed to update cover image")?
        .ok_or_else(|| ApiError::unauthorized("Invalid Access Token"))?;

    Ok(ApiResponse::ok(
        PublicUser::from(updated),
        "Cover image updated successfully",
    ))
}

async fn channel_profile(
    State(state): State<UsersState>,
    CurrentUser(viewer): CurrentUser,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(ApiError::bad_request("Username is missing"));
    }

    let channel = state
        .db
        .subscriptions()
        .channel_profile(&username.to_lowercase(), &viewer.id)
        .await
        .db_err("Failed to load channel profile")?
        .ok_or_else(|| ApiError::not_found("Channel does not exist"))?;

    Ok(ApiResponse::ok(channel, "User channel fetched successfully"))
}

async fn watch_history(
    State(state): State<UsersState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let history = state
        .db
        .videos()
        .watch_history(&user.id)
        .await
        .db_err("Failed to load watch history")?;

    Ok(ApiResponse::ok(history, "Watch history fetched successfully"))
}
