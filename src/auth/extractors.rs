//! Axum extractors for authentication.

use axum::{extract::FromRequestParts, http::request::Parts};

use super::cookie::{ACCESS_COOKIE_NAME, bearer_token, get_cookie};
use super::errors::{ApiAuthError, AuthErrorKind};
use super::state::HasAuthBackend;
use crate::db::PublicUser;

/// Verify the request's access token and load the user it names.
async fn authenticate_request<S>(parts: &Parts, state: &S) -> Result<PublicUser, AuthErrorKind>
where
    S: HasAuthBackend + Send + Sync,
{
    let token = get_cookie(&parts.headers, ACCESS_COOKIE_NAME)
        .filter(|t| !t.is_empty())
        .or_else(|| bearer_token(&parts.headers))
        .ok_or(AuthErrorKind::NotAuthenticated)?;

    let claims = state
        .jwt()
        .verify_access_token(token)
        .map_err(|_| AuthErrorKind::InvalidToken)?;

    let user = state
        .db()
        .users()
        .get_by_id(&claims.sub)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get user: {}", e);
            AuthErrorKind::DatabaseError
        })?
        .ok_or(AuthErrorKind::UserNotFound)?;

    Ok(user.into())
}

/// Extractor for API endpoints that require a valid access token.
/// Yields the sanitized user record; returns JSON errors on failure.
pub struct CurrentUser(pub PublicUser);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: HasAuthBackend + Send + Sync,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        authenticate_request(parts, state)
            .await
            .map(CurrentUser)
            .map_err(ApiAuthError::new)
    }
}
