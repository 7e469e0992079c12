//! Authentication error types.

use axum::response::{IntoResponse, Response};

use crate::api::ApiError;

/// Internal auth error kind used by the access-token check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    NotAuthenticated,
    InvalidToken,
    UserNotFound,
    DatabaseError,
}

/// API authentication errors, rendered with the common JSON error body.
#[derive(Debug)]
pub struct ApiAuthError {
    kind: AuthErrorKind,
}

impl ApiAuthError {
    pub(super) fn new(kind: AuthErrorKind) -> Self {
        Self { kind }
    }
}

impl From<ApiAuthError> for ApiError {
    fn from(err: ApiAuthError) -> Self {
        match err.kind {
            AuthErrorKind::NotAuthenticated => ApiError::unauthorized("Unauthorized request"),
            AuthErrorKind::InvalidToken | AuthErrorKind::UserNotFound => {
                ApiError::unauthorized("Invalid Access Token")
            }
            AuthErrorKind::DatabaseError => ApiError::internal("Database error"),
        }
    }
}

impl IntoResponse for ApiAuthError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}
