mod error;
mod json;
mod response;
mod session;
mod users;

use axum::Router;
use std::sync::Arc;

use crate::db::Database;
use crate::jwt::JwtConfig;
use crate::rate_limit::LoginRateLimit;
use crate::session::SessionController;

pub use error::{ApiError, ResultExt};
pub use json::ApiJson;
pub use response::ApiResponse;
pub use session::SessionState;
pub use users::UsersState;

/// Create the user API router (mounted under `/api/v1/users`).
pub fn create_api_router(
    db: Database,
    jwt: Arc<JwtConfig>,
    secure_cookies: bool,
    login_rate_limit: Option<LoginRateLimit>,
) -> Router {
    let session_state = session::SessionState {
        sessions: SessionController::new(db.clone(), jwt.clone()),
        db: db.clone(),
        jwt: jwt.clone(),
        secure_cookies,
    };

    let users_state = users::UsersState { db, jwt };

    Router::new()
        .merge(session::router(session_state, login_rate_limit))
        .merge(users::router(users_state))
}
