//! Access-token authentication for API routes.
//!
//! Requests authenticate with the short-lived access token, read from the
//! `accessToken` cookie or an `Authorization: Bearer` header. Refresh tokens are
//! only ever exchanged at the refresh endpoint.

mod cookie;
mod errors;
mod extractors;
mod ip;
mod state;

pub use cookie::{
    ACCESS_COOKIE_NAME, REFRESH_COOKIE_NAME, bearer_token, clear_cookie, get_cookie, token_cookie,
};
pub use errors::ApiAuthError;
pub use extractors::CurrentUser;
pub use ip::extract_client_ip;
pub use state::HasAuthBackend;
