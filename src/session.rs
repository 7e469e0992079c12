//! Session lifecycle: login, refresh, logout and password change.
//!
//! Each user has at most one live refresh token, stored on the user record.
//! Issuing a new one overwrites the old value, so a superseded token is rejected
//! even while it is still cryptographically valid. Refresh rotation is a single
//! conditional write: of two concurrent refreshes with the same token, only one wins.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::db::{Database, PublicUser, User};
use crate::jwt::{IssuedToken, JwtConfig};
use crate::password::{spawn_hash_password, spawn_verify_password};

const TOKEN_GENERATION_FAILED: &str =
    "Something went wrong while generating refresh and access token";
const REFRESH_TOKEN_REUSED: &str = "Refresh token is used or expired";

/// Errors surfaced by session operations. Each carries a user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("{0}")]
    BadRequest(&'static str),
    #[error("{0}")]
    Unauthorized(&'static str),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    Internal(&'static str),
}

/// Freshly issued access and refresh tokens.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: PublicUser,
    pub tokens: TokenPair,
}

/// Login credentials. Either identifier may be used.
#[derive(Debug, Clone, Default)]
pub struct Credentials<'a> {
    pub username: Option<&'a str>,
    pub email: Option<&'a str>,
    pub password: &'a str,
}

/// Orchestrates the session flows over the user store and the token signer.
#[derive(Clone)]
pub struct SessionController {
    db: Database,
    jwt: Arc<JwtConfig>,
}

impl SessionController {
    pub fn new(db: Database, jwt: Arc<JwtConfig>) -> Self {
        Self { db, jwt }
    }

    /// Verify credentials and start a new session, replacing any previous one.
    pub async fn login(&self, credentials: &Credentials<'_>) -> Result<LoginOutcome, SessionError> {
        let username = non_blank(credentials.username).map(str::to_lowercase);
        let email = non_blank(credentials.email);

        if username.is_none() && email.is_none() {
            return Err(SessionError::BadRequest("Username or email required"));
        }
        if credentials.password.trim().is_empty() {
            return Err(SessionError::BadRequest("Password is required"));
        }

        let user = self
            .db
            .users()
            .find_by_identifier(username.as_deref(), email)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to look up user");
                SessionError::Internal("Database error")
            })?
            .ok_or(SessionError::NotFound("User doesn't exist"))?;

        let verified = spawn_verify_password(
            credentials.password.to_string(),
            user.password_hash.clone(),
        )
        .await;
        if !verified {
            info!(user_id = %user.id, "Login rejected: invalid password");
            return Err(SessionError::Unauthorized("Invalid user credentials"));
        }

        let tokens = self.issue_pair(&user)?;

        match self
            .db
            .users()
            .set_refresh_token(&user.id, &tokens.refresh.token)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                error!(user_id = %user.id, "User disappeared while storing refresh token");
                return Err(SessionError::Internal(TOKEN_GENERATION_FAILED));
            }
            Err(e) => {
                error!(user_id = %user.id, error = %e, "Failed to store refresh token");
                return Err(SessionError::Internal(TOKEN_GENERATION_FAILED));
            }
        }

        info!(user_id = %user.id, "User logged in");

        Ok(LoginOutcome {
            user: user.into(),
            tokens,
        })
    }

    /// Exchange the current refresh token for a new access/refresh pair.
    pub async fn refresh(&self, presented: Option<&str>) -> Result<TokenPair, SessionError> {
        let presented =
            non_blank(presented).ok_or(SessionError::Unauthorized("Unauthorized request"))?;

        let claims = self
            .jwt
            .verify_refresh_token(presented)
            .map_err(|_| SessionError::Unauthorized("Invalid refresh token"))?;

        let user = self
            .db
            .users()
            .get_by_id(&claims.sub)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to look up user");
                SessionError::Internal("Database error")
            })?
            .ok_or(SessionError::Unauthorized("Invalid refresh token"))?;

        if user.refresh_token.as_deref() != Some(presented) {
            warn!(user_id = %user.id, "Rejected superseded refresh token");
            return Err(SessionError::Unauthorized(REFRESH_TOKEN_REUSED));
        }

        let tokens = self.issue_pair(&user)?;

        let swapped = self
            .db
            .users()
            .replace_refresh_token(&user.id, presented, &tokens.refresh.token)
            .await
            .map_err(|e| {
                error!(user_id = %user.id, error = %e, "Failed to rotate refresh token");
                SessionError::Internal(TOKEN_GENERATION_FAILED)
            })?;

        if !swapped {
            warn!(user_id = %user.id, "Refresh token rotated concurrently");
            return Err(SessionError::Unauthorized(REFRESH_TOKEN_REUSED));
        }

        info!(user_id = %user.id, "Session refreshed");
        Ok(tokens)
    }

    /// End the user's session server-side by dropping the stored refresh token.
    pub async fn logout(&self, user_id: &str) -> Result<(), SessionError> {
        self.db
            .users()
            .clear_refresh_token(user_id)
            .await
            .map_err(|e| {
                error!(user_id = %user_id, error = %e, "Failed to clear refresh token");
                SessionError::Internal("Database error")
            })?;

        info!(user_id = %user_id, "User logged out");
        Ok(())
    }

    /// Replace the password after checking the old one.
    pub async fn change_password(
        &self,
        user_id: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), SessionError> {
        if old_password.trim().is_empty() || new_password.trim().is_empty() {
            return Err(SessionError::BadRequest("Old and new password are required"));
        }

        let user = self
            .db
            .users()
            .get_by_id(user_id)
            .await
            .map_err(|e| {
                error!(user_id = %user_id, error = %e, "Failed to look up user");
                SessionError::Internal("Database error")
            })?
            .ok_or(SessionError::Unauthorized("Invalid Access Token"))?;

        let verified =
            spawn_verify_password(old_password.to_string(), user.password_hash.clone()).await;
        if !verified {
            return Err(SessionError::BadRequest("Invalid old password"));
        }

        let hash = spawn_hash_password(new_password.to_string()).await.map_err(|e| {
            error!(user_id = %user_id, error = %e, "Failed to hash password");
            SessionError::Internal("Failed to update password")
        })?;

        self.db
            .users()
            .set_password_hash(user_id, &hash)
            .await
            .map_err(|e| {
                error!(user_id = %user_id, error = %e, "Failed to store password");
                SessionError::Internal("Database error")
            })?;

        info!(user_id = %user_id, "Password changed");
        Ok(())
    }

    fn issue_pair(&self, user: &User) -> Result<TokenPair, SessionError> {
        let access = self.jwt.issue_access_token(user);
        let refresh = self.jwt.issue_refresh_token(user);

        match (access, refresh) {
            (Ok(access), Ok(refresh)) => Ok(TokenPair { access, refresh }),
            (Err(e), _) | (_, Err(e)) => {
                error!(user_id = %user.id, error = %e, "Failed to sign tokens");
                Err(SessionError::Internal(TOKEN_GENERATION_FAILED))
            }
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::NewUser;
    use crate::jwt::TokenSettings;
    use crate::password::hash_password;

    async fn setup() -> (SessionController, Database, Arc<JwtConfig>, String) {
        let db = Database::open(":memory:").await.unwrap();
        let jwt = Arc::new(JwtConfig::new(
            &TokenSettings::new(b"access-secret-key-for-testing-0000".to_vec(), 600),
            &TokenSettings::new(b"refresh-secret-key-for-testing-000".to_vec(), 3600),
        ));

        let hash = hash_password("P@ss1").unwrap();
        let id = db
            .users()
            .create(&NewUser {
                username: "ana",
                email: "a@x.com",
                full_name: "Ana",
                password_hash: &hash,
                avatar: "https://img.example/ana.png",
                cover_image: "",
            })
            .await
            .unwrap();

        (SessionController::new(db.clone(), jwt.clone()), db, jwt, id)
    }

    fn by_username<'a>(username: &'a str, password: &'a str) -> Credentials<'a> {
        Credentials {
            username: Some(username),
            email: None,
            password,
        }
    }

    #[tokio::test]
    async fn test_login_issues_tokens_for_user() {
        let (sessions, db, jwt, id) = setup().await;

        let outcome = sessions.login(&by_username("ana", "P@ss1")).await.unwrap();
        assert_eq!(outcome.user.id, id);

        let claims = jwt.verify_access_token(&outcome.tokens.access.token).unwrap();
        assert_eq!(claims.sub, id);

        let stored = db.users().get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.refresh_token, Some(outcome.tokens.refresh.token));
    }

    #[tokio::test]
    async fn test_login_by_email_and_mixed_case_username() {
        let (sessions, _, _, id) = setup().await;

        let by_email = Credentials {
            username: None,
            email: Some("a@x.com"),
            password: "P@ss1",
        };
        assert_eq!(sessions.login(&by_email).await.unwrap().user.id, id);

        let outcome = sessions.login(&by_username("ANA", "P@ss1")).await.unwrap();
        assert_eq!(outcome.user.id, id);
    }

    #[tokio::test]
    async fn test_login_failures() {
        let (sessions, db, _, id) = setup().await;

        let missing_identifier = Credentials {
            username: Some("  "),
            email: None,
            password: "P@ss1",
        };
        assert_eq!(
            sessions.login(&missing_identifier).await.unwrap_err(),
            SessionError::BadRequest("Username or email required")
        );

        assert!(matches!(
            sessions.login(&by_username("ana", "")).await,
            Err(SessionError::BadRequest(_))
        ));
        assert!(matches!(
            sessions.login(&by_username("nobody", "P@ss1")).await,
            Err(SessionError::NotFound(_))
        ));
        assert!(matches!(
            sessions.login(&by_username("ana", "wrong")).await,
            Err(SessionError::Unauthorized(_))
        ));

        // Failed logins never start a session
        let stored = db.users().get_by_id(&id).await.unwrap().unwrap();
        assert!(stored.refresh_token.is_none());
    }

    #[tokio::test]
    async fn test_refresh_rotates_and_rejects_superseded_token() {
        let (sessions, db, _, id) = setup().await;

        let login = sessions.login(&by_username("ana", "P@ss1")).await.unwrap();
        let first = login.tokens.refresh.token;

        let rotated = sessions.refresh(Some(&first)).await.unwrap();
        assert_ne!(rotated.refresh.token, first);

        let stored = db.users().get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.refresh_token.as_deref(), Some(rotated.refresh.token.as_str()));

        assert_eq!(
            sessions.refresh(Some(&first)).await.unwrap_err(),
            SessionError::Unauthorized(REFRESH_TOKEN_REUSED)
        );

        // The rejected attempt leaves the live session alone
        assert!(sessions.refresh(Some(&rotated.refresh.token)).await.is_ok());
    }

    #[tokio::test]
    async fn test_second_login_supersedes_first() {
        let (sessions, _, _, _) = setup().await;

        let first = sessions.login(&by_username("ana", "P@ss1")).await.unwrap();
        let second = sessions.login(&by_username("ana", "P@ss1")).await.unwrap();

        assert!(sessions.refresh(Some(&first.tokens.refresh.token)).await.is_err());
        assert!(sessions.refresh(Some(&second.tokens.refresh.token)).await.is_ok());
    }

    #[tokio::test]
    async fn test_refresh_rejects_missing_and_invalid_tokens() {
        let (sessions, _, jwt, _) = setup().await;

        assert_eq!(
            sessions.refresh(None).await.unwrap_err(),
            SessionError::Unauthorized("Unauthorized request")
        );
        assert_eq!(
            sessions.refresh(Some("")).await.unwrap_err(),
            SessionError::Unauthorized("Unauthorized request")
        );
        assert_eq!(
            sessions.refresh(Some("garbage")).await.unwrap_err(),
            SessionError::Unauthorized("Invalid refresh token")
        );

        // An access token is signed with the other secret
        let login = sessions.login(&by_username("ana", "P@ss1")).await.unwrap();
        assert!(sessions.refresh(Some(&login.tokens.access.token)).await.is_err());

        // Valid signature, but the user is gone
        let ghost = User {
            id: "deleted-user".to_string(),
            username: "ghost".to_string(),
            email: "g@x.com".to_string(),
            full_name: String::new(),
            password_hash: String::new(),
            refresh_token: None,
            avatar: String::new(),
            cover_image: String::new(),
            created_at: String::new(),
            updated_at: String::new(),
        };
        let orphan = jwt.issue_refresh_token(&ghost).unwrap();
        assert_eq!(
            sessions.refresh(Some(&orphan.token)).await.unwrap_err(),
            SessionError::Unauthorized("Invalid refresh token")
        );
    }

    #[tokio::test]
    async fn test_concurrent_refresh_has_single_winner() {
        let (sessions, _, _, _) = setup().await;
        let login = sessions.login(&by_username("ana", "P@ss1")).await.unwrap();
        let token = login.tokens.refresh.token;

        let (a, b) = tokio::join!(sessions.refresh(Some(&token)), sessions.refresh(Some(&token)));

        let wins = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
        assert_eq!(wins, 1);
    }

    #[tokio::test]
    async fn test_logout_invalidates_refresh_token() {
        let (sessions, db, _, id) = setup().await;
        let login = sessions.login(&by_username("ana", "P@ss1")).await.unwrap();

        sessions.logout(&id).await.unwrap();

        let stored = db.users().get_by_id(&id).await.unwrap().unwrap();
        assert!(stored.refresh_token.is_none());
        assert_eq!(
            sessions
                .refresh(Some(&login.tokens.refresh.token))
                .await
                .unwrap_err(),
            SessionError::Unauthorized(REFRESH_TOKEN_REUSED)
        );
    }

    #[tokio::test]
    async fn test_change_password() {
        let (sessions, _, _, id) = setup().await;

        assert_eq!(
            sessions.change_password(&id, "wrong", "N3w!").await.unwrap_err(),
            SessionError::BadRequest("Invalid old password")
        );
        assert!(matches!(
            sessions.change_password(&id, "P@ss1", "").await,
            Err(SessionError::BadRequest(_))
        ));

        sessions.change_password(&id, "P@ss1", "N3w!").await.unwrap();

        assert!(matches!(
            sessions.login(&by_username("ana", "P@ss1")).await,
            Err(SessionError::Unauthorized(_))
        ));
        assert!(sessions.login(&by_username("ana", "N3w!")).await.is_ok());
    }

    #[tokio::test]
    async fn test_blank_passwords_rejected_without_write() {
        let (sessions, db, _, id) = setup().await;
        let before = db.users().get_by_id(&id).await.unwrap().unwrap();

        assert_eq!(
            sessions.change_password(&id, "P@ss1", "   ").await.unwrap_err(),
            SessionError::BadRequest("Old and new password are required")
        );
        assert_eq!(
            sessions.change_password(&id, " \t", "N3w!").await.unwrap_err(),
            SessionError::BadRequest("Old and new password are required")
        );

        let after = db.users().get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(before.password_hash, after.password_hash);

        assert_eq!(
            sessions.login(&by_username("ana", "  ")).await.unwrap_err(),
            SessionError::BadRequest("Password is required")
        );
    }

    #[tokio::test]
    async fn test_change_password_unknown_user() {
        let (sessions, _, _, _) = setup().await;

        assert!(matches!(
            sessions.change_password("missing", "P@ss1", "N3w!").await,
            Err(SessionError::Unauthorized(_))
        ));
    }
}
