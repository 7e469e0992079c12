use serde::Serialize;
use sqlx::sqlite::SqlitePool;

/// Column list matching the field order of [`User`].
macro_rules! user_columns {
    () => {
        "id, username, email, full_name, password_hash, refresh_token, avatar, cover_image, created_at, updated_at"
    };
}

#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

/// Full user record, including credentials. Never serialize this directly.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub refresh_token: Option<String>,
    pub avatar: String,
    pub cover_image: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Outward view of a user: no password hash, no refresh token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            avatar: user.avatar,
            cover_image: user.cover_image,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Fields required to insert a user. The password must already be hashed.
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub full_name: &'a str,
    pub password_hash: &'a str,
    pub avatar: &'a str,
    pub cover_image: &'a str,
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new user. The username is stored lower-cased. Returns the user ID.
    pub async fn create(&self, user: &NewUser<'_>) -> Result<String, sqlx::Error> {
        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO users (id, username, email, full_name, password_hash, avatar, cover_image)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(user.username.to_lowercase())
        .bind(user.email)
        .bind(user.full_name)
        .bind(user.password_hash)
        .bind(user.avatar)
        .bind(user.cover_image)
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as(concat!("SELECT ", user_columns!(), " FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Get a user by username (case-insensitive).
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
    }

    /// Find a user matching either the username or the email.
    /// A `None` identifier never matches.
    pub async fn find_by_identifier(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users WHERE username = ? OR email = ? LIMIT 1"
        ))
        .bind(username)
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    /// Check whether the username or the email is already registered.
    pub async fn exists(&self, username: &str, email: &str) -> Result<bool, sqlx::Error> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM users WHERE username = ? OR email = ?")
                .bind(username)
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        Ok(count.0 > 0)
    }

    /// Overwrite the stored refresh token, invalidating any previous one.
    pub async fn set_refresh_token(&self, id: &str, token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET refresh_token = ? WHERE id = ?")
            .bind(token)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Replace the stored refresh token only if it still equals `current`.
    /// Returns false when another writer rotated or cleared it first.
    pub async fn replace_refresh_token(
        &self,
        id: &str,
        current: &str,
        new: &str,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE users SET refresh_token = ? WHERE id = ? AND refresh_token = ?")
                .bind(new)
                .bind(id)
                .bind(current)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove the stored refresh token (logout).
    pub async fn clear_refresh_token(&self, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET refresh_token = NULL WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Replace the password hash.
    pub async fn set_password_hash(&self, id: &str, hash: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = ?, updated_at = datetime('now') WHERE id = ?",
        )
        .bind(hash)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Update display name and email, returning the updated record.
    pub async fn update_account(
        &self,
        id: &str,
        full_name: &str,
        email: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as(concat!(
            "UPDATE users SET full_name = ?, email = ?, updated_at = datetime('now') WHERE id = ? RETURNING ",
            user_columns!()
        ))
        .bind(full_name)
        .bind(email)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Point the avatar at a new image URL, returning the updated record.
    pub async fn set_avatar(&self, id: &str, avatar: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as(concat!(
            "UPDATE users SET avatar = ?, updated_at = datetime('now') WHERE id = ? RETURNING ",
            user_columns!()
        ))
        .bind(avatar)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Point the cover image at a new image URL, returning the updated record.
    pub async fn set_cover_image(
        &self,
        id: &str,
        cover_image: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as(concat!(
            "UPDATE users SET cover_image = ?, updated_at = datetime('now') WHERE id = ? RETURNING ",
            user_columns!()
        ))
        .bind(cover_image)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Delete a user by ID.
    pub async fn delete(&self, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
