//! Videos and per-user watch history.

use serde::Serialize;
use sqlx::sqlite::SqlitePool;

/// Minimal owner details attached to each watched video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoOwner {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub full_name: String,
    pub avatar: String,
}

/// A video in a user's watch history.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchedVideo {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub description: String,
    pub video_file: String,
    pub thumbnail: String,
    pub duration: f64,
    pub views: i64,
    pub is_published: bool,
    pub created_at: String,
    pub watched_at: String,
    pub owner: VideoOwner,
}

#[derive(sqlx::FromRow)]
struct WatchedVideoRow {
    id: String,
    title: String,
    description: String,
    video_file: String,
    thumbnail: String,
    duration_secs: f64,
    views: i64,
    is_published: bool,
    created_at: String,
    watched_at: String,
    owner_id: String,
    owner_username: String,
    owner_full_name: String,
    owner_avatar: String,
}

impl From<WatchedVideoRow> for WatchedVideo {
    fn from(row: WatchedVideoRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            video_file: row.video_file,
            thumbnail: row.thumbnail,
            duration: row.duration_secs,
            views: row.views,
            is_published: row.is_published,
            created_at: row.created_at,
            watched_at: row.watched_at,
            owner: VideoOwner {
                id: row.owner_id,
                username: row.owner_username,
                full_name: row.owner_full_name,
                avatar: row.owner_avatar,
            },
        }
    }
}

/// Fields required to insert a video.
#[derive(Debug, Clone)]
pub struct NewVideo<'a> {
    pub owner_id: &'a str,
    pub title: &'a str,
    pub description: &'a str,
    pub video_file: &'a str,
    pub thumbnail: &'a str,
    pub duration_secs: f64,
}

#[derive(Clone)]
pub struct VideoStore {
    pool: SqlitePool,
}

impl VideoStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a published video. Returns the video ID.
    pub async fn create(&self, video: &NewVideo<'_>) -> Result<String, sqlx::Error> {
        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO videos (id, owner_id, title, description, video_file, thumbnail, duration_secs)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(video.owner_id)
        .bind(video.title)
        .bind(video.description)
        .bind(video.video_file)
        .bind(video.thumbnail)
        .bind(video.duration_secs)
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    /// Append a video to the end of a user's watch history.
    pub async fn record_watch(&self, user_id: &str, video_id: &str) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO watch_history (user_id, video_id) VALUES (?, ?)")
            .bind(user_id)
            .bind(video_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// List a user's watched videos in the order they were watched.
    pub async fn watch_history(&self, user_id: &str) -> Result<Vec<WatchedVideo>, sqlx::Error> {
        let rows: Vec<WatchedVideoRow> = sqlx::query_as(
            "SELECT
                v.id, v.title, v.description, v.video_file, v.thumbnail,
                v.duration_secs, v.views, v.is_published, v.created_at,
                w.watched_at,
                o.id AS owner_id, o.username AS owner_username,
                o.full_name AS owner_full_name, o.avatar AS owner_avatar
            FROM watch_history w
            JOIN videos v ON v.id = w.video_id
            JOIN users o ON o.id = v.owner_id
            WHERE w.user_id = ?
            ORDER BY w.id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(WatchedVideo::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, NewUser};

    async fn create_user(db: &Database, username: &str) -> String {
        let email = format!("{}@x.com", username);
        db.users()
            .create(&NewUser {
                username,
                email: &email,
                full_name: "Channel Owner",
                password_hash: "hash",
                avatar: "https://img.example/owner.png",
                cover_image: "",
            })
            .await
            .unwrap()
    }

    fn video<'a>(owner_id: &'a str, title: &'a str) -> NewVideo<'a> {
        NewVideo {
            owner_id,
            title,
            description: "",
            video_file: "https://media.example/v.mp4",
            thumbnail: "https://media.example/t.png",
            duration_secs: 61.5,
        }
    }

    #[tokio::test]
    async fn test_watch_history_keeps_order_and_owner() {
        let db = Database::open(":memory:").await.unwrap();
        let owner = create_user(&db, "owner").await;
        let viewer = create_user(&db, "viewer").await;

        let first = db.videos().create(&video(&owner, "First")).await.unwrap();
        let second = db.videos().create(&video(&owner, "Second")).await.unwrap();

        db.videos().record_watch(&viewer, &second).await.unwrap();
        db.videos().record_watch(&viewer, &first).await.unwrap();

        let history = db.videos().watch_history(&viewer).await.unwrap();
        let titles: Vec<_> = history.iter().map(|v| v.title.as_str()).collect();
        assert_eq!(titles, ["Second", "First"]);

        let owner_info = &history[0].owner;
        assert_eq!(owner_info.id, owner);
        assert_eq!(owner_info.username, "owner");
        assert_eq!(owner_info.full_name, "Channel Owner");
        assert_eq!(history[0].duration, 61.5);
        assert!(history[0].is_published);
    }

    #[tokio::test]
    async fn test_empty_watch_history() {
        let db = Database::open(":memory:").await.unwrap();
        let viewer = create_user(&db, "viewer").await;

        assert!(db.videos().watch_history(&viewer).await.unwrap().is_empty());
    }
}
