//! Channel subscriptions and the channel profile view built on them.

use serde::Serialize;
use sqlx::sqlite::SqlitePool;

/// Public channel page for a user, with subscription counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ChannelProfile {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: String,
    /// Number of users subscribed to this channel
    pub subscribers_count: i64,
    /// Number of channels this user is subscribed to
    pub channels_subscribed_to_count: i64,
    /// Whether the viewing user is subscribed to this channel
    pub is_subscribed: bool,
}

#[derive(Clone)]
pub struct SubscriptionStore {
    pool: SqlitePool,
}

impl SubscriptionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Subscribe `subscriber_id` to `channel_id`. Returns false if already subscribed.
    pub async fn subscribe(
        &self,
        subscriber_id: &str,
        channel_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO subscriptions (subscriber_id, channel_id) VALUES (?, ?)",
        )
        .bind(subscriber_id)
        .bind(channel_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove a subscription. Returns false if there was none.
    pub async fn unsubscribe(
        &self,
        subscriber_id: &str,
        channel_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM subscriptions WHERE subscriber_id = ? AND channel_id = ?")
                .bind(subscriber_id)
                .bind(channel_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Build the channel profile for `username` as seen by `viewer_id`.
    pub async fn channel_profile(
        &self,
        username: &str,
        viewer_id: &str,
    ) -> Result<Option<ChannelProfile>, sqlx::Error> {
        sqlx::query_as(
            "SELECT
                u.id, u.username, u.email, u.full_name, u.avatar, u.cover_image,
                (SELECT COUNT(*) FROM subscriptions s WHERE s.channel_id = u.id)
                    AS subscribers_count,
                (SELECT COUNT(*) FROM subscriptions s WHERE s.subscriber_id = u.id)
                    AS channels_subscribed_to_count,
                EXISTS (
                    SELECT 1 FROM subscriptions s
                    WHERE s.channel_id = u.id AND s.subscriber_id = ?
                ) AS is_subscribed
            FROM users u
            WHERE u.username = ?",
        )
        .bind(viewer_id)
        .bind(username)
        .fetch_optional(&self.pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use crate::db::{Database, NewUser};

    async fn create_user(db: &Database, username: &str) -> String {
        let email = format!("{}@x.com", username);
        db.users()
            .create(&NewUser {
                username,
                email: &email,
                full_name: username,
                password_hash: "hash",
                avatar: "https://img.example/a.png",
                cover_image: "",
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_channel_profile_counts() {
        let db = Database::open(":memory:").await.unwrap();
        let ana = create_user(&db, "ana").await;
        let bea = create_user(&db, "bea").await;
        let cai = create_user(&db, "cai").await;

        // bea and cai subscribe to ana; ana subscribes to bea
        assert!(db.subscriptions().subscribe(&bea, &ana).await.unwrap());
        assert!(db.subscriptions().subscribe(&cai, &ana).await.unwrap());
        assert!(db.subscriptions().subscribe(&ana, &bea).await.unwrap());

        let profile = db
            .subscriptions()
            .channel_profile("ana", &bea)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(profile.id, ana);
        assert_eq!(profile.subscribers_count, 2);
        assert_eq!(profile.channels_subscribed_to_count, 1);
        assert!(profile.is_subscribed);

        let seen_by_self = db
            .subscriptions()
            .channel_profile("ana", &ana)
            .await
            .unwrap()
            .unwrap();
        assert!(!seen_by_self.is_subscribed);
    }

    #[tokio::test]
    async fn test_duplicate_subscription_ignored() {
        let db = Database::open(":memory:").await.unwrap();
        let ana = create_user(&db, "ana").await;
        let bea = create_user(&db, "bea").await;

        assert!(db.subscriptions().subscribe(&bea, &ana).await.unwrap());
        assert!(!db.subscriptions().subscribe(&bea, &ana).await.unwrap());

        let profile = db
            .subscriptions()
            .channel_profile("ana", &bea)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(profile.subscribers_count, 1);

        assert!(db.subscriptions().unsubscribe(&bea, &ana).await.unwrap());
        assert!(!db.subscriptions().unsubscribe(&bea, &ana).await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_channel() {
        let db = Database::open(":memory:").await.unwrap();
        let ana = create_user(&db, "ana").await;

        let profile = db
            .subscriptions()
            .channel_profile("nobody", &ana)
            .await
            .unwrap();
        assert!(profile.is_none());
    }
}
