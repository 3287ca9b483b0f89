use sqlx::PgConnection;

use social_common::error::DbError;

/// Queries against the `followers` table.
pub struct FollowerStore;

impl FollowerStore {
    /// Record that `follower_id` follows `user_id`. Returns false if the edge already existed.
    pub async fn follow(
        conn: &mut PgConnection,
        user_id: i64,
        follower_id: i64,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            r#"
            INSERT INTO followers (user_id, follower_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, follower_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(follower_id)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove a follow-edge. Returns true if it was deleted.
    pub async fn unfollow(
        conn: &mut PgConnection,
        user_id: i64,
        follower_id: i64,
    ) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM followers WHERE user_id = $1 AND follower_id = $2")
            .bind(user_id)
            .bind(follower_id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn is_following(
        conn: &mut PgConnection,
        user_id: i64,
        follower_id: i64,
    ) -> Result<bool, DbError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM followers WHERE user_id = $1 AND follower_id = $2)",
        )
        .bind(user_id)
        .bind(follower_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(exists)
    }

    pub async fn count(conn: &mut PgConnection) -> Result<i64, DbError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM followers")
            .fetch_one(&mut *conn)
            .await?;

        Ok(count)
    }
}
