use sqlx::PgConnection;

use social_common::error::DbError;
use social_common::types::{Comment, NewComment};

/// Queries against the `comments` table.
pub struct CommentStore;

impl CommentStore {
    /// Insert a comment. Both the post and the author must already exist.
    pub async fn create(conn: &mut PgConnection, comment: &NewComment) -> Result<Comment, DbError> {
        let created: Comment = sqlx::query_as(
            r#"
            INSERT INTO comments (post_id, user_id, content)
            VALUES ($1, $2, $3)
            RETURNING id, post_id, user_id, content, created_at
            "#,
        )
        .bind(comment.post_id)
        .bind(comment.user_id)
        .bind(&comment.content)
        .fetch_one(&mut *conn)
        .await?;

        Ok(created)
    }

    /// Comments on a post, newest first.
    pub async fn list_by_post(
        conn: &mut PgConnection,
        post_id: i64,
    ) -> Result<Vec<Comment>, DbError> {
        let comments = sqlx::query_as(
            r#"
            SELECT id, post_id, user_id, content, created_at
            FROM comments
            WHERE post_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(post_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(comments)
    }

    pub async fn count(conn: &mut PgConnection) -> Result<i64, DbError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments")
            .fetch_one(&mut *conn)
            .await?;

        Ok(count)
    }
}
