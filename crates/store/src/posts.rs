use sqlx::PgConnection;

use social_common::error::DbError;
use social_common::types::{NewPost, Post};

/// Queries against the `posts` table.
pub struct PostStore;

impl PostStore {
    /// Insert a post. The author must already exist.
    pub async fn create(conn: &mut PgConnection, post: &NewPost) -> Result<Post, DbError> {
        let created: Post = sqlx::query_as(
            r#"
            INSERT INTO posts (user_id, title, content, tags)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, title, content, tags, created_at, updated_at
            "#,
        )
        .bind(post.user_id)
        .bind(&post.title)
        .bind(&post.content)
        .bind(&post.tags)
        .fetch_one(&mut *conn)
        .await?;

        tracing::debug!(post_id = created.id, user_id = created.user_id, "Post created");
        Ok(created)
    }

    pub async fn get_by_id(conn: &mut PgConnection, id: i64) -> Result<Option<Post>, DbError> {
        let post = sqlx::query_as(
            r#"
            SELECT id, user_id, title, content, tags, created_at, updated_at
            FROM posts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(post)
    }

    /// Posts by one author, newest first.
    pub async fn list_by_user(conn: &mut PgConnection, user_id: i64) -> Result<Vec<Post>, DbError> {
        let posts = sqlx::query_as(
            r#"
            SELECT id, user_id, title, content, tags, created_at, updated_at
            FROM posts
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(posts)
    }

    pub async fn count(conn: &mut PgConnection) -> Result<i64, DbError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
            .fetch_one(&mut *conn)
            .await?;

        Ok(count)
    }
}
