use sqlx::PgConnection;

use social_common::error::DbError;
use social_common::types::{NewUser, User};

/// Queries against the `users` table.
pub struct UserStore;

impl UserStore {
    pub async fn create(conn: &mut PgConnection, user: &NewUser) -> Result<User, DbError> {
        let created: User = sqlx::query_as(
            r#"
            INSERT INTO users (username, email)
            VALUES ($1, $2)
            RETURNING id, username, email, created_at
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .fetch_one(&mut *conn)
        .await?;

        tracing::debug!(user_id = created.id, username = %created.username, "User created");
        Ok(created)
    }

    pub async fn get_by_id(conn: &mut PgConnection, id: i64) -> Result<Option<User>, DbError> {
        let user = sqlx::query_as("SELECT id, username, email, created_at FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(user)
    }

    pub async fn get_by_username(
        conn: &mut PgConnection,
        username: &str,
    ) -> Result<Option<User>, DbError> {
        let user = sqlx::query_as(
            "SELECT id, username, email, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(user)
    }

    pub async fn exists(conn: &mut PgConnection, username: &str) -> Result<bool, DbError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
                .bind(username)
                .fetch_one(&mut *conn)
                .await?;

        Ok(exists)
    }

    pub async fn count(conn: &mut PgConnection) -> Result<i64, DbError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&mut *conn)
            .await?;

        Ok(count)
    }
}
