use async_trait::async_trait;

use social_common::db::{PgPool, PgPooledConnection};
use social_common::error::DbError;
use social_common::types::{Comment, NewComment, NewPost, NewUser, Post, TableCounts, User};

use crate::comments::CommentStore;
use crate::followers::FollowerStore;
use crate::posts::PostStore;
use crate::users::UserStore;

/// Key for the transaction-scoped advisory lock held by a seed run.
const SEED_LOCK_KEY: i64 = 0x736f_6369_616c;

/// A store that can open transactions for a seed run.
#[async_trait]
pub trait SeedStore: Send + Sync {
    type Tx: SeedTx;

    async fn begin(&self) -> Result<Self::Tx, DbError>;

    /// Committed row counts, as seen outside any seed transaction.
    async fn counts(&self) -> Result<TableCounts, DbError>;
}

/// The writes a seed run performs, all inside one transaction.
///
/// Nothing is visible to other readers until [`SeedTx::commit`]. Dropping the
/// transaction without committing discards every write.
#[async_trait]
pub trait SeedTx: Send + Sized {
    /// Serialize concurrent seed runs. Held until commit or rollback.
    async fn lock_seed(&mut self) -> Result<(), DbError>;

    async fn user_exists(&mut self, username: &str) -> Result<bool, DbError>;

    async fn create_user(&mut self, user: &NewUser) -> Result<User, DbError>;

    async fn create_post(&mut self, post: &NewPost) -> Result<Post, DbError>;

    async fn create_comment(&mut self, comment: &NewComment) -> Result<Comment, DbError>;

    /// Returns false if the edge already existed.
    async fn follow(&mut self, user_id: i64, follower_id: i64) -> Result<bool, DbError>;

    async fn commit(self) -> Result<(), DbError>;

    async fn rollback(self) -> Result<(), DbError>;
}

/// PostgreSQL-backed store. Borrows the pool; never closes it.
#[derive(Clone)]
pub struct Storage {
    pool: PgPool,
}

impl Storage {
    pub fn new(pool: &PgPool) -> Self {
        Self { pool: pool.clone() }
    }

    /// Current row counts of every social table.
    pub async fn table_counts(&self) -> Result<TableCounts, DbError> {
        let mut conn = self.pool.acquire().await?;

        Ok(TableCounts {
            users: UserStore::count(&mut conn).await?,
            posts: PostStore::count(&mut conn).await?,
            comments: CommentStore::count(&mut conn).await?,
            followers: FollowerStore::count(&mut conn).await?,
        })
    }
}

#[async_trait]
impl SeedStore for Storage {
    type Tx = PgSeedTx;

    async fn begin(&self) -> Result<PgSeedTx, DbError> {
        let mut conn = self.pool.acquire().await?;
        sqlx::Executor::execute(&mut *conn, sqlx::raw_sql("BEGIN")).await?;

        Ok(PgSeedTx { conn, open: true })
    }

    async fn counts(&self) -> Result<TableCounts, DbError> {
        self.table_counts().await
    }
}

/// An open transaction on a pooled PostgreSQL connection.
pub struct PgSeedTx {
    conn: PgPooledConnection,
    open: bool,
}

#[async_trait]
impl SeedTx for PgSeedTx {
    async fn lock_seed(&mut self) -> Result<(), DbError> {
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(SEED_LOCK_KEY)
            .execute(&mut *self.conn)
            .await?;
        Ok(())
    }

    async fn user_exists(&mut self, username: &str) -> Result<bool, DbError> {
        UserStore::exists(&mut self.conn, username).await
    }

    async fn create_user(&mut self, user: &NewUser) -> Result<User, DbError> {
        UserStore::create(&mut self.conn, user).await
    }

    async fn create_post(&mut self, post: &NewPost) -> Result<Post, DbError> {
        PostStore::create(&mut self.conn, post).await
    }

    async fn create_comment(&mut self, comment: &NewComment) -> Result<Comment, DbError> {
        CommentStore::create(&mut self.conn, comment).await
    }

    async fn follow(&mut self, user_id: i64, follower_id: i64) -> Result<bool, DbError> {
        FollowerStore::follow(&mut self.conn, user_id, follower_id).await
    }

    async fn commit(mut self) -> Result<(), DbError> {
        sqlx::Executor::execute(&mut *self.conn, sqlx::raw_sql("COMMIT")).await?;
        self.open = false;
        Ok(())
    }

    async fn rollback(mut self) -> Result<(), DbError> {
        sqlx::Executor::execute(&mut *self.conn, sqlx::raw_sql("ROLLBACK")).await?;
        self.open = false;
        Ok(())
    }
}

impl Drop for PgSeedTx {
    fn drop(&mut self) {
        // The server aborts the transaction when the connection goes away.
        if self.open {
            tracing::warn!("Seed transaction abandoned, discarding its connection");
            self.conn.mark_broken();
        }
    }
}
