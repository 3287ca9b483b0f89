//! Seed run orchestration.
//!
//! A run generates the baseline data set and writes it through a single
//! transaction in dependency order: users, posts, comments, follow-edges.
//! Re-running is safe. The transaction first takes the seed lock and checks for
//! the first baseline user; if it is there, the whole baseline was committed by
//! an earlier run and nothing is written.

use std::future::Future;

use async_trait::async_trait;

use social_common::db::{self, PgConnector, PgPool};
use social_common::error::DbError;
use social_common::pool::{Connector, Pool};
use social_common::types::{NewComment, NewPost, TableCounts};
use social_store::{SeedStore, SeedTx, Storage};

use crate::error::SeedError;
use crate::generate::{SeedData, SeedPlan, generate};

/// Binds a store to a pool handle. The store borrows the pool and never closes it.
#[async_trait]
pub trait StoreFactory<C: Connector>: Send + Sync {
    type Store: Send + Sync;

    /// Make the schema ready. Runs once, before `create`.
    async fn prepare(&self, _pool: &Pool<C>) -> Result<(), DbError> {
        Ok(())
    }

    fn create(&self, pool: &Pool<C>) -> Self::Store;
}

/// Performs one seed run against a store.
#[async_trait]
pub trait Seeder<S: Sync>: Send + Sync {
    async fn seed(&self, store: &S) -> Result<SeedReport, SeedError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    /// The baseline was written by this run.
    Seeded,
    /// The baseline was already present; nothing was written.
    AlreadySeeded,
}

/// Rows written by a single run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertCounts {
    pub users: usize,
    pub posts: usize,
    pub comments: usize,
    pub follows: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub outcome: SeedOutcome,
    pub inserted: InsertCounts,
    /// Table counts after the run.
    pub counts: TableCounts,
}

/// Production store factory. Optionally applies migrations before handing out the store.
pub struct PgStoreFactory {
    run_migrations: bool,
}

impl PgStoreFactory {
    pub fn new(run_migrations: bool) -> Self {
        Self { run_migrations }
    }
}

#[async_trait]
impl StoreFactory<PgConnector> for PgStoreFactory {
    type Store = Storage;

    async fn prepare(&self, pool: &PgPool) -> Result<(), DbError> {
        if self.run_migrations {
            db::run_migrations(pool).await?;
        }
        Ok(())
    }

    fn create(&self, pool: &PgPool) -> Storage {
        Storage::new(pool)
    }
}

/// Writes the generated baseline data set.
pub struct BaselineSeeder {
    plan: SeedPlan,
}

impl BaselineSeeder {
    pub fn new(plan: SeedPlan) -> Self {
        Self { plan }
    }
}

#[async_trait]
impl<S: SeedStore> Seeder<S> for BaselineSeeder {
    async fn seed(&self, store: &S) -> Result<SeedReport, SeedError> {
        let data = generate(&self.plan);
        tracing::info!(
            users = data.users.len(),
            posts = data.posts.len(),
            comments = data.comments.len(),
            follows = data.follows.len(),
            rng_seed = self.plan.rng_seed,
            "Generated seed data"
        );

        let mut tx = store.begin().await?;

        let (outcome, inserted) = match seed_tx(&mut tx, &data).await {
            Ok(Some(inserted)) => {
                tx.commit().await?;
                (SeedOutcome::Seeded, inserted)
            }
            Ok(None) => {
                tx.rollback().await?;
                (SeedOutcome::AlreadySeeded, InsertCounts::default())
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::warn!(error = %rollback, "Rollback failed after seed error");
                }
                return Err(e);
            }
        };

        let counts = store.counts().await?;

        match outcome {
            SeedOutcome::Seeded => tracing::info!(
                users = inserted.users,
                posts = inserted.posts,
                comments = inserted.comments,
                follows = inserted.follows,
                "Seeded baseline data"
            ),
            SeedOutcome::AlreadySeeded => {
                tracing::info!(%counts, "Baseline data already present, nothing to do")
            }
        }

        Ok(SeedReport {
            outcome,
            inserted,
            counts,
        })
    }
}

/// Returns `None` when the baseline is already present.
async fn seed_tx<T: SeedTx>(tx: &mut T, data: &SeedData) -> Result<Option<InsertCounts>, SeedError> {
    tx.lock_seed().await?;

    let Some(marker) = data.marker_username() else {
        return Ok(Some(InsertCounts::default()));
    };
    if tx.user_exists(marker).await? {
        tracing::debug!(marker, "Found baseline marker user");
        return Ok(None);
    }

    insert_baseline(tx, data).await.map(Some)
}

async fn insert_baseline<T: SeedTx>(tx: &mut T, data: &SeedData) -> Result<InsertCounts, SeedError> {
    let mut user_ids = Vec::with_capacity(data.users.len());
    for (index, user) in data.users.iter().enumerate() {
        let created = tx
            .create_user(user)
            .await
            .map_err(insert_failed("user", index))?;
        user_ids.push(created.id);
    }

    let mut post_ids = Vec::with_capacity(data.posts.len());
    for (index, draft) in data.posts.iter().enumerate() {
        let post = NewPost {
            user_id: user_ids[draft.author],
            title: draft.title.clone(),
            content: draft.content.clone(),
            tags: draft.tags.clone(),
        };
        let created = tx
            .create_post(&post)
            .await
            .map_err(insert_failed("post", index))?;
        post_ids.push(created.id);
    }

    for (index, draft) in data.comments.iter().enumerate() {
        let comment = NewComment {
            post_id: post_ids[draft.post],
            user_id: user_ids[draft.author],
            content: draft.content.clone(),
        };
        tx.create_comment(&comment)
            .await
            .map_err(insert_failed("comment", index))?;
    }

    let mut follows = 0;
    for (index, draft) in data.follows.iter().enumerate() {
        let inserted = tx
            .follow(user_ids[draft.user], user_ids[draft.follower])
            .await
            .map_err(insert_failed("follow", index))?;
        if inserted {
            follows += 1;
        }
    }

    Ok(InsertCounts {
        users: user_ids.len(),
        posts: post_ids.len(),
        comments: data.comments.len(),
        follows,
    })
}

fn insert_failed(entity: &'static str, index: usize) -> impl FnOnce(DbError) -> SeedError {
    move |source| SeedError::Insert {
        entity,
        index,
        source,
    }
}

/// Run one seed pass through `pool`, then close the pool.
///
/// The pool is closed on every path: success, seeder failure, and `shutdown`
/// resolving mid-run. An interrupted run abandons its transaction, so nothing
/// from it is committed.
pub async fn run_seed<C, F, S>(
    pool: Pool<C>,
    factory: &F,
    seeder: &S,
    shutdown: impl Future<Output = ()>,
) -> Result<SeedReport, SeedError>
where
    C: Connector,
    F: StoreFactory<C>,
    S: Seeder<F::Store>,
{
    let result = tokio::select! {
        result = seed_pool(&pool, factory, seeder) => result,
        () = shutdown => {
            tracing::warn!("Shutdown requested, abandoning seed run");
            Err(SeedError::Interrupted)
        }
    };

    if let Err(e) = pool.close().await {
        tracing::warn!(error = %e, "Pool was closed before the seed run finished");
    }

    result
}

async fn seed_pool<C, F, S>(pool: &Pool<C>, factory: &F, seeder: &S) -> Result<SeedReport, SeedError>
where
    C: Connector,
    F: StoreFactory<C>,
    S: Seeder<F::Store>,
{
    factory.prepare(pool).await?;
    let store = factory.create(pool);
    seeder.seed(&store).await
}
