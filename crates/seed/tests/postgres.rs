//! Seed runs against a live PostgreSQL database.
//!
//! These tests require a running PostgreSQL database and the `DATABASE_URL`
//! environment variable to be set. Run with:
//!
//! ```bash
//! DATABASE_URL="postgresql://..." cargo test -p social-seed --test postgres -- --ignored --nocapture
//! ```

use std::time::Duration;

use sqlx::PgPool;

use social_common::db::{PgConnector, PgPool as SocialPool};
use social_common::pool::{Pool, PoolConfig};
use social_seed::{
    BaselineSeeder, PgStoreFactory, SeedError, SeedOutcome, SeedPlan, Seeder, run_seed,
};
use social_store::{SeedStore, Storage};

async fn setup(pool: &PgPool) {
    // Run migrations
    sqlx::migrate!("../../migrations").run(pool).await.unwrap();

    // Clean up any leftover data from previous runs
    sqlx::query("TRUNCATE followers, comments, posts, users RESTART IDENTITY")
        .execute(pool)
        .await
        .unwrap();
}

/// Our own pool over the same test database.
async fn social_pool(pool: &PgPool) -> SocialPool {
    let connector = PgConnector::from_options((*pool.connect_options()).clone());
    let config = PoolConfig::new("postgres://sqlx-test", 3, 3, Duration::from_secs(900))
        .unwrap()
        .with_acquire_timeout(Some(Duration::from_secs(30)));
    Pool::connect(config, connector).await.unwrap()
}

fn small_plan() -> SeedPlan {
    SeedPlan {
        users: 12,
        posts: 25,
        comments: 60,
        follows: 40,
        rng_seed: 42,
    }
}

#[sqlx::test]
#[ignore] // Requires DATABASE_URL, run with --ignored
async fn test_second_seed_leaves_counts_unchanged(pool: PgPool) {
    setup(&pool).await;
    let social = social_pool(&pool).await;
    let storage = Storage::new(&social);
    let seeder = BaselineSeeder::new(small_plan());

    let first = seeder.seed(&storage).await.unwrap();
    assert_eq!(first.outcome, SeedOutcome::Seeded);
    assert_eq!(first.counts.users, 12);
    assert_eq!(first.counts.posts, 25);
    assert_eq!(first.counts.comments, 60);
    assert_eq!(first.counts.followers, 40);

    let second = seeder.seed(&storage).await.unwrap();
    assert_eq!(second.outcome, SeedOutcome::AlreadySeeded);
    assert_eq!(second.counts, first.counts);
    assert_eq!(storage.counts().await.unwrap(), first.counts);

    social.close().await.unwrap();
}

#[sqlx::test]
#[ignore]
async fn test_concurrent_seeders_write_once(pool: PgPool) {
    setup(&pool).await;
    let social = social_pool(&pool).await;
    let storage = Storage::new(&social);
    let a = BaselineSeeder::new(small_plan());
    let b = BaselineSeeder::new(small_plan());

    let (ra, rb) = tokio::join!(a.seed(&storage), b.seed(&storage));
    let (ra, rb) = (ra.unwrap(), rb.unwrap());

    let seeded = [ra.outcome, rb.outcome]
        .iter()
        .filter(|o| **o == SeedOutcome::Seeded)
        .count();
    assert_eq!(seeded, 1, "exactly one run should write the baseline");

    let counts = storage.counts().await.unwrap();
    assert_eq!(counts.users, 12);
    assert_eq!(counts.followers, 40);

    social.close().await.unwrap();
}

#[sqlx::test]
#[ignore]
async fn test_failed_seed_rolls_back(pool: PgPool) {
    setup(&pool).await;

    // Take the email the second baseline user will want.
    sqlx::query("INSERT INTO users (username, email) VALUES ('squatter', 'bob1@example.com')")
        .execute(&pool)
        .await
        .unwrap();

    let social = social_pool(&pool).await;
    let storage = Storage::new(&social);

    let err = BaselineSeeder::new(small_plan())
        .seed(&storage)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SeedError::Insert {
            entity: "user",
            index: 1,
            ..
        }
    ));

    let counts = storage.counts().await.unwrap();
    assert_eq!(counts.users, 1);
    assert_eq!(counts.posts, 0);

    social.close().await.unwrap();
}

#[sqlx::test]
#[ignore]
async fn test_run_seed_migrates_seeds_and_closes_pool(pool: PgPool) {
    let social = social_pool(&pool).await;
    let factory = PgStoreFactory::new(true);
    let seeder = BaselineSeeder::new(small_plan());

    let report = run_seed(social.clone(), &factory, &seeder, std::future::pending())
        .await
        .unwrap();

    assert_eq!(report.outcome, SeedOutcome::Seeded);
    assert_eq!(report.inserted.users, 12);
    assert!(social.is_closed());

    let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(users, 12);
}
