//! Seed command: populates the social network database with baseline data.

use tracing_subscriber::EnvFilter;

use social_common::config::AppConfig;
use social_common::db;
use social_common::pool::PoolConfig;
use social_seed::{BaselineSeeder, PgStoreFactory, SeedOutcome, SeedPlan, run_seed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "social_seed=info,social_store=info,social_common=info".into()),
        )
        .json()
        .init();

    tracing::info!("Social seed starting...");

    // Load configuration
    let (config, pool_config) = load_config(AppConfig::from_env)?;
    let plan = SeedPlan::from_config(&config);

    // Connect to database; nothing to release if this fails
    let pool = db::create_pool(&pool_config)
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Failed to create database pool"))?;

    let factory = PgStoreFactory::new(config.db_run_migrations);
    let seeder = BaselineSeeder::new(plan);

    // The pool is closed inside run_seed whatever the outcome
    let report = run_seed(pool, &factory, &seeder, shutdown_signal())
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Seed run failed"))?;

    match report.outcome {
        SeedOutcome::Seeded => tracing::info!(counts = %report.counts, "Seed run complete"),
        SeedOutcome::AlreadySeeded => {
            tracing::info!(counts = %report.counts, "Database already seeded")
        }
    }

    Ok(())
}

/// Load the configuration and derive the pool settings, logging why either is unusable.
fn load_config(
    load: impl FnOnce() -> anyhow::Result<AppConfig>,
) -> anyhow::Result<(AppConfig, PoolConfig)> {
    let config =
        load().inspect_err(|e| tracing::error!(error = %e, "Failed to load configuration"))?;
    let pool_config = config
        .pool_config()
        .inspect_err(|e| tracing::error!(error = %e, "Invalid database configuration"))?;
    Ok((config, pool_config))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Received shutdown signal, stopping gracefully...");
}
