//! Seed driver: populates the social network schema with a baseline data set.

pub mod driver;
pub mod error;
pub mod generate;

pub use driver::{
    BaselineSeeder, InsertCounts, PgStoreFactory, SeedOutcome, SeedReport, Seeder, StoreFactory,
    run_seed,
};
pub use error::SeedError;
pub use generate::{SeedData, SeedPlan, generate};
