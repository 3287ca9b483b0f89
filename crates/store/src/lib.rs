//! Data access for the social network schema.
//!
//! Table accessors take `&mut PgConnection`, so the same calls work on a bare
//! pooled connection or inside an open transaction.

pub mod comments;
pub mod followers;
pub mod posts;
pub mod storage;
pub mod users;

pub use storage::{PgSeedTx, SeedStore, SeedTx, Storage};
