use thiserror::Error;

use social_common::error::DbError;

/// Errors raised by a seed run.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("{0}")]
    Store(#[from] DbError),

    /// The first insert that failed. Nothing from the run was committed.
    #[error("Failed to insert {entity} #{index}: {source}")]
    Insert {
        entity: &'static str,
        index: usize,
        #[source]
        source: DbError,
    },

    #[error("Seed run interrupted")]
    Interrupted,
}
