use thiserror::Error;

/// Errors raised while configuring, opening, or using the database pool.
#[derive(Debug, Error)]
pub enum DbError {
    /// Malformed address or out-of-range pool parameters. Raised before any I/O.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The backing store could not be reached.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The pool handle was used after `close()`.
    #[error("Pool is closed")]
    Closed,

    #[error("Database error: {0}")]
    Query(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

impl DbError {
    /// Returns true for errors that indicate a pool lifecycle bug in the caller.
    pub fn is_closed(&self) -> bool {
        matches!(self, DbError::Closed)
    }
}
