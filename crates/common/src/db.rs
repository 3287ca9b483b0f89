use std::str::FromStr;

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;

use crate::error::DbError;
use crate::pool::{Connector, Pool, PoolConfig, PooledConnection};

/// Pool of PostgreSQL connections.
pub type PgPool = Pool<PgConnector>;

/// A PostgreSQL connection checked out of a [`PgPool`].
pub type PgPooledConnection = PooledConnection<PgConnector>;

/// Opens PostgreSQL connections for the pool.
pub struct PgConnector {
    options: PgConnectOptions,
}

impl PgConnector {
    /// Parse a `postgres://` connection string. Malformed addresses are a `DbError::Config`.
    pub fn new(addr: &str) -> Result<Self, DbError> {
        if !(addr.starts_with("postgres://") || addr.starts_with("postgresql://")) {
            return Err(DbError::Config(
                "database address must use the postgres:// scheme".to_string(),
            ));
        }

        let options = PgConnectOptions::from_str(addr)
            .map_err(|e| DbError::Config(format!("malformed database address: {e}")))?;

        Ok(Self { options })
    }

    pub fn from_options(options: PgConnectOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Connector for PgConnector {
    type Connection = PgConnection;

    async fn connect(&self) -> Result<PgConnection, DbError> {
        PgConnection::connect_with(&self.options)
            .await
            .map_err(|e| DbError::Connection(e.to_string()))
    }

    async fn ping(&self, conn: &mut PgConnection) -> Result<(), DbError> {
        conn.ping().await?;
        Ok(())
    }

    async fn close(&self, conn: PgConnection) {
        if let Err(e) = conn.close().await {
            tracing::debug!(error = %e, "Error while closing PostgreSQL connection");
        }
    }
}

/// Create a PostgreSQL connection pool.
///
/// Fails with `DbError::Config` before any I/O when the address is malformed, and with
/// `DbError::Connection` when the server cannot be reached.
pub async fn create_pool(config: &PoolConfig) -> Result<PgPool, DbError> {
    let connector = PgConnector::new(config.addr())?;
    let pool = Pool::connect(config.clone(), connector).await?;

    tracing::info!(
        max_open = config.max_open(),
        max_idle = config.max_idle(),
        "Connected to PostgreSQL"
    );
    Ok(pool)
}

/// Apply the embedded schema migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
    let mut conn = pool.acquire().await?;
    sqlx::migrate!("../../migrations").run_direct(&mut *conn).await?;

    tracing::info!("Database migrations applied");
    Ok(())
}
