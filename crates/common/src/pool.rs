//! Bounded connection pool.
//!
//! The pool hands out at most `max_open` connections at a time. Callers past that
//! bound wait for a slot instead of failing. Returned connections are parked idle
//! up to `max_idle`; anything beyond that, anything older than `max_lifetime`, and
//! anything marked broken is closed on return.
//!
//! The pool is generic over a [`Connector`] so the lifecycle rules can be exercised
//! without a live database. See [`crate::db`] for the PostgreSQL connector.

use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::DbError;

/// Opens and tears down raw connections on behalf of a [`Pool`].
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Connection: Send + 'static;

    /// Establish a new connection to the backing store.
    async fn connect(&self) -> Result<Self::Connection, DbError>;

    /// Check that an idle connection is still usable before handing it out again.
    async fn ping(&self, _conn: &mut Self::Connection) -> Result<(), DbError> {
        Ok(())
    }

    /// Gracefully close a connection. The default simply drops it.
    async fn close(&self, conn: Self::Connection) {
        drop(conn);
    }
}

/// Validated pool sizing and lifetime settings.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    addr: String,
    max_open: u32,
    max_idle: u32,
    max_lifetime: Duration,
    acquire_timeout: Option<Duration>,
}

impl PoolConfig {
    /// Validate pool parameters. A zero `max_lifetime` means connections are never rotated.
    pub fn new(
        addr: impl Into<String>,
        max_open: u32,
        max_idle: u32,
        max_lifetime: Duration,
    ) -> Result<Self, DbError> {
        let addr = addr.into();

        if addr.trim().is_empty() {
            return Err(DbError::Config("database address is empty".to_string()));
        }
        if max_open == 0 {
            return Err(DbError::Config(
                "max open connections must be at least 1".to_string(),
            ));
        }
        if max_idle > max_open {
            return Err(DbError::Config(format!(
                "max idle connections ({max_idle}) cannot exceed max open connections ({max_open})"
            )));
        }

        Ok(Self {
            addr,
            max_open,
            max_idle,
            max_lifetime,
            acquire_timeout: None,
        })
    }

    /// Bound how long `acquire` may wait for a slot, and how long opening a connection may take.
    pub fn with_acquire_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn max_open(&self) -> u32 {
        self.max_open
    }

    pub fn max_idle(&self) -> u32 {
        self.max_idle
    }

    /// `None` when connections are never force-rotated.
    pub fn max_lifetime(&self) -> Option<Duration> {
        (!self.max_lifetime.is_zero()).then_some(self.max_lifetime)
    }

    pub fn acquire_timeout(&self) -> Option<Duration> {
        self.acquire_timeout
    }
}

/// A shared, bounded set of reusable connections.
///
/// Cloning yields another handle to the same pool. [`Pool::close`] on any handle
/// closes it for all of them.
pub struct Pool<C: Connector> {
    shared: Arc<Shared<C>>,
}

impl<C: Connector> Clone for Pool<C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<C: Connector> Pool<C> {
    /// Build a pool and prove the backing store is reachable by opening one connection.
    pub async fn connect(config: PoolConfig, connector: C) -> Result<Self, DbError> {
        let shared = Arc::new(Shared {
            slots: Arc::new(Semaphore::new(config.max_open as usize)),
            idle: Mutex::new(VecDeque::new()),
            size: AtomicU32::new(0),
            closed: AtomicBool::new(false),
            connector,
            config,
        });

        let first = shared.open().await?;
        shared.release(first, false);

        tracing::info!(
            max_open = shared.config.max_open,
            max_idle = shared.config.max_idle,
            max_lifetime_secs = shared.config.max_lifetime.as_secs(),
            "Connection pool ready"
        );

        Ok(Self { shared })
    }

    /// Check out a connection, waiting for a free slot when `max_open` are in use.
    pub async fn acquire(&self) -> Result<PooledConnection<C>, DbError> {
        if self.is_closed() {
            return Err(DbError::Closed);
        }

        let slot = self.shared.wait_for_slot().await?;
        let live = self.shared.checkout().await?;

        let conn = PooledConnection {
            live: Some(live),
            shared: Arc::clone(&self.shared),
            broken: false,
            _slot: slot,
        };

        // Closed while we were connecting; the drop sends the connection away.
        if self.is_closed() {
            return Err(DbError::Closed);
        }

        Ok(conn)
    }

    /// Close the pool. Only the first call has an effect; later calls return `DbError::Closed`.
    ///
    /// Idle connections are closed now. Checked-out connections are closed when returned.
    pub async fn close(&self) -> Result<(), DbError> {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return Err(DbError::Closed);
        }

        self.shared.slots.close();

        let drained: Vec<_> = self.shared.idle().drain(..).collect();
        let closed_idle = drained.len();
        self.shared
            .size
            .fetch_sub(closed_idle as u32, Ordering::AcqRel);
        for live in drained {
            self.shared.connector.close(live.raw).await;
        }

        tracing::info!(
            closed_idle,
            in_use = self.in_use(),
            "Connection pool closed"
        );
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Number of open connections, idle or checked out.
    pub fn size(&self) -> u32 {
        self.shared.size.load(Ordering::Acquire)
    }

    pub fn idle_count(&self) -> usize {
        self.shared.idle().len()
    }

    /// Number of connections currently checked out.
    pub fn in_use(&self) -> u32 {
        self.size().saturating_sub(self.idle_count() as u32)
    }

    pub fn config(&self) -> &PoolConfig {
        &self.shared.config
    }
}

struct Live<T> {
    raw: T,
    created: Instant,
}

struct Shared<C: Connector> {
    connector: C,
    config: PoolConfig,
    slots: Arc<Semaphore>,
    /// Most recently returned connections at the back.
    idle: Mutex<VecDeque<Live<C::Connection>>>,
    size: AtomicU32,
    closed: AtomicBool,
}

impl<C: Connector> Shared<C> {
    fn idle(&self) -> MutexGuard<'_, VecDeque<Live<C::Connection>>> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn wait_for_slot(&self) -> Result<OwnedSemaphorePermit, DbError> {
        let wait = Arc::clone(&self.slots).acquire_owned();

        let permit = match self.config.acquire_timeout {
            Some(limit) => tokio::time::timeout(limit, wait).await.map_err(|_| {
                DbError::Connection(format!(
                    "timed out after {limit:?} waiting for a free connection"
                ))
            })?,
            None => wait.await,
        };

        permit.map_err(|_| DbError::Closed)
    }

    async fn checkout(&self) -> Result<Live<C::Connection>, DbError> {
        while let Some(live) = self.pop_idle() {
            if self.is_expired(&live) {
                tracing::debug!("Closing idle connection past its max lifetime");
                self.discard(live).await;
                continue;
            }

            let mut floating = Floating::new(self, live);
            match self.connector.ping(floating.raw_mut()).await {
                Ok(()) => return Ok(floating.into_live()),
                Err(e) => {
                    tracing::warn!(error = %e, "Discarding idle connection that failed ping");
                    self.discard(floating.into_live()).await;
                }
            }
        }

        self.open().await
    }

    fn pop_idle(&self) -> Option<Live<C::Connection>> {
        self.idle().pop_back()
    }

    async fn open(&self) -> Result<Live<C::Connection>, DbError> {
        let connect = self.connector.connect();

        let raw = match self.config.acquire_timeout {
            Some(limit) => tokio::time::timeout(limit, connect).await.map_err(|_| {
                DbError::Connection(format!("timed out after {limit:?} opening a connection"))
            })??,
            None => connect.await?,
        };

        let size = self.size.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::debug!(size, "Opened new connection");

        Ok(Live {
            raw,
            created: Instant::now(),
        })
    }

    fn is_expired(&self, live: &Live<C::Connection>) -> bool {
        self.config
            .max_lifetime()
            .is_some_and(|max| live.created.elapsed() >= max)
    }

    async fn discard(&self, live: Live<C::Connection>) {
        self.size.fetch_sub(1, Ordering::AcqRel);
        self.connector.close(live.raw).await;
    }

    /// Park a returned connection or close it. Runs inside `Drop`, so it cannot await.
    fn release(self: &Arc<Self>, live: Live<C::Connection>, broken: bool) {
        let reason = {
            // `close` flips the flag before draining under this lock, so nothing parks after a drain.
            let mut idle = self.idle();
            if self.closed.load(Ordering::Acquire) {
                "pool closed"
            } else if broken {
                "connection broken"
            } else if self.is_expired(&live) {
                "max lifetime reached"
            } else if idle.len() >= self.config.max_idle as usize {
                "idle limit reached"
            } else {
                idle.push_back(live);
                return;
            }
        };

        let size = self.size.fetch_sub(1, Ordering::AcqRel) - 1;
        tracing::debug!(reason, size, "Closing returned connection");
        self.close_detached(live);
    }

    /// Close a connection on a background task. Outside a runtime it is simply dropped.
    fn close_detached(self: &Arc<Self>, live: Live<C::Connection>) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let shared = Arc::clone(self);
                handle.spawn(async move { shared.connector.close(live.raw).await });
            }
            Err(_) => drop(live),
        }
    }
}

/// An idle connection taken out for a health check.
///
/// If the checkout is cancelled while the check is in flight, dropping this
/// closes the connection and takes it off the pool's books.
struct Floating<'a, C: Connector> {
    live: Option<Live<C::Connection>>,
    shared: &'a Shared<C>,
}

impl<'a, C: Connector> Floating<'a, C> {
    fn new(shared: &'a Shared<C>, live: Live<C::Connection>) -> Self {
        Self {
            live: Some(live),
            shared,
        }
    }

    fn raw_mut(&mut self) -> &mut C::Connection {
        &mut self.live.as_mut().expect(DEREF_ERR).raw
    }

    fn into_live(mut self) -> Live<C::Connection> {
        self.live.take().expect(DEREF_ERR)
    }
}

impl<C: Connector> Drop for Floating<'_, C> {
    fn drop(&mut self) {
        if let Some(live) = self.live.take() {
            let size = self.shared.size.fetch_sub(1, Ordering::AcqRel) - 1;
            tracing::debug!(size, "Checkout cancelled, dropping connection");
            drop(live);
        }
    }
}

const DEREF_ERR: &str = "(bug) connection already released to pool";

/// A connection checked out of a [`Pool`]. Returned to the pool on drop.
pub struct PooledConnection<C: Connector> {
    live: Option<Live<C::Connection>>,
    shared: Arc<Shared<C>>,
    broken: bool,
    // Dropped after `Drop::drop` has parked the connection, so a waiter finds it idle.
    _slot: OwnedSemaphorePermit,
}

impl<C: Connector> PooledConnection<C> {
    /// Prevent this connection from being reused. It is closed when returned.
    pub fn mark_broken(&mut self) {
        self.broken = true;
    }

    pub fn is_broken(&self) -> bool {
        self.broken
    }

    /// Time since the underlying connection was opened.
    pub fn age(&self) -> Duration {
        self.live
            .as_ref()
            .map(|live| live.created.elapsed())
            .unwrap_or_default()
    }
}

impl<C: Connector> Deref for PooledConnection<C> {
    type Target = C::Connection;

    fn deref(&self) -> &Self::Target {
        &self.live.as_ref().expect(DEREF_ERR).raw
    }
}

impl<C: Connector> DerefMut for PooledConnection<C> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.live.as_mut().expect(DEREF_ERR).raw
    }
}

impl<C: Connector> Drop for PooledConnection<C> {
    fn drop(&mut self) {
        if let Some(live) = self.live.take() {
            self.shared.release(live, self.broken);
        }
    }
}
