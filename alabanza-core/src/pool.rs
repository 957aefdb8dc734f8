//! Connection pooling for the networked backend
//!
//! Pooling itself is sqlx's `AnyPool`: it pings every idle connection before
//! handing it out (`test_before_acquire`), discards dead ones and opens
//! replacements, and bounds the pool at `max_size`. This module adds the
//! policy around it:
//! - checkout is retried up to `max_attempts` times on transport errors
//! - when every attempt fails, one unpooled fallback connection is opened so
//!   a saturated or unreachable pool never blocks a caller indefinitely

use std::future::Future;
use std::ops::{Deref, DerefMut};
use std::time::Duration;

use serde::Serialize;
use sqlx::any::{Any, AnyConnectOptions};
use sqlx::pool::PoolConnection;
use sqlx::{AnyConnection, AnyPool, Connection};

use crate::error::{is_transport_error, Result, StoreError};

/// Default maximum number of pooled connections.
/// Kept low: a handful of devices on a local network.
pub const DEFAULT_MAX_SIZE: usize = 5;

/// Default number of checkout attempts before falling back
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

/// Default time one checkout attempt may take, connect included
pub const DEFAULT_CHECKOUT_WAIT: Duration = Duration::from_secs(1);

/// Pool sizing and retry policy
#[derive(Debug, Clone)]
pub struct PoolOptions {
    pub max_size: usize,
    pub max_attempts: usize,
    pub checkout_wait: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            checkout_wait: DEFAULT_CHECKOUT_WAIT,
        }
    }
}

impl PoolOptions {
    /// Build the pool without connecting; connections open on first checkout.
    pub fn build_lazy(&self, connect: AnyConnectOptions) -> AnyPool {
        sqlx::pool::PoolOptions::<Any>::new()
            .max_connections(self.max_size.max(1) as u32)
            .min_connections(0)
            .test_before_acquire(true)
            .acquire_timeout(self.checkout_wait)
            .connect_lazy_with(connect)
    }
}

/// Point-in-time pool counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStatus {
    /// Pooled connections in existence (idle + leased)
    pub size: usize,
    pub idle: usize,
    pub max_size: usize,
}

impl PoolStatus {
    pub fn of(pool: &AnyPool) -> Self {
        Self {
            size: pool.size() as usize,
            idle: pool.num_idle(),
            max_size: pool.options().get_max_connections() as usize,
        }
    }
}

enum Conn {
    Pooled(PoolConnection<Any>),
    Unpooled(AnyConnection),
}

/// A leased connection, pooled or not.
///
/// Dropping a pooled lease returns it to the pool; [`Lease::finish`] does the
/// same and also closes unpooled or poisoned connections gracefully.
pub struct Lease {
    conn: Conn,
    poisoned: bool,
}

impl std::fmt::Debug for Lease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lease")
            .field("pooled", &self.is_pooled())
            .field("poisoned", &self.poisoned)
            .finish()
    }
}

impl Lease {
    pub fn pooled(conn: PoolConnection<Any>) -> Self {
        Self {
            conn: Conn::Pooled(conn),
            poisoned: false,
        }
    }

    pub fn unpooled(conn: AnyConnection) -> Self {
        Self {
            conn: Conn::Unpooled(conn),
            poisoned: false,
        }
    }

    pub fn is_pooled(&self) -> bool {
        matches!(self.conn, Conn::Pooled(_))
    }

    /// Mark the connection unusable; it is closed instead of re-pooled.
    pub fn poison(&mut self) {
        self.poisoned = true;
        if let Conn::Pooled(conn) = &mut self.conn {
            conn.close_on_drop();
        }
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Hand the connection back. Poisoned pooled connections leave the pool.
    pub async fn finish(self) {
        let closed = match self.conn {
            Conn::Pooled(conn) if self.poisoned => conn.close().await,
            Conn::Pooled(conn) => {
                drop(conn);
                Ok(())
            }
            Conn::Unpooled(conn) => conn.close().await,
        };
        if let Err(e) = closed {
            tracing::debug!(error = %e, "error closing connection");
        }
    }
}

impl Deref for Lease {
    type Target = AnyConnection;

    fn deref(&self) -> &AnyConnection {
        match &self.conn {
            Conn::Pooled(conn) => &**conn,
            Conn::Unpooled(conn) => conn,
        }
    }
}

impl DerefMut for Lease {
    fn deref_mut(&mut self) -> &mut AnyConnection {
        match &mut self.conn {
            Conn::Pooled(conn) => &mut **conn,
            Conn::Unpooled(conn) => conn,
        }
    }
}

/// Check out from the pool, retrying transport failures.
///
/// `checkout` is called with the 1-based attempt number. Any other error
/// ends the loop at once: retrying a bad password only repeats it.
///
/// # Errors
///
/// - [`StoreError::PoolExhausted`] if the last attempt timed out waiting
/// - [`StoreError::Connectivity`] for any other failure
pub async fn checkout_pooled<T, F, Fut>(
    max_attempts: usize,
    max_size: usize,
    mut checkout: F,
) -> Result<T>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = std::result::Result<T, sqlx::Error>>,
{
    let attempts = max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match checkout(attempt).await {
            Ok(conn) => return Ok(conn),
            Err(sqlx::Error::PoolTimedOut) if attempt >= attempts => {
                return Err(StoreError::PoolExhausted { max_size })
            }
            Err(e) if attempt >= attempts || !is_transport_error(&e) => {
                return Err(StoreError::connectivity("checking out pooled connection", e))
            }
            Err(e) => {
                tracing::debug!(attempt, error = %e, "pooled checkout failed, retrying");
                attempt += 1;
            }
        }
    }
}

/// [`checkout_pooled`], then one unpooled `fallback` connection if it failed.
///
/// # Errors
///
/// [`StoreError::Connectivity`] when the fallback cannot connect either.
pub async fn checkout_or_fallback<T, F, Fut, G, GFut>(
    max_attempts: usize,
    max_size: usize,
    checkout: F,
    fallback: G,
) -> Result<T>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = std::result::Result<T, sqlx::Error>>,
    G: FnOnce() -> GFut,
    GFut: Future<Output = std::result::Result<T, sqlx::Error>>,
{
    match checkout_pooled(max_attempts, max_size, checkout).await {
        Ok(conn) => Ok(conn),
        Err(e) => {
            tracing::warn!(error = %e, "pool unavailable, opening unpooled connection");
            fallback()
                .await
                .map_err(|e| StoreError::connectivity("opening fallback connection", e))
        }
    }
}

/// Lease from `pool`, falling back to a direct connection.
pub async fn acquire(
    pool: &AnyPool,
    connect: &AnyConnectOptions,
    options: &PoolOptions,
) -> Result<Lease> {
    checkout_or_fallback(
        options.max_attempts,
        options.max_size,
        move |_| async move { pool.acquire().await.map(Lease::pooled) },
        move || async move { AnyConnection::connect_with(connect).await.map(Lease::unpooled) },
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, PartialEq, Eq)]
    enum Got {
        Pooled(usize),
        Fallback,
    }

    fn io_error() -> sqlx::Error {
        sqlx::Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset",
        ))
    }

    #[tokio::test]
    async fn first_healthy_checkout_wins() {
        let calls = AtomicUsize::new(0);
        let got = checkout_or_fallback(
            3,
            5,
            |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Ok(Got::Pooled(attempt)) }
            },
            || async { Ok(Got::Fallback) },
        )
        .await
        .unwrap();

        assert_eq!(got, Got::Pooled(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn transport_errors_are_retried_within_bound() {
        let got = checkout_or_fallback(
            3,
            5,
            |attempt| async move {
                if attempt < 3 {
                    Err(io_error())
                } else {
                    Ok(Got::Pooled(attempt))
                }
            },
            || async { Ok(Got::Fallback) },
        )
        .await
        .unwrap();

        assert_eq!(got, Got::Pooled(3));
    }

    #[tokio::test]
    async fn exhausted_attempts_use_fallback() {
        let calls = AtomicUsize::new(0);
        let got = checkout_or_fallback(
            3,
            5,
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<Got, _>(sqlx::Error::PoolTimedOut) }
            },
            || async { Ok(Got::Fallback) },
        )
        .await
        .unwrap();

        assert_eq!(got, Got::Fallback);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn pool_timeout_reports_exhaustion() {
        let err = checkout_pooled(2, 4, |_| async {
            Err::<Got, _>(sqlx::Error::PoolTimedOut)
        })
        .await
        .unwrap_err();

        assert!(matches!(err, StoreError::PoolExhausted { max_size: 4 }));
        assert!(err.is_connectivity());
    }

    #[tokio::test]
    async fn non_transport_error_is_not_retried() {
        let calls = AtomicUsize::new(0);
        let err = checkout_pooled(3, 5, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<Got, _>(sqlx::Error::Configuration("bad password".into())) }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, StoreError::Connectivity { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_fallback_is_connectivity() {
        let err = checkout_or_fallback(
            1,
            5,
            |_| async { Err::<Got, _>(io_error()) },
            || async { Err(io_error()) },
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            StoreError::Connectivity {
                context: "opening fallback connection",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn zero_attempts_still_tries_once() {
        let got = checkout_or_fallback(
            0,
            5,
            |attempt| async move { Ok(Got::Pooled(attempt)) },
            || async { Ok(Got::Fallback) },
        )
        .await
        .unwrap();

        assert_eq!(got, Got::Pooled(1));
    }
}
