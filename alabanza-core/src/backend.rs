//! Storage backends: selection and connection leasing
//!
//! Two variants sit behind [`StorageBackend`]:
//! - [`EmbeddedBackend`]: local SQLite file, a fresh connection per call
//! - [`NetworkedBackend`]: PostgreSQL through a bounded sqlx `AnyPool`
//!
//! Callers never branch on which one is active.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::any::AnyConnectOptions;
use sqlx::postgres::PgConnectOptions;
use sqlx::{AnyConnection, AnyPool, Connection};

use crate::config::StoreConfig;
use crate::dialect::{Dialect, PlaceholderStyle};
use crate::error::{Result, StoreError};
use crate::pool::{self, PoolOptions, PoolStatus};

pub use crate::pool::Lease;

/// Which physical store the configuration points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendKind {
    Embedded { path: PathBuf },
    Networked { url: String },
}

/// Decide the backend from configuration. Pure; performs no I/O.
///
/// A non-blank `database_url` selects the networked store; it must be a
/// well-formed PostgreSQL URL. Anything else selects the embedded file.
///
/// # Errors
///
/// [`StoreError::InvalidConnectionString`] for a malformed URL. It is never
/// silently downgraded to the embedded store.
pub fn select_backend(config: &StoreConfig) -> Result<BackendKind> {
    let url = match config.database_url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => url,
        _ => {
            return Ok(BackendKind::Embedded {
                path: config.embedded_path.clone(),
            })
        }
    };

    if !(url.starts_with("postgres://") || url.starts_with("postgresql://")) {
        return Err(StoreError::InvalidConnectionString {
            reason: format!(
                "expected a postgres:// or postgresql:// URL, got '{}'",
                redact_url(url)
            ),
        });
    }
    PgConnectOptions::from_str(url).map_err(|e| StoreError::InvalidConnectionString {
        reason: e.to_string(),
    })?;

    Ok(BackendKind::Networked {
        url: url.to_owned(),
    })
}

/// Hide credentials before a URL reaches a log line
pub fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_owned();
    };
    let authority_end = rest.find('/').unwrap_or(rest.len());
    match rest[..authority_end].rfind('@') {
        Some(at) => format!("{scheme}://***@{}", &rest[at + 1..]),
        None => url.to_owned(),
    }
}

/// Capability set shared by both backends
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Lease a connection. Must be paired with [`StorageBackend::release`];
    /// a dropped lease is still returned or closed.
    async fn acquire(&self) -> Result<Lease>;

    async fn release(&self, lease: Lease) {
        lease.finish().await;
    }

    fn dialect(&self) -> Dialect;

    fn placeholder_style(&self) -> PlaceholderStyle {
        self.dialect().placeholder_style()
    }

    /// Human-readable target, safe to log
    fn describe(&self) -> String;

    /// Pool counters, if this backend pools
    fn pool_status(&self) -> Option<PoolStatus> {
        None
    }
}

/// Build the configured backend. Opens no connections.
pub fn open_backend(config: &StoreConfig) -> Result<Arc<dyn StorageBackend>> {
    let backend: Arc<dyn StorageBackend> = match select_backend(config)? {
        BackendKind::Embedded { path } => Arc::new(EmbeddedBackend::new(path)?),
        BackendKind::Networked { url } => {
            Arc::new(NetworkedBackend::new(&url, config.pool.clone())?)
        }
    };
    tracing::info!(backend = %backend.describe(), "storage backend selected");
    Ok(backend)
}

/// Parse a URL for sqlx's runtime-selected driver
pub fn connect_options(url: &str) -> Result<AnyConnectOptions> {
    sqlx::any::install_default_drivers();
    AnyConnectOptions::from_str(url).map_err(|e| StoreError::InvalidConnectionString {
        reason: e.to_string(),
    })
}

/// SQLite file URL, created on first connect if missing
pub fn sqlite_url(path: &Path) -> String {
    format!("sqlite://{}?mode=rwc", path.display())
}

/// Local SQLite file; one fresh connection per call
#[derive(Debug)]
pub struct EmbeddedBackend {
    path: PathBuf,
    connect: AnyConnectOptions,
}

impl EmbeddedBackend {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let connect = connect_options(&sqlite_url(&path))?;
        Ok(Self { path, connect })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl StorageBackend for EmbeddedBackend {
    async fn acquire(&self) -> Result<Lease> {
        // Ensure parent directory exists
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::connectivity("creating store directory", e.into()))?;
        }
        let conn = AnyConnection::connect_with(&self.connect)
            .await
            .map_err(|e| StoreError::connectivity("opening embedded store", e))?;
        Ok(Lease::unpooled(conn))
    }

    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn describe(&self) -> String {
        format!("embedded ({})", self.path.display())
    }
}

/// Remote store behind a bounded pool
#[derive(Debug)]
pub struct NetworkedBackend {
    pool: AnyPool,
    connect: AnyConnectOptions,
    options: PoolOptions,
    dialect: Dialect,
    label: String,
}

impl NetworkedBackend {
    /// PostgreSQL backend. The pool starts empty and fills on demand.
    ///
    /// Must be called inside a Tokio runtime; the pool spawns its reaper.
    pub fn new(url: &str, options: PoolOptions) -> Result<Self> {
        Self::with_dialect(url, options, Dialect::Postgres)
    }

    /// Pooled backend for any URL sqlx understands, with an explicit dialect
    pub fn with_dialect(url: &str, options: PoolOptions, dialect: Dialect) -> Result<Self> {
        let connect = connect_options(url)?;
        Ok(Self {
            pool: options.build_lazy(connect.clone()),
            connect,
            options,
            dialect,
            label: redact_url(url),
        })
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }
}

#[async_trait]
impl StorageBackend for NetworkedBackend {
    async fn acquire(&self) -> Result<Lease> {
        pool::acquire(&self.pool, &self.connect, &self.options).await
    }

    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn describe(&self) -> String {
        format!("networked ({})", self.label)
    }

    fn pool_status(&self) -> Option<PoolStatus> {
        Some(PoolStatus::of(&self.pool))
    }
}
