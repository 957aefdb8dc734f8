//! alabanza-core: persistence and live-alert layer for the song catalog
//!
//! One data-access stack targets either an embedded SQLite file or a pooled
//! PostgreSQL server, chosen from configuration at startup. Repositories sit
//! on a [`QueryExecutor`] and never see which backend is active. Alerts fan
//! out through [`AlertBroadcaster`] without touching storage.

pub mod backend;
pub mod broadcast;
pub mod config;
pub mod dialect;
pub mod error;
pub mod executor;
pub mod models;
pub mod pool;
pub mod repos;
pub mod row;
pub mod schema;

pub use backend::{open_backend, select_backend, BackendKind, StorageBackend};
pub use broadcast::{AlertBroadcaster, AlertEvent, DeliveryReport, SubscriberId, Subscription};
pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use executor::{ExecOptions, Fetch, Outcome, QueryExecutor};
pub use models::{Mix, MixDetails, NewMix, NewSong, Song, SongSummary, ValidationError};
pub use repos::{MixRepo, SongRepo};
pub use row::{Row, Value};
pub use schema::{ensure_schema, MigrationReport};

/// Open the configured backend and bring its schema up to date.
///
/// Migration problems are logged and returned in the report; only backend
/// selection errors fail.
pub async fn open(config: &StoreConfig) -> Result<(QueryExecutor, MigrationReport)> {
    let backend = open_backend(config)?;
    let exec = QueryExecutor::new(backend).with_slow_threshold(config.slow_query_threshold);
    let report = ensure_schema(&exec).await;
    if !report.is_clean() {
        tracing::warn!(
            warnings = report.warnings.len(),
            "schema is not fully up to date"
        );
    }
    Ok((exec, report))
}
