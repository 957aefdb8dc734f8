//! Repository implementations for database access
//!
//! Each repository follows these patterns:
//! - One parameterized statement per operation, built on [`QueryExecutor`]
//! - Validation before any statement is sent
//! - Missing rows are `None`/`false`, not errors
//!
//! [`QueryExecutor`]: crate::executor::QueryExecutor

pub mod mixes;
pub mod songs;

pub use mixes::MixRepo;
pub use songs::SongRepo;

use crate::row::Row;
use crate::{Result, StoreError};

/// Id from an `INSERT ... RETURNING id` row
pub(crate) fn returned_id(row: Option<Row>) -> Result<i64> {
    row.as_ref()
        .and_then(|r| r.i64("id"))
        .ok_or(StoreError::Query {
            source: sqlx::Error::RowNotFound,
        })
}
