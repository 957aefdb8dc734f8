//! Error types for the storage layer
//!
//! Library callers get structured errors; the binary wraps them with `anyhow`.

use std::time::Duration;

use thiserror::Error;

use crate::models::ValidationError;

/// Main error type for store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// `DATABASE_URL` was present but could not be used
    #[error("invalid connection string: {reason}")]
    InvalidConnectionString { reason: String },

    /// Opening or using a connection failed at the transport level
    #[error("connectivity error while {context}: {source}")]
    Connectivity {
        context: &'static str,
        #[source]
        source: sqlx::Error,
    },

    /// No idle pooled connection and the pool is at capacity
    #[error("connection pool exhausted ({max_size} connections in use)")]
    PoolExhausted { max_size: usize },

    /// Statement execution or constraint failure
    #[error("query failed: {source}")]
    Query {
        #[source]
        source: sqlx::Error,
    },

    /// Statement exceeded the caller's deadline and was aborted
    #[error("statement timed out after {0:?}")]
    Timeout(Duration),

    /// Input rejected before reaching the store
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    pub fn connectivity(context: &'static str, source: sqlx::Error) -> Self {
        Self::Connectivity { context, source }
    }

    /// Classify an error raised while running a statement.
    ///
    /// Transport failures stay connectivity-class; everything else the
    /// driver reports is a query failure.
    pub fn from_statement(source: sqlx::Error) -> Self {
        if is_transport_error(&source) {
            Self::Connectivity {
                context: "running statement",
                source,
            }
        } else {
            Self::Query { source }
        }
    }

    /// True for errors the UI should treat as "store unreachable"
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            Self::Connectivity { .. } | Self::PoolExhausted { .. } | Self::Timeout(_)
        )
    }
}

pub(crate) fn is_transport_error(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn io_failures_are_connectivity() {
        let err = StoreError::from_statement(sqlx::Error::Io(io::Error::new(
            io::ErrorKind::ConnectionReset,
            "reset",
        )));
        assert!(matches!(err, StoreError::Connectivity { .. }));
        assert!(err.is_connectivity());
    }

    #[test]
    fn row_errors_are_query_failures() {
        let err = StoreError::from_statement(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Query { .. }));
        assert!(!err.is_connectivity());
    }

    #[test]
    fn validation_converts() {
        let err: StoreError = ValidationError::Empty { field: "song name" }.into();
        assert_eq!(err.to_string(), "song name cannot be empty");
    }
}
