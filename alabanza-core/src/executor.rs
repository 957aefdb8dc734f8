//! Uniform parameterized statement execution across backends
//!
//! Every call leases one connection, runs exactly one statement inside its
//! own transaction, and hands the connection back before returning,
//! whatever the outcome.

use std::sync::Arc;
use std::time::{Duration, Instant};

use sqlx::any::{Any, AnyArguments, AnyRow};
use sqlx::query::Query;
use sqlx::{AnyConnection, Connection};

use crate::backend::StorageBackend;
use crate::config::DEFAULT_SLOW_QUERY;
use crate::dialect::Dialect;
use crate::error::{Result, StoreError};
use crate::row::{Row, Value};

/// What to bring back from a statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fetch {
    /// Rows affected only
    None,
    /// First row, or an explicit "no row"
    One,
    All,
}

/// Per-call execution policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecOptions {
    /// Commit on success; otherwise the transaction is rolled back
    pub commit: bool,
    pub fetch: Fetch,
    /// Abort the statement after this long
    pub timeout: Option<Duration>,
}

impl ExecOptions {
    pub fn read_all() -> Self {
        Self {
            commit: false,
            fetch: Fetch::All,
            timeout: None,
        }
    }

    pub fn read_one() -> Self {
        Self {
            fetch: Fetch::One,
            ..Self::read_all()
        }
    }

    pub fn write() -> Self {
        Self {
            commit: true,
            fetch: Fetch::None,
            timeout: None,
        }
    }

    /// Write that returns a row (`INSERT ... RETURNING`)
    pub fn write_returning() -> Self {
        Self {
            fetch: Fetch::One,
            ..Self::write()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Result of [`QueryExecutor::execute`], shaped by [`Fetch`]
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Affected(u64),
    Row(Option<Row>),
    Rows(Vec<Row>),
}

impl Outcome {
    pub fn into_rows(self) -> Vec<Row> {
        match self {
            Self::Rows(rows) => rows,
            Self::Row(row) => row.into_iter().collect(),
            Self::Affected(_) => Vec::new(),
        }
    }

    pub fn into_row(self) -> Option<Row> {
        match self {
            Self::Rows(rows) => rows.into_iter().next(),
            Self::Row(row) => row,
            Self::Affected(_) => None,
        }
    }

    pub fn affected(&self) -> u64 {
        match self {
            Self::Affected(n) => *n,
            Self::Row(row) => u64::from(row.is_some()),
            Self::Rows(rows) => rows.len() as u64,
        }
    }
}

enum RawOutcome {
    Affected(u64),
    Row(Option<AnyRow>),
    Rows(Vec<AnyRow>),
}

/// Phase breakdown for slow-operation diagnostics
#[derive(Debug, Default, Clone, Copy)]
struct Phases {
    acquire: Duration,
    execute: Duration,
    finish: Duration,
}

/// Executes statements against the active backend
#[derive(Clone)]
pub struct QueryExecutor {
    backend: Arc<dyn StorageBackend>,
    slow_threshold: Duration,
}

impl std::fmt::Debug for QueryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryExecutor")
            .field("backend", &self.backend.describe())
            .field("slow_threshold", &self.slow_threshold)
            .finish()
    }
}

impl QueryExecutor {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            backend,
            slow_threshold: DEFAULT_SLOW_QUERY,
        }
    }

    pub fn with_slow_threshold(mut self, threshold: Duration) -> Self {
        self.slow_threshold = threshold;
        self
    }

    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    pub fn dialect(&self) -> Dialect {
        self.backend.dialect()
    }

    /// Run one statement written with `?` placeholders.
    ///
    /// Parameters are always bound, never spliced into the SQL text.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Connectivity`] if no connection could be leased or the
    ///   link failed mid-statement
    /// - [`StoreError::Query`] if the statement failed; the transaction has
    ///   been rolled back
    /// - [`StoreError::Timeout`] if `opts.timeout` elapsed
    pub async fn execute(&self, sql: &str, params: &[Value], opts: ExecOptions) -> Result<Outcome> {
        let started = Instant::now();
        let mut lease = self.backend.acquire().await?;
        let mut phases = Phases {
            acquire: started.elapsed(),
            ..Phases::default()
        };

        let sql = self.backend.placeholder_style().normalize(sql);
        let result = match opts.timeout {
            Some(limit) => {
                let run = run_statement(&mut lease, &sql, params, opts, &mut phases);
                match tokio::time::timeout(limit, run).await {
                    Ok(result) => result,
                    Err(_) => {
                        // Connection state is unknown after an aborted statement
                        lease.poison();
                        Err(StoreError::Timeout(limit))
                    }
                }
            }
            None => run_statement(&mut lease, &sql, params, opts, &mut phases).await,
        };
        self.backend.release(lease).await;

        let total = started.elapsed();
        if total >= self.slow_threshold {
            tracing::warn!(
                target: "alabanza::slow_query",
                statement = %summarize(&sql),
                acquire_ms = phases.acquire.as_millis() as u64,
                execute_ms = phases.execute.as_millis() as u64,
                finish_ms = phases.finish.as_millis() as u64,
                total_ms = total.as_millis() as u64,
                ok = result.is_ok(),
                "slow database operation"
            );
        }

        result
    }

    /// All rows of a read
    pub async fn fetch_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        Ok(self
            .execute(sql, params, ExecOptions::read_all())
            .await?
            .into_rows())
    }

    /// First row of a read, if any
    pub async fn fetch_optional(&self, sql: &str, params: &[Value]) -> Result<Option<Row>> {
        Ok(self
            .execute(sql, params, ExecOptions::read_one())
            .await?
            .into_row())
    }

    /// Committed write; returns rows affected
    pub async fn run(&self, sql: &str, params: &[Value]) -> Result<u64> {
        Ok(self
            .execute(sql, params, ExecOptions::write())
            .await?
            .affected())
    }

    /// Committed write returning one row
    pub async fn run_returning(&self, sql: &str, params: &[Value]) -> Result<Option<Row>> {
        Ok(self
            .execute(sql, params, ExecOptions::write_returning())
            .await?
            .into_row())
    }
}

async fn run_statement(
    conn: &mut AnyConnection,
    sql: &str,
    params: &[Value],
    opts: ExecOptions,
    phases: &mut Phases,
) -> Result<Outcome> {
    let mut tx = conn
        .begin()
        .await
        .map_err(|e| StoreError::connectivity("beginning transaction", e))?;

    let executing = Instant::now();
    let raw = match execute_raw(&mut tx, sql, params, opts.fetch).await {
        Ok(raw) => raw,
        Err(err) => {
            phases.execute = executing.elapsed();
            if let Err(rollback) = tx.rollback().await {
                tracing::warn!(error = %rollback, "rollback failed after statement error");
            }
            return Err(StoreError::from_statement(err));
        }
    };
    phases.execute = executing.elapsed();

    let finishing = Instant::now();
    let outcome = match materialize(raw) {
        Ok(outcome) => outcome,
        Err(err) => {
            if let Err(rollback) = tx.rollback().await {
                tracing::warn!(error = %rollback, "rollback failed after decode error");
            }
            return Err(StoreError::Query { source: err });
        }
    };
    let end = if opts.commit {
        tx.commit().await
    } else {
        tx.rollback().await
    };
    end.map_err(StoreError::from_statement)?;
    phases.finish = finishing.elapsed();

    Ok(outcome)
}

async fn execute_raw(
    conn: &mut AnyConnection,
    sql: &str,
    params: &[Value],
    fetch: Fetch,
) -> std::result::Result<RawOutcome, sqlx::Error> {
    let query = bind_params(sql, params);
    Ok(match fetch {
        Fetch::None => RawOutcome::Affected(query.execute(&mut *conn).await?.rows_affected()),
        Fetch::One => RawOutcome::Row(query.fetch_optional(&mut *conn).await?),
        Fetch::All => RawOutcome::Rows(query.fetch_all(&mut *conn).await?),
    })
}

fn bind_params<'q>(sql: &'q str, params: &'q [Value]) -> Query<'q, Any, AnyArguments<'q>> {
    params.iter().fold(sqlx::query(sql), |query, param| match param {
        Value::Null => query.bind(None::<String>),
        Value::Integer(v) => query.bind(*v),
        Value::Real(v) => query.bind(*v),
        Value::Bool(v) => query.bind(*v),
        Value::Text(v) => query.bind(v.as_str()),
    })
}

fn materialize(raw: RawOutcome) -> std::result::Result<Outcome, sqlx::Error> {
    Ok(match raw {
        RawOutcome::Affected(n) => Outcome::Affected(n),
        RawOutcome::Row(row) => Outcome::Row(row.as_ref().map(Row::from_any).transpose()?),
        RawOutcome::Rows(rows) => Outcome::Rows(
            rows.iter()
                .map(Row::from_any)
                .collect::<std::result::Result<_, _>>()?,
        ),
    })
}

/// First line of a statement, whitespace-collapsed, for log output
fn summarize(sql: &str) -> String {
    let collapsed = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    match collapsed.char_indices().nth(120) {
        Some((cut, _)) => format!("{}...", &collapsed[..cut]),
        None => collapsed,
    }
}
