//! Schema creation and additive column migrations
//!
//! Safe to run on every start and concurrently with traffic: tables are
//! created with `IF NOT EXISTS`, and optional columns are added only after
//! the live column list shows they are missing. Failures are logged and
//! reported, never fatal.

use serde::Serialize;

use crate::executor::QueryExecutor;
use crate::StoreError;

/// Optional `songs` columns added after the first release
pub const SONG_OPTIONAL_COLUMNS: [&str; 3] = ["lyrics", "chords", "audio_url"];

/// Non-fatal migration problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationWarning {
    /// What was being attempted, e.g. `add column songs.lyrics`
    pub step: String,
    pub message: String,
}

/// What a schema pass did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    /// Tables that did not exist before this pass
    pub created_tables: Vec<String>,
    /// Columns added, as `table.column`
    pub added_columns: Vec<String>,
    pub warnings: Vec<MigrationWarning>,
}

impl MigrationReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    fn warn(&mut self, step: String, err: &StoreError) {
        tracing::warn!(step = %step, error = %err, "schema migration step failed, continuing");
        self.warnings.push(MigrationWarning {
            step,
            message: err.to_string(),
        });
    }
}

/// Create tables and add missing columns.
pub async fn ensure_schema(exec: &QueryExecutor) -> MigrationReport {
    tracing::info!("Ensuring schema...");
    let dialect = exec.dialect();
    let mut report = MigrationReport::default();

    let tables = [
        (
            "songs",
            format!(
                "CREATE TABLE IF NOT EXISTS songs (\
                 {}, name TEXT NOT NULL, tones TEXT, best TEXT, \
                 lyrics TEXT, chords TEXT, audio_url TEXT)",
                dialect.identity_column()
            ),
        ),
        (
            "mixes",
            format!(
                "CREATE TABLE IF NOT EXISTS mixes ({}, name TEXT NOT NULL, songs TEXT)",
                dialect.identity_column()
            ),
        ),
    ];

    for (table, ddl) in &tables {
        let existed = match existing_columns(exec, table).await {
            Ok(columns) => !columns.is_empty(),
            Err(err) => {
                report.warn(format!("inspect table {table}"), &err);
                true
            }
        };
        match exec.run(ddl, &[]).await {
            Ok(_) if !existed => report.created_tables.push((*table).to_owned()),
            Ok(_) => {}
            Err(err) => report.warn(format!("create table {table}"), &err),
        }
    }

    add_missing_columns(exec, "songs", &SONG_OPTIONAL_COLUMNS, &mut report).await;

    tracing::info!(
        created = report.created_tables.len(),
        added = report.added_columns.len(),
        warnings = report.warnings.len(),
        "Schema ready"
    );
    report
}

/// Column names of `table` as the store reports them right now
pub async fn existing_columns(exec: &QueryExecutor, table: &str) -> crate::Result<Vec<String>> {
    let rows = exec
        .fetch_all(exec.dialect().list_columns_sql(), &[table.into()])
        .await?;
    Ok(rows
        .iter()
        .filter_map(|row| row.text("name").map(str::to_owned))
        .collect())
}

async fn add_missing_columns(
    exec: &QueryExecutor,
    table: &str,
    wanted: &[&str],
    report: &mut MigrationReport,
) {
    let present = match existing_columns(exec, table).await {
        Ok(columns) => columns,
        Err(err) => {
            report.warn(format!("inspect table {table}"), &err);
            return;
        }
    };

    let dialect = exec.dialect();
    let missing = wanted
        .iter()
        .filter(|col| !present.iter().any(|p| p.eq_ignore_ascii_case(col)));

    for column in missing {
        let step = format!("add column {table}.{column}");
        match exec.run(&dialect.add_text_column_sql(table, column), &[]).await {
            Ok(_) => {
                tracing::info!(table, column, "added column");
                report.added_columns.push(format!("{table}.{column}"));
            }
            // Another process added it between our inspection and the ALTER
            Err(StoreError::Query { source }) if dialect.is_duplicate_column(&source) => {
                tracing::debug!(table, column, "column appeared concurrently");
            }
            Err(err) => report.warn(step, &err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_report() {
        let mut report = MigrationReport::default();
        assert!(report.is_clean());
        report.warn(
            "add column songs.lyrics".into(),
            &StoreError::PoolExhausted { max_size: 1 },
        );
        assert!(!report.is_clean());
        assert_eq!(report.warnings[0].step, "add column songs.lyrics");
    }
}
