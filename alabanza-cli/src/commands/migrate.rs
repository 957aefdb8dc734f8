//! Schema migration command

use anyhow::{bail, Result};
use clap::Parser;

use alabanza_core::StoreConfig;

/// Arguments for the migrate command
#[derive(Parser, Debug)]
pub struct MigrateArgs {
    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run_migrate(args: MigrateArgs, config: &StoreConfig) -> Result<()> {
    let (_exec, report) = alabanza_core::open(config).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for table in &report.created_tables {
            println!("created table {table}");
        }
        for column in &report.added_columns {
            println!("added column {column}");
        }
        for warning in &report.warnings {
            println!("warning: {}: {}", warning.step, warning.message);
        }
        if report.created_tables.is_empty() && report.added_columns.is_empty() {
            println!("schema up to date");
        }
    }

    if !report.is_clean() {
        bail!("schema migration finished with {} warning(s)", report.warnings.len());
    }
    Ok(())
}
