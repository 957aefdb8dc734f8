//! alabanza CLI - song catalog and live alert server
//!
//! Entry point for the `alabanza` binary:
//! - `serve`: HTTP API and WebSocket alert relay
//! - `migrate`: create or upgrade the schema and report what changed
//! - `backend`: show which store the configuration selects
//! - `songs` / `mixes`: print the catalog

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod tracing_setup;

use commands::StoreArgs;
use tracing_setup::TracingConfig;

#[derive(Parser, Debug)]
#[command(
    name = "alabanza",
    author,
    version,
    about = "Song and mix catalog with live director alerts",
    long_about = "Manage a worship group's songs and set lists on a local SQLite file or a \
                  shared PostgreSQL server, and relay live cues to every connected screen."
)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(flatten)]
    store: StoreArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API and alert relay
    Serve(commands::serve::ServeArgs),
    /// Create missing tables and columns, then report
    Migrate(commands::migrate::MigrateArgs),
    /// Show the selected storage backend without connecting
    Backend,
    /// List songs, newest first
    Songs(commands::catalog::SongsArgs),
    /// List mixes, or show one with its songs
    Mixes(commands::catalog::MixesArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env first: it may set RUST_LOG and the flags' environment fallbacks
    let dotenv_files = alabanza_core::config::load_dotenv();
    let cli = Cli::parse();
    tracing_setup::init_tracing(&TracingConfig { debug: cli.debug }).ok();
    if dotenv_files.is_empty() {
        tracing::debug!("No .env files found, using process environment only");
    } else {
        let files: Vec<_> = dotenv_files.iter().map(|p| p.display().to_string()).collect();
        tracing::info!("Loaded configuration from: {}", files.join(", "));
    }

    let config = cli.store.resolve();
    match cli.command {
        Commands::Serve(args) => commands::run_serve(args, &config).await?,
        Commands::Migrate(args) => commands::run_migrate(args, &config).await?,
        Commands::Backend => commands::run_backend(&config)?,
        Commands::Songs(args) => commands::run_songs(args, &config).await?,
        Commands::Mixes(args) => commands::run_mixes(args, &config).await?,
    }

    Ok(())
}
