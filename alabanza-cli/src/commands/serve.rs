//! HTTP server command
//!
//! Opens the configured store, brings the schema up to date and serves the
//! catalog API and alert relay until Ctrl+C.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;

use alabanza_core::StoreConfig;
use alabanza_server::{run_server, ServerConfig};

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to bind to; use 0.0.0.0:5000 to reach phones on the LAN
    #[arg(long, short = 'b', default_value = "127.0.0.1:5000")]
    pub bind: SocketAddr,

    /// Allow permissive CORS (all origins) - use with caution
    #[arg(long)]
    pub cors_permissive: bool,

    /// Token required for edits and alerts
    #[arg(long, env = "ALABANZA_ADMIN_TOKEN", hide_env_values = true)]
    pub admin_token: Option<String>,
}

/// Run the HTTP server
pub async fn run_serve(args: ServeArgs, store: &StoreConfig) -> Result<()> {
    tracing::info!("Starting alabanza server on {}", args.bind);

    let (exec, _report) = alabanza_core::open(store)
        .await
        .context("Failed to open song store")?;

    let config = ServerConfig {
        bind_addr: args.bind,
        cors_permissive: args.cors_permissive,
        admin_token: args.admin_token,
    };

    // Run server (blocks until shutdown)
    run_server(exec, config).await.context("Server error")?;

    Ok(())
}
