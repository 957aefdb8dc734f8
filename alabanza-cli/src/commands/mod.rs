//! Command implementations for the alabanza CLI

pub mod backend;
pub mod catalog;
pub mod migrate;
pub mod serve;

use std::path::PathBuf;

use clap::Args;

use alabanza_core::StoreConfig;

pub use backend::run_backend;
pub use catalog::{run_mixes, run_songs};
pub use migrate::run_migrate;
pub use serve::run_serve;

/// Store selection flags shared by every command.
///
/// Each flag also reads its environment variable (including `.env` files);
/// anything still unset falls back to defaults.
#[derive(Args, Debug, Default)]
pub struct StoreArgs {
    /// PostgreSQL URL; selects the networked store
    #[arg(long, global = true, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// SQLite file for the embedded store
    #[arg(long, global = true, env = "ALABANZA_DB_PATH")]
    pub db: Option<PathBuf>,

    /// Maximum pooled connections
    #[arg(long, global = true, env = "ALABANZA_POOL_SIZE")]
    pub pool_size: Option<usize>,
}

impl StoreArgs {
    pub fn resolve(&self) -> StoreConfig {
        let mut config = StoreConfig::from_env();
        if let Some(url) = &self.database_url {
            config.database_url = Some(url.clone());
        }
        if let Some(path) = &self.db {
            config.embedded_path = path.clone();
        }
        if let Some(size) = self.pool_size.filter(|n| *n > 0) {
            config.pool.max_size = size;
        }
        config
    }
}
