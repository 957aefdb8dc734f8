//! Show which backend the configuration selects

use anyhow::{Context, Result};

use alabanza_core::backend::redact_url;
use alabanza_core::{select_backend, BackendKind, StoreConfig};

pub fn run_backend(config: &StoreConfig) -> Result<()> {
    let kind = select_backend(config).context("Failed to select storage backend")?;
    match kind {
        BackendKind::Embedded { path } => {
            println!("embedded: {}", path.display());
        }
        BackendKind::Networked { url } => {
            println!("networked: {}", redact_url(&url));
            println!(
                "pool: max {} connections, {} attempts before fallback",
                config.pool.max_size, config.pool.max_attempts
            );
        }
    }
    Ok(())
}
