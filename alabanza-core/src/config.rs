//! Store configuration - environment loading
//!
//! Configuration is loaded from environment variables:
//! - `DATABASE_URL`: PostgreSQL connection string; presence selects the
//!   networked backend
//! - `ALABANZA_DB_PATH`: SQLite file for the embedded backend (default: alabanza.db)
//! - `ALABANZA_POOL_SIZE`: maximum pooled connections (default: 5)
//! - `ALABANZA_POOL_ATTEMPTS`: checkout attempts before fallback (default: 3)
//! - `ALABANZA_SLOW_QUERY_MS`: slow statement threshold (default: 1000)

use std::path::PathBuf;
use std::time::Duration;

use crate::pool::{PoolOptions, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_SIZE};

/// File name used by the embedded backend when nothing else is configured
pub const DEFAULT_DB_FILE: &str = "alabanza.db";

/// Statements slower than this are reported
pub const DEFAULT_SLOW_QUERY: Duration = Duration::from_secs(1);

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Networked store connection string; `None` selects the embedded store
    pub database_url: Option<String>,
    /// Embedded store file
    pub embedded_path: PathBuf,
    pub pool: PoolOptions,
    pub slow_query_threshold: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            embedded_path: PathBuf::from(DEFAULT_DB_FILE),
            pool: PoolOptions::default(),
            slow_query_threshold: DEFAULT_SLOW_QUERY,
        }
    }
}

impl StoreConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary key lookup (for testing)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parse_usize = |key: &str, default: usize| {
            lookup(key)
                .and_then(|v| v.trim().parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(default)
        };

        Self {
            database_url: lookup("DATABASE_URL"),
            embedded_path: lookup("ALABANZA_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.embedded_path),
            pool: PoolOptions {
                max_size: parse_usize("ALABANZA_POOL_SIZE", DEFAULT_MAX_SIZE),
                max_attempts: parse_usize("ALABANZA_POOL_ATTEMPTS", DEFAULT_MAX_ATTEMPTS),
                ..defaults.pool
            },
            slow_query_threshold: lookup("ALABANZA_SLOW_QUERY_MS")
                .and_then(|v| v.trim().parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.slow_query_threshold),
        }
    }

    /// Embedded store at an explicit path (for testing)
    pub fn embedded(path: impl Into<PathBuf>) -> Self {
        Self {
            embedded_path: path.into(),
            ..Self::default()
        }
    }
}

/// Load environment variables from .env files
///
/// Priority order (highest to lowest):
/// 1. Environment variables already set
/// 2. Current directory .env
/// 3. ~/.alabanza/.env
///
/// Returns the files that were loaded. Runs before logging is set up, so
/// reporting them is left to the caller.
pub fn load_dotenv() -> Vec<PathBuf> {
    let mut loaded_from = Vec::new();

    if let Ok(path) = dotenvy::dotenv() {
        loaded_from.push(path);
    }

    if let Some(env_file) = config_dir().map(|dir| dir.join(".env")) {
        // dotenvy doesn't overwrite existing vars
        if env_file.exists() && dotenvy::from_path(&env_file).is_ok() {
            loaded_from.push(env_file);
        }
    }

    loaded_from
}

/// The alabanza config directory (~/.alabanza)
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".alabanza"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_select_embedded_file() {
        let config = StoreConfig::from_lookup(lookup(&[]));
        assert_eq!(config.database_url, None);
        assert_eq!(config.embedded_path, PathBuf::from("alabanza.db"));
        assert_eq!(config.pool.max_size, 5);
        assert_eq!(config.pool.max_attempts, 3);
        assert_eq!(config.slow_query_threshold, Duration::from_secs(1));
    }

    #[test]
    fn reads_overrides() {
        let config = StoreConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db/alabanza"),
            ("ALABANZA_POOL_SIZE", "8"),
            ("ALABANZA_SLOW_QUERY_MS", "250"),
        ]));
        assert_eq!(config.database_url.as_deref(), Some("postgres://db/alabanza"));
        assert_eq!(config.pool.max_size, 8);
        assert_eq!(config.slow_query_threshold, Duration::from_millis(250));
    }

    #[test]
    fn ignores_unparseable_or_zero_sizes() {
        let config = StoreConfig::from_lookup(lookup(&[
            ("ALABANZA_POOL_SIZE", "lots"),
            ("ALABANZA_POOL_ATTEMPTS", "0"),
        ]));
        assert_eq!(config.pool.max_size, DEFAULT_MAX_SIZE);
        assert_eq!(config.pool.max_attempts, DEFAULT_MAX_ATTEMPTS);
    }
}
