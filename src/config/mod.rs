//! Configuration module for the bookmark backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Which key-value backend holds the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Sqlite,
    Memory,
}

impl StorageBackend {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Some(StorageBackend::Sqlite),
            "memory" => Some(StorageBackend::Memory),
            _ => None,
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key guarding the management API (unset disables auth)
    pub api_key: Option<String>,
    /// Key-value backend selection
    pub storage: StorageBackend,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Seconds between retention sweeps, 0 disables the sweeper
    pub sweep_interval_secs: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let api_key = env::var("NAV_API_KEY").ok().filter(|k| !k.is_empty());

        let storage = match env::var("NAV_STORAGE") {
            Ok(raw) => StorageBackend::parse(&raw).unwrap_or_else(|| {
                tracing::warn!("Unknown NAV_STORAGE value {:?}, using sqlite", raw);
                StorageBackend::Sqlite
            }),
            Err(_) => StorageBackend::Sqlite,
        };

        let db_path = env::var("NAV_DB_PATH")
            .unwrap_or_else(|_| "./data/bookmarks.sqlite".to_string())
            .into();

        let bind_addr = env::var("NAV_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .expect("Invalid NAV_BIND_ADDR format");

        let log_level = env::var("NAV_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let sweep_interval_secs = env::var("NAV_SWEEP_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3600);

        Self {
            api_key,
            storage,
            db_path,
            bind_addr,
            log_level,
            sweep_interval_secs,
        }
    }
}
