//! Configuration management.
//!
//! Loads configuration from environment variables with sensible defaults. The
//! result is an explicit value handed to the storage layer at startup; nothing
//! below the binaries reads the environment.

use crate::tier::Deployment;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Storage configuration
    pub storage: StorageConfig,
    /// HTTP server configuration
    pub server: ServerConfig,
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Remote `PostgreSQL` store, if configured
    pub database: Option<DatabaseConfig>,
    /// Directory holding the local JSON files
    pub data_dir: PathBuf,
    /// Whether the runtime is a restricted (managed, ephemeral) context
    pub restricted: bool,
}

/// `PostgreSQL` configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of idle connections in the pool
    pub min_connections: u32,
    /// Connection acquire timeout in seconds
    pub connect_timeout: u64,
}

// The URL carries credentials.
impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &"<redacted>")
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Log filter directive used when `RUST_LOG` is unset
    pub log_level: String,
}

impl AppConfig {
    /// Load configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through `lookup`, which returns a variable's value
    /// or `None` when it is unset.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let database = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .map(|url| DatabaseConfig {
                url,
                max_connections: parsed(&lookup, "DATABASE_MAX_CONNECTIONS").unwrap_or(10),
                min_connections: parsed(&lookup, "DATABASE_MIN_CONNECTIONS").unwrap_or(1),
                connect_timeout: parsed(&lookup, "DATABASE_CONNECT_TIMEOUT").unwrap_or(10),
            });

        let restricted = lookup("CAROLS_RESTRICTED_RUNTIME")
            .is_some_and(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
            || lookup("APP_ENV").is_some_and(|v| v.trim() == "production")
            || lookup("VERCEL").is_some_and(|v| v.trim() == "1");

        Self {
            storage: StorageConfig {
                database,
                data_dir: lookup("CAROLS_DATA_DIR")
                    .map_or_else(|| PathBuf::from("data"), PathBuf::from),
                restricted,
            },
            server: ServerConfig {
                host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parsed(&lookup, "PORT").unwrap_or(3000),
                log_level: lookup("RUST_LOG")
                    .unwrap_or_else(|| "info,carol_reservations=debug,sqlx=warn".to_string()),
            },
        }
    }
}

/// Reads `name` through `lookup` and parses it, ignoring unparsable values.
fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    lookup(name).and_then(|s| s.trim().parse().ok())
}

impl StorageConfig {
    /// The deployment facts that decide the storage plan.
    #[must_use]
    pub const fn deployment(&self) -> Deployment {
        Deployment {
            remote_configured: self.database.is_some(),
            restricted: self.restricted,
        }
    }
}
