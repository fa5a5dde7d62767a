//! # config — Config from Environment Variables
//!
//! | Variable             | Default        | Description                                  |
//! |----------------------|----------------|----------------------------------------------|
//! | `BIND_ADDR`          | `0.0.0.0:3000` | Address Axum listens on                      |
//! | `DATABASE_URL`       | —              | PostgreSQL URL (`postgres` feature only)     |
//! | `DB_MAX_CONNECTIONS` | `10`           | Pool size                                    |
//! | `SEED_FILE`          | —              | JSON seed for the in-memory store            |
//! | `API_TOKEN`          | —              | Bearer token; unset = allow all (dev mode)   |

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr:          SocketAddr,
    pub database_url:       Option<String>,
    pub db_max_connections: u32,
    pub seed_file:          Option<PathBuf>,
    pub api_token:          Option<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key → value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        // Empty strings count as unset, the way `.env` templates leave them.
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_addr = get("BIND_ADDR")
            .unwrap_or_else(|| "0.0.0.0:3000".to_string())
            .parse::<SocketAddr>()
            .context("BIND_ADDR must be a socket address, e.g. 0.0.0.0:3000")?;

        let db_max_connections = match get("DB_MAX_CONNECTIONS") {
            Some(v) => v.parse::<u32>().context("DB_MAX_CONNECTIONS must be a number")?,
            None => 10,
        };

        Ok(Self {
            bind_addr,
            database_url: get("DATABASE_URL"),
            db_max_connections,
            seed_file:    get("SEED_FILE").map(PathBuf::from),
            api_token:    get("API_TOKEN"),
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr:          SocketAddr::from(([0, 0, 0, 0], 3000)),
            database_url:       None,
            db_max_connections: 10,
            seed_file:          None,
            api_token:          None,
        }
    }
}
