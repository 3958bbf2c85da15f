use std::time::Duration;

use perfolio_core::widgets::EngineConfig;

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long background tasks get to stop after the listener closes (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Lifetime of cached widget reads in seconds (default: `300`).
    pub cache_ttl_secs: u64,
    /// How often expired cache entries are purged, in seconds (default: `60`).
    pub cache_sweep_interval_secs: u64,
    /// Deadline for a single widget store call in seconds (default: `10`).
    pub store_timeout_secs: u64,
    /// JWT token configuration (secret, expiry duration).
    pub jwt: JwtConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default                 |
    /// |-----------------------------|-------------------------|
    /// | `HOST`                      | `0.0.0.0`               |
    /// | `PORT`                      | `3000`                  |
    /// | `CORS_ORIGINS`              | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`      | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS`     | `30`                    |
    /// | `CACHE_TTL_SECS`            | `300`                   |
    /// | `CACHE_SWEEP_INTERVAL_SECS` | `60`                    |
    /// | `STORE_TIMEOUT_SECS`        | `10`                    |
    ///
    /// # Panics
    ///
    /// Panics on unparseable values so misconfiguration fails at startup.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs: secs_from_env("REQUEST_TIMEOUT_SECS", 30),
            shutdown_timeout_secs: secs_from_env("SHUTDOWN_TIMEOUT_SECS", 30),
            cache_ttl_secs: secs_from_env("CACHE_TTL_SECS", 300),
            cache_sweep_interval_secs: secs_from_env("CACHE_SWEEP_INTERVAL_SECS", 60),
            store_timeout_secs: secs_from_env("STORE_TIMEOUT_SECS", 10),
            jwt: JwtConfig::from_env(),
        }
    }

    /// Engine tunables derived from this configuration.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            store_timeout: Duration::from_secs(self.store_timeout_secs),
        }
    }
}

fn secs_from_env(name: &str, default: u64) -> u64 {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("{name} must be a valid u64")),
        Err(_) => default,
    }
}
