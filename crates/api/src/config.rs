use std::time::Duration;

use parley_core::presence::{
    DEFAULT_HEARTBEAT_INTERVAL_SECS, DEFAULT_STALE_SECS, DEFAULT_SWEEP_INTERVAL_SECS,
};

use crate::auth::jwt::JwtConfig;

/// Default wait for the `connect` frame on a new WebSocket (in seconds).
const DEFAULT_HANDSHAKE_TIMEOUT_SECS: u64 = 10;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8080`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Postgres connection string. `None` selects the in-memory store.
    pub database_url: Option<String>,
    /// JWT token configuration (secret, expiry).
    pub jwt: JwtConfig,
    /// Presence timing (heartbeat, sweep cadence, staleness, handshake).
    pub presence: PresenceConfig,
}

/// Timing knobs for liveness tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceConfig {
    pub heartbeat_interval: Duration,
    pub sweep_interval: Duration,
    /// Entries idle for longer than this are evicted by the sweeper.
    pub stale_after: Duration,
    pub handshake_timeout: Duration,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(DEFAULT_HEARTBEAT_INTERVAL_SECS),
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            stale_after: Duration::from_secs(DEFAULT_STALE_SECS),
            handshake_timeout: Duration::from_secs(DEFAULT_HANDSHAKE_TIMEOUT_SECS),
        }
    }
}

impl PresenceConfig {
    /// Check the ordering constraints between the intervals.
    ///
    /// The staleness threshold must exceed the sweep cadence, and a live
    /// client's heartbeat must arrive more often than the threshold.
    pub fn validate(&self) -> Result<(), String> {
        if self.sweep_interval.is_zero() {
            return Err("PRESENCE_SWEEP_INTERVAL_SECS must be greater than zero".into());
        }
        if self.stale_after <= self.sweep_interval {
            return Err(format!(
                "PRESENCE_STALE_SECS ({}s) must be greater than PRESENCE_SWEEP_INTERVAL_SECS ({}s)",
                self.stale_after.as_secs(),
                self.sweep_interval.as_secs()
            ));
        }
        if self.heartbeat_interval.is_zero() || self.heartbeat_interval >= self.stale_after {
            return Err(format!(
                "HEARTBEAT_INTERVAL_SECS ({}s) must be non-zero and less than PRESENCE_STALE_SECS ({}s)",
                self.heartbeat_interval.as_secs(),
                self.stale_after.as_secs()
            ));
        }
        Ok(())
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .unwrap_or_else(|_| panic!("{name} must be a valid u64"))
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                        | Default                 |
    /// |--------------------------------|-------------------------|
    /// | `HOST`                         | `0.0.0.0`               |
    /// | `PORT`                         | `8080`                  |
    /// | `CORS_ORIGINS`                 | `http://localhost:3000` |
    /// | `REQUEST_TIMEOUT_SECS`         | `30`                    |
    /// | `DATABASE_URL`                 | unset (in-memory store) |
    /// | `HEARTBEAT_INTERVAL_SECS`      | `20`                    |
    /// | `PRESENCE_SWEEP_INTERVAL_SECS` | `30`                    |
    /// | `PRESENCE_STALE_SECS`          | `60`                    |
    /// | `HANDSHAKE_TIMEOUT_SECS`       | `10`                    |
    ///
    /// # Panics
    ///
    /// Panics on unparsable values or when the presence intervals violate
    /// [`PresenceConfig::validate`].
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs = env_u64("REQUEST_TIMEOUT_SECS", 30);

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty());

        let presence = PresenceConfig {
            heartbeat_interval: Duration::from_secs(env_u64(
                "HEARTBEAT_INTERVAL_SECS",
                DEFAULT_HEARTBEAT_INTERVAL_SECS,
            )),
            sweep_interval: Duration::from_secs(env_u64(
                "PRESENCE_SWEEP_INTERVAL_SECS",
                DEFAULT_SWEEP_INTERVAL_SECS,
            )),
            stale_after: Duration::from_secs(env_u64("PRESENCE_STALE_SECS", DEFAULT_STALE_SECS)),
            handshake_timeout: Duration::from_secs(env_u64(
                "HANDSHAKE_TIMEOUT_SECS",
                DEFAULT_HANDSHAKE_TIMEOUT_SECS,
            )),
        };
        if let Err(msg) = presence.validate() {
            panic!("Invalid presence configuration: {msg}");
        }

        let jwt = JwtConfig::from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            database_url,
            jwt,
            presence,
        }
    }
}
