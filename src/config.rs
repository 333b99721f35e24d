//! Application configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::cache::ReconnectPolicy;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Server Configuration ===
    /// HTTP listen port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Deployment environment reported by `/info`.
    #[serde(default = "default_app_env")]
    pub app_env: String,

    /// Directory holding `app.log`.
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    // === Redis Connection ===
    /// Whether to attempt a Redis connection at all.
    #[serde(default = "default_true")]
    pub redis_enabled: bool,

    /// Redis host.
    #[serde(default = "default_redis_host")]
    pub redis_host: String,

    /// Redis port.
    #[serde(default = "default_redis_port")]
    pub redis_port: u16,

    /// Handshake timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub redis_connect_timeout_ms: u64,

    /// Per-command timeout in milliseconds.
    #[serde(default = "default_command_timeout_ms")]
    pub redis_command_timeout_ms: u64,

    /// Interval between liveness pings while connected; 0 disables them.
    #[serde(default = "default_health_check_ms")]
    pub redis_health_check_ms: u64,

    // === Reconnect Policy ===
    /// Reconnect with exponential backoff after the connection is lost.
    #[serde(default)]
    pub redis_reconnect: bool,

    /// First reconnect delay in milliseconds.
    #[serde(default = "default_reconnect_initial_ms")]
    pub redis_reconnect_initial_ms: u64,

    /// Reconnect delay cap in milliseconds.
    #[serde(default = "default_reconnect_max_ms")]
    pub redis_reconnect_max_ms: u64,

    // === Counter ===
    /// Redis key holding the counter.
    #[serde(default = "default_counter_key")]
    pub counter_key: String,

    /// Value served in local mode when Redis is not usable.
    #[serde(default)]
    pub counter_fallback: u64,
}

fn default_port() -> u16 {
    3000
}

fn default_app_env() -> String {
    "development".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_true() -> bool {
    true
}

fn default_redis_host() -> String {
    "localhost".to_string()
}

fn default_redis_port() -> u16 {
    6379
}

fn default_connect_timeout_ms() -> u64 {
    2000
}

fn default_command_timeout_ms() -> u64 {
    1000
}

fn default_health_check_ms() -> u64 {
    5000
}

fn default_reconnect_initial_ms() -> u64 {
    500
}

fn default_reconnect_max_ms() -> u64 {
    30_000
}

fn default_counter_key() -> String {
    "api_counter".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            app_env: default_app_env(),
            log_dir: default_log_dir(),
            redis_enabled: true,
            redis_host: default_redis_host(),
            redis_port: default_redis_port(),
            redis_connect_timeout_ms: default_connect_timeout_ms(),
            redis_command_timeout_ms: default_command_timeout_ms(),
            redis_health_check_ms: default_health_check_ms(),
            redis_reconnect: false,
            redis_reconnect_initial_ms: default_reconnect_initial_ms(),
            redis_reconnect_max_ms: default_reconnect_max_ms(),
            counter_key: default_counter_key(),
            counter_fallback: 0,
        }
    }
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("PORT must be non-zero".to_string());
        }

        if self.redis_host.trim().is_empty() {
            return Err("REDIS_HOST must not be empty".to_string());
        }

        if self.redis_connect_timeout_ms == 0 || self.redis_command_timeout_ms == 0 {
            return Err("REDIS_*_TIMEOUT_MS must be greater than 0".to_string());
        }

        if self.counter_key.is_empty() {
            return Err("COUNTER_KEY must not be empty".to_string());
        }

        if self.redis_reconnect && self.redis_reconnect_max_ms < self.redis_reconnect_initial_ms {
            return Err(
                "REDIS_RECONNECT_MAX_MS must be at least REDIS_RECONNECT_INITIAL_MS".to_string(),
            );
        }

        Ok(())
    }

    /// Connection URL for the Redis client.
    pub fn redis_url(&self) -> String {
        format!("redis://{}:{}/", self.redis_host, self.redis_port)
    }

    /// Handshake timeout.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.redis_connect_timeout_ms)
    }

    /// Per-command timeout.
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.redis_command_timeout_ms)
    }

    /// Liveness ping interval, `None` when disabled.
    pub fn health_check_interval(&self) -> Option<Duration> {
        (self.redis_health_check_ms > 0).then(|| Duration::from_millis(self.redis_health_check_ms))
    }

    /// Reconnect policy derived from the `REDIS_RECONNECT*` settings.
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            enabled: self.redis_reconnect,
            initial_delay_ms: self.redis_reconnect_initial_ms,
            max_delay_ms: self.redis_reconnect_max_ms,
            ..Default::default()
        }
    }
}
