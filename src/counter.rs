//! Degraded-mode counter.
//!
//! Reads and increments go to the cache while the monitor reports
//! `Connected`. Otherwise reads serve the process-local fallback value and
//! increments report that nothing durable happened. The fallback is never
//! incremented in place of the cache, and never reconciled with it.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use strum::Display;
use tracing::{debug, info, warn};

use crate::applog::AppLog;
use crate::cache::ConnectivityMonitor;
use crate::error::CacheError;
use crate::metrics;

/// Where a counter value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
pub enum StorageMode {
    /// Authoritative value from the external cache.
    #[serde(rename = "redis")]
    #[strum(serialize = "redis")]
    External,
    /// Process-local best-effort value.
    #[serde(rename = "memory")]
    #[strum(serialize = "memory")]
    Local,
}

/// Result of [`CounterService::read`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterReading {
    /// Counter value.
    pub value: u64,
    /// Source of the value.
    pub mode: StorageMode,
}

/// Result of [`CounterService::increment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncrementOutcome {
    /// The cache applied the increment; carries the new value.
    Incremented(u64),
    /// No durable increment happened.
    Unavailable,
}

/// Counter backed by the cache with a local fallback.
pub struct CounterService {
    /// Connectivity monitor owning the client.
    monitor: Arc<ConnectivityMonitor>,
    /// Cache key.
    key: String,
    /// Value served in local mode.
    fallback: u64,
    /// Deadline for each remote call.
    command_timeout: Duration,
    /// Application log.
    log: Arc<AppLog>,
}

impl CounterService {
    /// Create a counter service over `monitor`.
    pub fn new(
        monitor: Arc<ConnectivityMonitor>,
        key: impl Into<String>,
        fallback: u64,
        command_timeout: Duration,
        log: Arc<AppLog>,
    ) -> Self {
        Self {
            monitor,
            key: key.into(),
            fallback,
            command_timeout,
            log,
        }
    }

    /// Cache key used for the counter.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the counter.
    pub async fn read(&self) -> CounterReading {
        let reading = self.read_inner().await;
        metrics::inc_counter_reads(reading.mode);
        reading
    }

    async fn read_inner(&self) -> CounterReading {
        let generation = self.monitor.generation();
        if !self.monitor.current_state().is_connected() {
            return self.local_reading();
        }

        let result = self
            .call("GET", self.monitor.client().get(&self.key))
            .await
            .and_then(parse_stored_value);

        match result {
            Ok(value) => CounterReading {
                value,
                mode: StorageMode::External,
            },
            Err(e) => {
                self.absorb(&e, generation);
                self.local_reading()
            }
        }
    }

    /// Increment the counter by one.
    pub async fn increment(&self) -> IncrementOutcome {
        let generation = self.monitor.generation();
        if !self.monitor.current_state().is_connected() {
            debug!("Increment requested while Redis is not connected");
            metrics::inc_counter_increments("unavailable");
            return IncrementOutcome::Unavailable;
        }

        let result = self
            .call("INCR", self.monitor.client().incr(&self.key))
            .await
            .and_then(|raw| u64::try_from(raw).map_err(|_| CacheError::InvalidValue(raw.to_string())));

        match result {
            Ok(value) => {
                info!(key = %self.key, value = value, "Counter incremented");
                self.log
                    .append(&format!("Counter incremented to {} (Redis)", value));
                metrics::inc_counter_increments("incremented");
                IncrementOutcome::Incremented(value)
            }
            Err(e) => {
                self.absorb(&e, generation);
                metrics::inc_counter_increments("unavailable");
                IncrementOutcome::Unavailable
            }
        }
    }

    fn local_reading(&self) -> CounterReading {
        CounterReading {
            value: self.fallback,
            mode: StorageMode::Local,
        }
    }

    /// Bound a remote call by the command timeout.
    async fn call<T, F>(&self, operation: &'static str, fut: F) -> Result<T, CacheError>
    where
        F: Future<Output = Result<T, CacheError>>,
    {
        tokio::time::timeout(self.command_timeout, fut)
            .await
            .unwrap_or_else(|_| {
                Err(CacheError::Timeout {
                    operation,
                    timeout_ms: self.command_timeout.as_millis() as u64,
                })
            })
    }

    /// Log a remote failure and downgrade connectivity when the connection
    /// itself is at fault. `generation` is the attempt the call ran under.
    fn absorb(&self, error: &CacheError, generation: u64) {
        warn!(key = %self.key, error = %error, "Redis call failed, serving degraded result");
        metrics::inc_cache_errors(error.kind());
        self.log.append(&format!("Redis error: {}", error));

        if error.is_connection_level() {
            self.monitor.on_error_from(generation, &error.to_string());
        }
    }
}

/// Interpret a stored counter. Absent keys count as zero.
fn parse_stored_value(raw: Option<String>) -> Result<u64, CacheError> {
    match raw {
        None => Ok(0),
        Some(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| CacheError::InvalidValue(s)),
    }
}
