//! Mock cache client for unit testing.
//!
//! This module provides an in-process stand-in for Redis so the monitor and
//! counter can be exercised without a network dependency.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::client::CacheClient;
use crate::error::CacheError;

/// Configuration for mock client behavior.
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Whether the handshake fails.
    pub fail_connect: bool,
    /// Simulated latency in milliseconds, applied to every operation.
    pub latency_ms: u64,
}

/// Mock cache client for testing.
///
/// Clones share the same store and switches, so a test can keep a handle
/// and flip failure modes while the service under test holds another.
#[derive(Debug, Clone)]
pub struct MockCacheClient {
    /// Mock configuration.
    config: MockConfig,
    /// Stored values by key.
    store: Arc<Mutex<HashMap<String, String>>>,
    /// When set, every call fails with a connection error.
    disconnected: Arc<AtomicBool>,
    /// When set, calls on the current handle fail with a connection error
    /// but new handshakes still succeed.
    dropped: Arc<AtomicBool>,
    /// When set, every call fails with a reply error.
    reply_errors: Arc<AtomicBool>,
    /// Number of handshakes attempted.
    connect_calls: Arc<AtomicU64>,
    /// Number of pings received.
    ping_calls: Arc<AtomicU64>,
}

impl MockCacheClient {
    /// Create a new mock client with default configuration.
    pub fn new() -> Self {
        Self::with_config(MockConfig::default())
    }

    /// Create a mock client with custom configuration.
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            config,
            store: Arc::new(Mutex::new(HashMap::new())),
            disconnected: Arc::new(AtomicBool::new(false)),
            dropped: Arc::new(AtomicBool::new(false)),
            reply_errors: Arc::new(AtomicBool::new(false)),
            connect_calls: Arc::new(AtomicU64::new(0)),
            ping_calls: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Set a raw value.
    pub fn set(&self, key: &str, value: &str) {
        self.store
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    /// Read a raw value without going through the client interface.
    pub fn peek(&self, key: &str) -> Option<String> {
        self.store.lock().unwrap().get(key).cloned()
    }

    /// Simulate the server going away (or coming back).
    pub fn set_disconnected(&self, disconnected: bool) {
        self.disconnected.store(disconnected, Ordering::SeqCst);
    }

    /// Simulate the current connection dying while the server stays
    /// reachable for a fresh handshake.
    pub fn set_dropped(&self, dropped: bool) {
        self.dropped.store(dropped, Ordering::SeqCst);
    }

    /// Make every call fail with a reply-level error.
    pub fn set_reply_errors(&self, enabled: bool) {
        self.reply_errors.store(enabled, Ordering::SeqCst);
    }

    /// Number of `connect` calls seen so far.
    pub fn connect_calls(&self) -> u64 {
        self.connect_calls.load(Ordering::SeqCst)
    }

    /// Number of `ping` calls seen so far.
    pub fn ping_calls(&self) -> u64 {
        self.ping_calls.load(Ordering::SeqCst)
    }

    async fn simulate_latency(&self) {
        if self.config.latency_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.config.latency_ms)).await;
        }
    }

    fn check_call(&self) -> Result<(), CacheError> {
        if self.disconnected.load(Ordering::SeqCst) || self.dropped.load(Ordering::SeqCst) {
            return Err(CacheError::Connection("Mock connection dropped".to_string()));
        }
        if self.reply_errors.load(Ordering::SeqCst) {
            return Err(CacheError::Command("Mock reply error".to_string()));
        }
        Ok(())
    }
}

impl Default for MockCacheClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheClient for MockCacheClient {
    async fn connect(&self) -> Result<(), CacheError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        if self.config.fail_connect || self.disconnected.load(Ordering::SeqCst) {
            return Err(CacheError::Connection("Mock connection refused".to_string()));
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.simulate_latency().await;
        self.check_call()?;
        Ok(self.peek(key))
    }

    async fn incr(&self, key: &str) -> Result<i64, CacheError> {
        self.simulate_latency().await;
        self.check_call()?;

        let mut store = self.store.lock().unwrap();
        let current = match store.get(key) {
            Some(raw) => raw.parse::<i64>().map_err(|_| {
                CacheError::Command("ERR value is not an integer or out of range".to_string())
            })?,
            None => 0,
        };
        let next = current + 1;
        store.insert(key.to_string(), next.to_string());
        Ok(next)
    }

    async fn ping(&self) -> Result<(), CacheError> {
        self.ping_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        self.check_call()
    }

    fn endpoint(&self) -> String {
        "mock".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_client_incr_from_absent() {
        let client = MockCacheClient::new();

        assert_eq!(client.get("counter").await.unwrap(), None);
        assert_eq!(client.incr("counter").await.unwrap(), 1);
        assert_eq!(client.incr("counter").await.unwrap(), 2);
        assert_eq!(client.get("counter").await.unwrap(), Some("2".to_string()));
    }

    #[tokio::test]
    async fn mock_client_failure_modes() {
        let config = MockConfig {
            fail_connect: true,
            ..Default::default()
        };
        let client = MockCacheClient::with_config(config);
        assert!(client.connect().await.is_err());
        assert_eq!(client.connect_calls(), 1);

        let client = MockCacheClient::new();
        client.set_disconnected(true);
        assert!(client.get("k").await.unwrap_err().is_connection_level());

        client.set_disconnected(false);
        client.set_reply_errors(true);
        assert!(!client.incr("k").await.unwrap_err().is_connection_level());
    }

    #[tokio::test]
    async fn mock_client_dropped_handle_still_reconnects() {
        let client = MockCacheClient::new();
        client.set_dropped(true);

        assert!(client.ping().await.unwrap_err().is_connection_level());
        assert!(client.connect().await.is_ok());
        assert_eq!(client.ping_calls(), 1);
    }

    #[tokio::test]
    async fn mock_client_rejects_non_integer_incr() {
        let client = MockCacheClient::new();
        client.set("counter", "abc");

        assert!(matches!(
            client.incr("counter").await,
            Err(CacheError::Command(_))
        ));
    }
}
