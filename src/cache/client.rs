//! Cache client abstraction and the Redis-backed implementation.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::error::CacheError;

/// Operations the counter needs from a key-value cache.
///
/// Implementations must be safe to share between concurrent request tasks;
/// `connect` may be called again after a failure to replace the handle.
#[async_trait]
pub trait CacheClient: Send + Sync {
    /// Perform the connection handshake.
    async fn connect(&self) -> Result<(), CacheError>;

    /// Read a raw string value. `Ok(None)` when the key is absent.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Atomically increment `key` by one and return the new value.
    async fn incr(&self, key: &str) -> Result<i64, CacheError>;

    /// Round-trip on the current connection without touching any key.
    async fn ping(&self) -> Result<(), CacheError>;

    /// Human-readable endpoint for log records.
    fn endpoint(&self) -> String;
}

/// Redis client over a multiplexed async connection.
pub struct RedisCache {
    /// Client used to open connections.
    client: redis::Client,
    /// Endpoint string (host:port).
    endpoint: String,
    /// Current connection handle, replaced on every successful `connect`.
    connection: RwLock<Option<MultiplexedConnection>>,
}

impl RedisCache {
    /// Create a client for `redis://host:port/`. Does not connect.
    pub fn new(host: &str, port: u16) -> Result<Self, CacheError> {
        let url = format!("redis://{}:{}/", host, port);
        let client = redis::Client::open(url).map_err(CacheError::from)?;

        Ok(Self {
            client,
            endpoint: format!("{}:{}", host, port),
            connection: RwLock::new(None),
        })
    }

    /// Clone the current handle; the multiplexed connection pipelines
    /// requests from all clones.
    async fn handle(&self) -> Result<MultiplexedConnection, CacheError> {
        self.connection
            .read()
            .await
            .clone()
            .ok_or(CacheError::NotConnected)
    }
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CacheClient for RedisCache {
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn connect(&self) -> Result<(), CacheError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        // Opening a multiplexed connection only dials the socket; PING proves
        // the server actually speaks the protocol.
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;

        *self.connection.write().await = Some(conn);
        debug!("Redis handshake complete");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.handle().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn incr(&self, key: &str) -> Result<i64, CacheError> {
        let mut conn = self.handle().await?;
        let value: i64 = conn.incr(key, 1).await?;
        Ok(value)
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.handle().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    fn endpoint(&self) -> String {
        self.endpoint.clone()
    }
}
