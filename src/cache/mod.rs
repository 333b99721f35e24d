//! External cache connectivity.
//!
//! This module handles:
//! - The connectivity state machine
//! - Redis client and the `CacheClient` seam
//! - Connection monitoring, timeouts, and optional reconnects
//! - Mock client for testing

pub mod client;
pub mod mock;
pub mod monitor;
pub mod reconnect;
pub mod state;

pub use client::{CacheClient, RedisCache};
pub use mock::{MockCacheClient, MockConfig};
pub use monitor::ConnectivityMonitor;
pub use reconnect::ReconnectPolicy;
pub use state::{replay, ConnectivityEvent, ConnectivityState};
