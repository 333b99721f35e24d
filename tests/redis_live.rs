//! Tests against a real Redis server.
//!
//! These require Redis on REDIS_HOST:REDIS_PORT (default localhost:6379).
//! Run with: cargo test --test redis_live -- --ignored

use std::sync::Arc;
use std::time::Duration;

use sample_api::applog::AppLog;
use sample_api::cache::{CacheClient, ConnectivityMonitor, ConnectivityState, RedisCache};
use sample_api::config::Config;
use sample_api::counter::{CounterService, IncrementOutcome, StorageMode};

fn test_config() -> Config {
    Config::load().unwrap_or_default()
}

#[tokio::test]
#[ignore = "requires a running Redis"]
async fn test_counter_against_redis() {
    let config = test_config();
    let client = Arc::new(RedisCache::new(&config.redis_host, config.redis_port).unwrap());
    let log = Arc::new(AppLog::tracing_only());
    let monitor = Arc::new(ConnectivityMonitor::new(
        client.clone(),
        config.connect_timeout(),
        log.clone(),
    ));

    monitor.initiate().unwrap().await.unwrap();
    assert_eq!(monitor.current_state(), ConnectivityState::Connected);

    // Use a private key so the test does not disturb the shared counter.
    let key = format!("sample_api_test_{}", std::process::id());
    let counter = CounterService::new(monitor, key.clone(), 0, config.command_timeout(), log);

    let before = counter.read().await;
    assert_eq!(before.mode, StorageMode::External);
    assert_eq!(before.value, 0);

    assert_eq!(counter.increment().await, IncrementOutcome::Incremented(1));
    assert_eq!(counter.read().await.value, 1);

    assert_eq!(client.get(&key).await.unwrap(), Some("1".to_string()));
}

#[tokio::test]
#[ignore = "requires nothing listening on 127.0.0.1:1"]
async fn test_unreachable_redis_is_unavailable() {
    let client = Arc::new(RedisCache::new("127.0.0.1", 1).unwrap());
    let monitor = Arc::new(ConnectivityMonitor::new(
        client,
        Duration::from_millis(500),
        Arc::new(AppLog::tracing_only()),
    ));

    monitor.initiate().unwrap().await.unwrap();
    assert_eq!(monitor.current_state(), ConnectivityState::Unavailable);
}
