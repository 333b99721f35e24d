//! Lifecycle of the optional cache connection.
//!
//! The monitor owns the client handle and the [`ConnectivityState`]. State
//! lives in a `watch` channel: readers never block, every transition is
//! applied atomically through [`ConnectivityState::on_event`], and
//! subscribers (the reconnect loop, tests) observe each change.
//!
//! Each successful `initiate()` starts a new attempt generation. Failures
//! reported with an older generation belong to a connection that has already
//! been replaced and are dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, info, warn};

use super::client::CacheClient;
use super::reconnect::ReconnectPolicy;
use super::state::{ConnectivityEvent, ConnectivityState};
use crate::applog::AppLog;
use crate::error::CacheError;
use crate::metrics;

/// Owns the cache connection and its availability signal.
pub struct ConnectivityMonitor {
    /// Underlying cache client.
    client: Arc<dyn CacheClient>,
    /// Current state; the sender is the single writer.
    state: watch::Sender<ConnectivityState>,
    /// Current attempt generation. Only written under the `state` lock.
    generation: AtomicU64,
    /// Deadline for the handshake and for health-check pings.
    connect_timeout: Duration,
    /// Application log for attempt/success/failure records.
    log: Arc<AppLog>,
}

impl ConnectivityMonitor {
    /// Create a monitor in the `Unknown` state. Does not connect.
    pub fn new(client: Arc<dyn CacheClient>, connect_timeout: Duration, log: Arc<AppLog>) -> Self {
        let (state, _) = watch::channel(ConnectivityState::Unknown);
        Self {
            client,
            state,
            generation: AtomicU64::new(0),
            connect_timeout,
            log,
        }
    }

    /// The shared client handle.
    pub fn client(&self) -> &Arc<dyn CacheClient> {
        &self.client
    }

    /// Latest known state. Never blocks.
    pub fn current_state(&self) -> ConnectivityState {
        *self.state.borrow()
    }

    /// Generation of the latest connection attempt.
    ///
    /// Capture it before a remote call and hand it to [`Self::on_error_from`]
    /// so a late failure cannot clobber a newer attempt.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Receive every subsequent state change.
    pub fn subscribe(&self) -> watch::Receiver<ConnectivityState> {
        self.state.subscribe()
    }

    /// Apply an event; returns the new state if a transition happened.
    ///
    /// With `Some(generation)`, the event is dropped unless it belongs to the
    /// current attempt.
    fn apply(&self, event: &ConnectivityEvent, generation: Option<u64>) -> Option<ConnectivityState> {
        let mut transition = None;
        self.state.send_if_modified(|state| {
            if generation.is_some_and(|g| g != self.generation.load(Ordering::SeqCst)) {
                return false;
            }
            match state.on_event(event) {
                Some(next) => {
                    if matches!(event, ConnectivityEvent::ConnectStarted) {
                        self.generation.fetch_add(1, Ordering::SeqCst);
                    }
                    transition = Some((*state, next));
                    *state = next;
                    true
                }
                None => false,
            }
        });

        let (from, to) = transition?;
        debug!(from = %from, to = %to, generation = self.generation(), "Cache connectivity transition");
        metrics::inc_cache_transitions(to);
        Some(to)
    }

    /// Start a connection attempt in the background.
    ///
    /// No-op (returns `None`) while already connecting or connected. The
    /// returned handle resolves once the attempt has been classified; callers
    /// are free to drop it.
    pub fn initiate(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if self.apply(&ConnectivityEvent::ConnectStarted, None).is_none() {
            debug!(state = %self.current_state(), "Connect attempt skipped");
            return None;
        }
        let generation = self.generation();

        let endpoint = self.client.endpoint();
        info!(endpoint = %endpoint, generation = generation, "Connecting to Redis");
        self.log
            .append(&format!("Attempting Redis connection to {}", endpoint));

        let monitor = Arc::clone(self);
        Some(tokio::spawn(async move {
            let outcome = time::timeout(monitor.connect_timeout, monitor.client.connect())
                .await
                .unwrap_or_else(|_| {
                    Err(CacheError::Timeout {
                        operation: "connect",
                        timeout_ms: monitor.connect_timeout.as_millis() as u64,
                    })
                });

            match outcome {
                Ok(()) => monitor.connected(Some(generation)),
                Err(e) => monitor.failed(Some(generation), &e.to_string()),
            }
        }))
    }

    /// Handshake completed.
    pub fn on_connected(&self) {
        self.connected(None);
    }

    /// Connection-level failure. Never propagates.
    pub fn on_error(&self, reason: &str) {
        self.failed(None, reason);
    }

    /// Connection-level failure observed by a call that started under
    /// `generation`. Ignored if a newer attempt has begun since.
    pub fn on_error_from(&self, generation: u64, reason: &str) {
        self.failed(Some(generation), reason);
    }

    fn connected(&self, generation: Option<u64>) {
        if self.apply(&ConnectivityEvent::Connected, generation).is_some() {
            info!(endpoint = %self.client.endpoint(), "Connected to Redis");
            self.log.append("Connected to Redis successfully");
        } else {
            debug!(state = %self.current_state(), "Ignoring stale connect notification");
        }
    }

    fn failed(&self, generation: Option<u64>, reason: &str) {
        if self
            .apply(&ConnectivityEvent::Failed(reason.to_string()), generation)
            .is_some()
        {
            warn!(reason = %reason, "Redis connection error");
            self.log
                .append(&format!("Redis connection error: {}", reason));
        } else {
            debug!(reason = %reason, state = %self.current_state(), "Ignoring error notification");
        }
    }

    /// Ping the server once if connected, downgrading on a dead connection.
    ///
    /// Reply-level errors leave the state untouched.
    pub async fn check_connection(&self) {
        if !self.current_state().is_connected() {
            return;
        }
        let generation = self.generation();

        let outcome = time::timeout(self.connect_timeout, self.client.ping())
            .await
            .unwrap_or_else(|_| {
                Err(CacheError::Timeout {
                    operation: "PING",
                    timeout_ms: self.connect_timeout.as_millis() as u64,
                })
            });

        match outcome {
            Ok(()) => debug!("Redis health check ok"),
            Err(e) if e.is_connection_level() => {
                warn!(error = %e, "Redis health check failed");
                self.on_error_from(generation, &e.to_string());
            }
            Err(e) => debug!(error = %e, "Redis health check got an error reply"),
        }
    }

    /// Ping the server every `interval` while connected, so a dropped
    /// connection is noticed without request traffic.
    pub fn spawn_health_check(
        self: &Arc<Self>,
        interval: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        let monitor = Arc::clone(self);
        info!(interval_ms = interval.as_millis() as u64, "Redis health check starting");

        tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => monitor.check_connection().await,
                    _ = shutdown.recv() => break,
                }
            }

            debug!("Redis health check stopped");
        })
    }

    /// Reconnect with backoff whenever the state becomes `Unavailable`.
    ///
    /// Returns `None` when the policy is disabled.
    pub fn spawn_reconnect(
        self: &Arc<Self>,
        policy: ReconnectPolicy,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Option<JoinHandle<()>> {
        if !policy.enabled {
            info!("Redis reconnect disabled");
            return None;
        }

        let monitor = Arc::clone(self);
        let mut states = self.subscribe();

        Some(tokio::spawn(async move {
            let mut attempt = 0u32;

            loop {
                let state = *states.borrow_and_update();
                match state {
                    ConnectivityState::Connected => attempt = 0,
                    ConnectivityState::Unavailable => {
                        let delay = policy.next_delay(attempt);
                        attempt = attempt.saturating_add(1);
                        info!(attempt = attempt, delay_ms = delay.as_millis() as u64, "Reconnecting to Redis after delay");

                        tokio::select! {
                            _ = time::sleep(delay) => {
                                monitor.initiate();
                            }
                            _ = shutdown.recv() => break,
                        }
                        continue;
                    }
                    ConnectivityState::Unknown | ConnectivityState::Connecting => {}
                }

                tokio::select! {
                    changed = states.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = shutdown.recv() => break,
                }
            }

            debug!("Reconnect loop stopped");
        }))
    }
}
