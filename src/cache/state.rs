//! Connectivity state machine for the external cache.
//!
//! ```text
//! Unknown ──ConnectStarted──▶ Connecting ──Connected──▶ Connected
//!                                 │                        │
//!                                 └────────Failed──────────┤
//!                                                          ▼
//! Unavailable ◀────────────────────────────────────────────┘
//!      │
//!      └──ConnectStarted──▶ Connecting
//! ```
//!
//! Every other (state, event) pair leaves the state untouched.

use serde::Serialize;
use strum::{Display, EnumString};

/// Availability of the external cache as seen by this process.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString, Default,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConnectivityState {
    /// No connect attempt has completed yet.
    #[default]
    Unknown,
    /// Handshake in flight.
    Connecting,
    /// Handshake completed; calls are expected to succeed.
    Connected,
    /// An error was observed. Terminal until a new connect attempt.
    Unavailable,
}

/// Notification fed into the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectivityEvent {
    /// A connect attempt is starting.
    ConnectStarted,
    /// The handshake completed.
    Connected,
    /// A connection-level failure (refused, timeout, dropped).
    Failed(String),
}

impl ConnectivityState {
    /// Apply `event`, returning the next state or `None` when the event does
    /// not apply in this state.
    pub fn on_event(self, event: &ConnectivityEvent) -> Option<ConnectivityState> {
        use ConnectivityState::*;

        match (self, event) {
            (Unknown | Unavailable, ConnectivityEvent::ConnectStarted) => Some(Connecting),
            (Connecting, ConnectivityEvent::Connected) => Some(Connected),
            (Connecting | Connected, ConnectivityEvent::Failed(_)) => Some(Unavailable),
            _ => None,
        }
    }

    /// Whether remote calls should be attempted.
    pub fn is_connected(self) -> bool {
        self == ConnectivityState::Connected
    }

    /// Label reported by `/health`.
    pub fn health_label(self) -> &'static str {
        if self.is_connected() {
            "connected"
        } else {
            "not connected"
        }
    }
}

/// Fold a sequence of events starting from `Unknown`.
pub fn replay<'a, I>(events: I) -> ConnectivityState
where
    I: IntoIterator<Item = &'a ConnectivityEvent>,
{
    events
        .into_iter()
        .fold(ConnectivityState::Unknown, |state, event| {
            state.on_event(event).unwrap_or(state)
        })
}
