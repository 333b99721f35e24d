//! Sample HTTP API with a Redis-backed counter.
//!
//! The counter degrades instead of failing when Redis is unreachable:
//!
//! ```text
//! GET  /counter            Connected → {counter: n, storage: "redis"}
//!                          otherwise → {counter: fallback, storage: "memory"}
//! POST /counter/increment  Connected → {counter: n+1, storage: "redis"}
//!                          otherwise → {counter: "Redis not available",
//!                                       storage: "not available"}
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`cache`]: Connectivity state machine, Redis client, monitor
//! - [`counter`]: Degraded-mode counter service
//! - [`users`]: In-memory user list
//! - [`applog`]: Append-only application log file
//! - [`api`]: HTTP routes and handlers
//! - [`metrics`]: Prometheus metrics
//! - [`utils`]: Utility functions

pub mod api;
pub mod applog;
pub mod cache;
pub mod config;
pub mod counter;
pub mod error;
pub mod metrics;
pub mod users;
pub mod utils;

pub use config::Config;
pub use error::{AppError, Result};
