//! HTTP API handlers.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, State};
use axum::http::{StatusCode, Uri};
use axum::response::IntoResponse;
use axum::Json;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use serde_json::json;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::applog::{AppLog, DEFAULT_TAIL_LINES};
use crate::cache::{CacheClient, ConnectivityMonitor};
use crate::config::Config;
use crate::counter::{CounterService, IncrementOutcome, StorageMode};
use crate::error::ApiError;
use crate::metrics;
use crate::users::{NewUser, User, UserStore};

/// Sentinel reported in place of a counter value when no increment happened.
pub const INCREMENT_UNAVAILABLE: &str = "Redis not available";

/// Storage label reported alongside [`INCREMENT_UNAVAILABLE`].
pub const STORAGE_NOT_AVAILABLE: &str = "not available";

/// Static facts about the running server.
#[derive(Debug, Clone)]
pub struct ServerInfo {
    /// Listen port.
    pub port: u16,
    /// Deployment environment.
    pub environment: String,
    /// Process start, for uptime.
    pub started_at: Instant,
}

/// Application state shared with handlers.
#[derive(Clone)]
pub struct AppState {
    /// Cache connectivity.
    pub monitor: Arc<ConnectivityMonitor>,
    /// Degraded-mode counter.
    pub counter: Arc<CounterService>,
    /// User list.
    pub users: Arc<UserStore>,
    /// Application log file.
    pub log: Arc<AppLog>,
    /// Server facts for `/info` and `/health`.
    pub info: Arc<ServerInfo>,
    /// Prometheus render handle, when a recorder is installed.
    pub prometheus: Option<PrometheusHandle>,
}

impl AppState {
    /// Wire the monitor, counter, and stores from configuration.
    ///
    /// Does not start connecting; call [`ConnectivityMonitor::initiate`].
    pub fn from_config(config: &Config, client: Arc<dyn CacheClient>, log: Arc<AppLog>) -> Self {
        let monitor = Arc::new(ConnectivityMonitor::new(
            client,
            config.connect_timeout(),
            log.clone(),
        ));
        let counter = Arc::new(CounterService::new(
            monitor.clone(),
            config.counter_key.clone(),
            config.counter_fallback,
            config.command_timeout(),
            log.clone(),
        ));

        Self {
            monitor,
            counter,
            users: Arc::new(UserStore::seeded()),
            log,
            info: Arc::new(ServerInfo {
                port: config.port,
                environment: config.app_env.clone(),
                started_at: Instant::now(),
            }),
            prometheus: None,
        }
    }

    /// Attach a Prometheus handle for `/metrics`.
    pub fn with_prometheus(mut self, handle: Option<PrometheusHandle>) -> Self {
        self.prometheus = handle;
        self
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always "healthy" while the process serves requests.
    pub status: &'static str,
    /// Current time, RFC 3339.
    pub timestamp: String,
    /// Seconds since start.
    pub uptime: f64,
    /// "connected" or "not connected".
    pub redis: &'static str,
    /// Detailed connectivity state.
    pub redis_state: String,
}

/// Server info response.
#[derive(Debug, Serialize)]
pub struct InfoResponse {
    /// Crate version.
    pub version: &'static str,
    /// Operating system.
    pub platform: &'static str,
    /// CPU architecture.
    pub arch: &'static str,
    /// Deployment environment.
    pub environment: String,
    /// Listen port.
    pub port: u16,
}

/// Counter value or the unavailable sentinel.
#[derive(Debug, Serialize, PartialEq)]
#[serde(untagged)]
pub enum CounterField {
    /// Numeric counter.
    Value(u64),
    /// Explanation that no value was produced.
    Message(&'static str),
}

/// Counter response for both read and increment.
#[derive(Debug, Serialize)]
pub struct CounterResponse {
    /// Always true; cache failures degrade rather than fail.
    pub success: bool,
    /// Counter value or sentinel.
    pub counter: CounterField,
    /// Storage label.
    pub storage: String,
}

/// Users list response.
#[derive(Debug, Serialize)]
pub struct UsersResponse {
    /// Always true.
    pub success: bool,
    /// Number of users.
    pub count: usize,
    /// Users ordered by id.
    pub data: Vec<User>,
}

/// Single user response.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    /// Always true.
    pub success: bool,
    /// The user.
    pub data: User,
}

/// Logs response.
#[derive(Debug, Serialize)]
pub struct LogsResponse {
    /// Always true.
    pub success: bool,
    /// Number of lines returned.
    pub count: usize,
    /// Most recent lines, oldest first.
    pub logs: Vec<String>,
}

fn now_rfc3339() -> String {
    let now = OffsetDateTime::now_utc();
    now.format(&Rfc3339)
        .unwrap_or_else(|_| now.unix_timestamp().to_string())
}

/// Welcome message and endpoint map.
pub async fn root() -> impl IntoResponse {
    Json(json!({
        "message": "Welcome to Sample API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "GET /health",
            "info": "GET /info",
            "users": "GET /users",
            "createUser": "POST /users",
            "user": "GET /users/{id}",
            "counter": "GET /counter",
            "incrementCounter": "POST /counter/increment",
            "logs": "GET /logs",
            "metrics": "GET /metrics"
        }
    }))
}

/// Health check handler - always returns 200, reports cache connectivity.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let connectivity = state.monitor.current_state();

    Json(HealthResponse {
        status: "healthy",
        timestamp: now_rfc3339(),
        uptime: state.info.started_at.elapsed().as_secs_f64(),
        redis: connectivity.health_label(),
        redis_state: connectivity.to_string(),
    })
}

/// Server info handler.
pub async fn info(State(state): State<AppState>) -> impl IntoResponse {
    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION"),
        platform: std::env::consts::OS,
        arch: std::env::consts::ARCH,
        environment: state.info.environment.clone(),
        port: state.info.port,
    })
}

/// List all users.
pub async fn list_users(State(state): State<AppState>) -> impl IntoResponse {
    let data = state.users.list();
    Json(UsersResponse {
        success: true,
        count: data.len(),
        data,
    })
}

/// Create a user. A missing or malformed body is a validation error.
pub async fn create_user(
    State(state): State<AppState>,
    body: Option<Json<NewUser>>,
) -> Result<impl IntoResponse, ApiError> {
    let new_user = body.map(|Json(b)| b).unwrap_or_default();
    let user = state.users.create(new_user)?;

    state
        .log
        .append(&format!("New user created: {} ({})", user.name, user.email));
    metrics::inc_users_created();

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            success: true,
            data: user,
        }),
    ))
}

/// Fetch one user by id.
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    id.parse::<u64>()
        .ok()
        .and_then(|id| state.users.get(id))
        .map(|user| {
            Json(UserResponse {
                success: true,
                data: user,
            })
        })
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}

/// Read the counter.
pub async fn get_counter(State(state): State<AppState>) -> impl IntoResponse {
    let reading = state.counter.read().await;

    Json(CounterResponse {
        success: true,
        counter: CounterField::Value(reading.value),
        storage: reading.mode.to_string(),
    })
}

/// Increment the counter.
pub async fn increment_counter(State(state): State<AppState>) -> impl IntoResponse {
    let response = match state.counter.increment().await {
        IncrementOutcome::Incremented(value) => CounterResponse {
            success: true,
            counter: CounterField::Value(value),
            storage: StorageMode::External.to_string(),
        },
        IncrementOutcome::Unavailable => CounterResponse {
            success: true,
            counter: CounterField::Message(INCREMENT_UNAVAILABLE),
            storage: STORAGE_NOT_AVAILABLE.to_string(),
        },
    };

    Json(response)
}

/// Tail of the application log.
pub async fn get_logs(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let logs = state.log.tail(DEFAULT_TAIL_LINES).map_err(|e| {
        tracing::error!(error = %e, "Failed to read app log");
        ApiError::Internal("Failed to read logs".to_string())
    })?;

    Ok(Json(LogsResponse {
        success: true,
        count: logs.len(),
        logs,
    }))
}

/// Prometheus exposition.
pub async fn metrics_text(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    state
        .prometheus
        .as_ref()
        .map(|handle| handle.render())
        .ok_or_else(|| ApiError::NotFound("Metrics not enabled".to_string()))
}

/// JSON 404 for unmatched routes.
pub async fn not_found(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "error": "Endpoint not found",
            "path": uri.path(),
        })),
    )
}
