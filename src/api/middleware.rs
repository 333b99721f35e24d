//! Request logging middleware.

use std::net::SocketAddr;
use std::time::Instant;

use axum::extract::{ConnectInfo, MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;

use super::handlers::AppState;
use crate::metrics;

/// Latency label for requests that matched no route.
pub const UNMATCHED_ENDPOINT: &str = "unmatched";

/// Append `<METHOD> <path> - <client ip>` to the app log and record latency.
///
/// Latency is labelled by route template (`/users/:id`), never the raw path.
pub async fn request_log(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let start = Instant::now();
    let path = request.uri().path().to_string();
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_ENDPOINT.to_string());
    let client_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    state
        .log
        .append(&format!("{} {} - {}", request.method(), path, client_ip));

    let response = next.run(request).await;
    metrics::record_http_latency(start, endpoint);
    response
}
