//! HTTP API route definitions.

use axum::routing::{get, post};
use axum::{middleware, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{
    create_user, get_counter, get_logs, get_user, health, increment_counter, info, list_users,
    metrics_text, not_found, root, AppState,
};
use super::middleware::request_log;

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        // Health endpoints
        .route("/health", get(health))
        .route("/info", get(info))
        // Users
        .route("/users", get(list_users).post(create_user))
        .route("/users/:id", get(get_user))
        // Counter
        .route("/counter", get(get_counter))
        .route("/counter/increment", post(increment_counter))
        // Diagnostics
        .route("/logs", get(get_logs))
        .route("/metrics", get(metrics_text))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), request_log))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use super::*;
    use crate::api::middleware::UNMATCHED_ENDPOINT;
    use crate::applog::{AppLog, LOG_FILE_NAME};
    use crate::cache::MockCacheClient;
    use crate::config::Config;
    use crate::metrics::METRIC_HTTP_REQUEST_LATENCY;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        AppState::from_config(
            &Config::default(),
            Arc::new(MockCacheClient::new()),
            Arc::new(AppLog::tracing_only()),
        )
    }

    async fn call(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_reports_not_connected_before_initiate() {
        let (status, body) = call(create_router(test_state()), get("/health")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["redis"], "not connected");
        assert_eq!(body["redis_state"], "unknown");
    }

    #[tokio::test]
    async fn health_reports_connected_after_handshake() {
        let state = test_state();
        state.monitor.initiate().unwrap().await.unwrap();

        let (_, body) = call(create_router(state), get("/health")).await;
        assert_eq!(body["redis"], "connected");
    }

    #[tokio::test]
    async fn root_lists_endpoints() {
        let (status, body) = call(create_router(test_state()), get("/")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["endpoints"]["counter"], "GET /counter");
    }

    #[tokio::test]
    async fn info_reports_port_and_environment() {
        let (_, body) = call(create_router(test_state()), get("/info")).await;

        assert_eq!(body["port"], 3000);
        assert_eq!(body["environment"], "development");
    }

    #[tokio::test]
    async fn users_list_create_and_fetch() {
        let state = test_state();

        let (_, body) = call(create_router(state.clone()), get("/users")).await;
        assert_eq!(body["count"], 2);

        let (status, body) = call(
            create_router(state.clone()),
            post_json("/users", json!({"name": "Ada", "email": "ada@example.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"], json!({"id": 3, "name": "Ada", "email": "ada@example.com"}));

        let (status, body) = call(create_router(state), get("/users/3")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["name"], "Ada");
    }

    #[tokio::test]
    async fn create_user_without_email_is_400() {
        let (status, body) = call(
            create_router(test_state()),
            post_json("/users", json!({"name": "Ada"})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"success": false, "error": "Name and email are required"}));
    }

    #[tokio::test]
    async fn create_user_with_malformed_body_is_400() {
        let request = Request::builder()
            .method("POST")
            .uri("/users")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let (status, _) = call(create_router(test_state()), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_user_is_404() {
        for uri in ["/users/99", "/users/abc"] {
            let (status, body) = call(create_router(test_state()), get(uri)).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(body["error"], "User not found");
        }
    }

    #[tokio::test]
    async fn unknown_route_is_json_404() {
        let (status, body) = call(create_router(test_state()), get("/nope")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            body,
            json!({"success": false, "error": "Endpoint not found", "path": "/nope"})
        );
    }

    #[tokio::test]
    async fn logs_endpoint_returns_request_lines() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::from_config(
            &Config::default(),
            Arc::new(MockCacheClient::new()),
            Arc::new(AppLog::open(dir.path()).unwrap()),
        );

        call(create_router(state.clone()), get("/health")).await;
        let (status, body) = call(create_router(state), get("/logs")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 2);
        assert!(body["logs"][0]
            .as_str()
            .unwrap()
            .ends_with("GET /health - unknown"));
    }

    #[tokio::test]
    async fn metrics_without_recorder_is_404() {
        let (status, _) = call(create_router(test_state()), get("/metrics")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unreadable_log_is_500() {
        let dir = tempfile::tempdir().unwrap();
        let log = AppLog::open(dir.path()).unwrap();
        std::fs::create_dir(dir.path().join(LOG_FILE_NAME)).unwrap();
        let state = AppState::from_config(
            &Config::default(),
            Arc::new(MockCacheClient::new()),
            Arc::new(log),
        );

        let (status, body) = call(create_router(state), get("/logs")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"success": false, "error": "Failed to read logs"}));
    }

    #[test]
    fn latency_is_labelled_by_route_template() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        ::metrics::with_local_recorder(&recorder, || {
            runtime.block_on(async {
                let app = create_router(test_state());
                for i in 0..50 {
                    call(app.clone(), get(&format!("/scan/{}", i))).await;
                }
                call(app.clone(), get("/users/1")).await;
                call(app, get("/users/2")).await;
            })
        });

        let rendered = handle.render();
        let endpoints: HashSet<&str> = rendered
            .lines()
            .filter(|line| line.starts_with(METRIC_HTTP_REQUEST_LATENCY))
            .filter_map(|line| line.split("endpoint=\"").nth(1))
            .filter_map(|rest| rest.split('"').next())
            .collect();

        assert_eq!(endpoints, HashSet::from(["/users/:id", UNMATCHED_ENDPOINT]));
    }
}
