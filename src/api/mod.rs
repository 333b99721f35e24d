//! HTTP API module: health, info, users, counter, and log endpoints.

pub mod handlers;
pub mod middleware;
pub mod routes;

pub use handlers::{AppState, ServerInfo};
pub use routes::create_router;
