//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the chat relay and health endpoints under a single Axum
//! router. The landing page itself is static and, when a site directory is
//! configured, is served for every other path.

pub mod chat;

use std::path::Path;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// API routes: chat relay and health check.
fn api_routes(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/chat", post(chat::handle_chat))
        .route("/healthz", get(healthz))
        .layer(cors)
        .with_state(state)
}

/// Full application router: API routes plus the optional static page shell.
pub fn app(state: AppState, site_dir: Option<&Path>) -> Router {
    let router = api_routes(state);
    let router = match site_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true)),
        None => router,
    };
    router.layer(TraceLayer::new_for_http())
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
