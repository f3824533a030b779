//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! One port per prop. `/ws` carries the display protocol, `/state` exposes
//! the current snapshot for debugging, and everything else is the display's
//! static files (HTML, JS, videos) served from the public directory.

pub mod ws;

use std::path::Path;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::runtime::PropHandle;

#[derive(Clone)]
pub struct AppState {
    pub handle: PropHandle,
    pub prop_id: String,
}

/// Full router for one prop process.
pub fn app(state: AppState, public_dir: &Path) -> Router {
    let files = ServeDir::new(public_dir).append_index_html_on_directories(true);
    Router::new()
        .route("/ws", get(ws::handle_ws))
        .route("/state", get(current_state))
        .route("/healthz", get(healthz))
        .fallback_service(files)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn current_state(State(state): State<AppState>) -> Response {
    match state.handle.snapshot().await {
        Some(snapshot) => Json(snapshot).into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "prop runtime stopped").into_response(),
    }
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
