use std::sync::Arc;

use axum::{
    http::StatusCode,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::rotation::TokenRotator;

pub mod handlers;

/// Shared state for the HTTP surface.
pub struct AppState {
    pub rotator: Arc<TokenRotator>,
    /// Mall the endpoints act on.
    pub tenant_id: String,
}

/// Build the refresh API router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/refresh", post(handlers::refresh))
        .route("/credential", get(handlers::get_credential))
        .fallback(fallback_404)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn fallback_404() -> StatusCode {
    StatusCode::NOT_FOUND
}
