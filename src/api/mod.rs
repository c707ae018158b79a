use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::gate::AccessGate;

pub mod admin_view;
pub mod handlers;

/// Shared application state passed to handlers.
pub struct AppState {
    pub gate: AccessGate,
}

/// Build the full application: gate, admin and decision routes plus the
/// response middleware stack.
pub fn app(state: Arc<AppState>, request_timeout: Duration) -> Router {
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/check-access", get(handlers::check_access))
        .route("/admin", get(handlers::admin_panel))
        .route("/action", post(handlers::record_decision))
        .fallback(fallback_404)
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        // The client runs from arbitrary pages, so any origin may poll.
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn(crate::middleware::headers::request_id))
        .layer(middleware::from_fn(crate::middleware::headers::security_headers))
}

async fn fallback_404() -> StatusCode {
    StatusCode::NOT_FOUND
}
