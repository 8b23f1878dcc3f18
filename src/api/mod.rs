use std::sync::Arc;

use axum::http::Method;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::middleware::headers;
use crate::AppState;

pub mod handlers;

/// Build the full HTTP router: health probes plus `GET /embed-info`.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::healthz))
        .route("/embed-info", get(handlers::embed_info))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        // Browser front-ends on any origin may fetch embed info.
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
                .allow_headers(Any),
        )
        .layer(axum::middleware::from_fn(headers::request_id))
        .layer(axum::middleware::from_fn(headers::security_headers))
}
