pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::warn;

use crate::optimization::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    // Only /api/* is exposed cross-origin.
    let api = Router::new()
        .route("/optimize", post(handlers::handle_optimize))
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .layer(cors_layer(&state.config.cors_allowed_origins));

    Router::new()
        .route("/health", get(health::health_handler))
        .nest("/api", api)
        .with_state(state)
}

/// An empty origin list allows any origin.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins.iter().filter_map(|origin| {
            HeaderValue::from_str(origin)
                .map_err(|e| warn!("Ignoring invalid CORS origin '{origin}': {e}"))
                .ok()
        }))
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}
