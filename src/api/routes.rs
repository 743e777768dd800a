//! API Routes
//!
//! Configures the Axum router: control endpoints under `/__proxy`, every
//! other path through the proxy.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{health_handler, message_handler, proxy_handler, stats_handler, AppState};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `POST /__proxy/message` - Deliver a control message
/// - `GET /__proxy/stats` - Get proxy statistics
/// - `GET /__proxy/health` - Health check endpoint
/// - anything else - Answered by the proxy
///
/// # Middleware
/// - CORS: Allows any origin on the control endpoints
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let control = Router::new()
        .route("/message", post(message_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors);

    Router::new()
        .nest("/__proxy", control)
        .fallback(proxy_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
