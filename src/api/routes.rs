//! API Routes
//!
//! Configures the Axum router with all key-value endpoints.

use axum::{middleware, routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    delete_all_keys, delete_key, get_all_keys, get_key, head_all_keys, head_key, health_handler,
    metrics_handler, metrics_middleware, put_keys, put_keys_at, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET|PUT|DELETE|HEAD /api/keys` - All keys
/// - `GET|PUT|DELETE|HEAD /api/keys/:id` - One key
/// - `GET /health` - Health check (204, no body)
/// - `GET /metrics` - Prometheus metrics
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs API requests; health checks are left out of the log
/// - Metrics: Counts and times every request
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route(
            "/keys",
            get(get_all_keys)
                .put(put_keys)
                .delete(delete_all_keys)
                .head(head_all_keys),
        )
        .route(
            "/keys/:id",
            get(get_key)
                .put(put_keys_at)
                .delete(delete_key)
                .head(head_key),
        )
        .layer(TraceLayer::new_for_http());

    Router::new()
        .nest("/api", api)
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(cors)
        .with_state(state)
}
