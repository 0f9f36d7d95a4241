//! Axum router configuration with middleware.
//!
//! Queue routes are under `/api/v1/`; `/health` sits at the top level.
//! Middleware: CORS, tracing.

use axum::Router;
use axum::routing::{delete, get};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route(
            "/queue",
            get(handlers::queue::poll).post(handlers::queue::submit),
        )
        .route("/queue/stats", get(handlers::queue::stats))
        .route("/queue/{id}", delete(handlers::queue::cancel));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
