//! HTTP surface (spec.md §6): one `axum` router over `ServeState`, plus the
//! ambient liveness/readiness endpoints every deployment needs regardless
//! of what the core does.

mod router;
pub mod state;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::CorsLayer;

pub use state::ServeState;

/// Assemble the full application router: every route group plus `/health`,
/// `/livez`, `/readyz`, with a permissive CORS layer (the teacher's demo
/// frontend and this agent's control surface are expected to run on
/// different origins).
pub fn build_router(state: ServeState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/livez", get(livez_handler))
        .route("/readyz", get(readyz_handler))
        .merge(router::router())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_handler(State(state): State<ServeState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "liveAgents": state.registry.len(),
    }))
}

async fn livez_handler(State(state): State<ServeState>) -> impl IntoResponse {
    if state.health.is_live() {
        (StatusCode::OK, Json(json!({"live": true})))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"live": false})))
    }
}

async fn readyz_handler(State(state): State<ServeState>) -> impl IntoResponse {
    if state.health.is_ready() {
        (StatusCode::OK, Json(json!({"ready": true})))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"ready": false})))
    }
}
