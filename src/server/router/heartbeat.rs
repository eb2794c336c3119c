//! `POST/GET /heartbeat` (spec.md §6): refresh or check an agent's liveness.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::server::state::ServeState;

pub(crate) fn router() -> Router<ServeState> {
    Router::new().route("/heartbeat", get(get_heartbeat_handler).post(post_heartbeat_handler))
}

#[derive(Deserialize)]
struct HeartbeatBody {
    #[serde(rename = "agentId")]
    agent_id: String,
}

#[instrument(name = "agent.heartbeat.post", skip(state), fields(agent_id = %body.agent_id))]
async fn post_heartbeat_handler(State(state): State<ServeState>, Json(body): Json<HeartbeatBody>) -> impl IntoResponse {
    match state.registry.get(&body.agent_id) {
        Some(coordinator) => match coordinator.heartbeat().await {
            Ok(timestamp) => Json(json!({"success": true, "timestamp": timestamp})).into_response(),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"success": false, "error": err.to_string()})),
            )
                .into_response(),
        },
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"success": false, "error": "agent not found"})),
        )
            .into_response(),
    }
}

#[derive(Deserialize)]
struct AgentIdQuery {
    #[serde(rename = "agentId")]
    agent_id: String,
}

#[instrument(name = "agent.heartbeat.get", skip(state), fields(agent_id = %query.agent_id))]
async fn get_heartbeat_handler(State(state): State<ServeState>, Query(query): Query<AgentIdQuery>) -> impl IntoResponse {
    match state.registry.get(&query.agent_id) {
        Some(coordinator) => {
            let (last_beat, elapsed, alive) = coordinator.heartbeat_status();
            Json(json!({
                "alive": alive,
                "lastBeat": last_beat,
                "elapsed": elapsed,
                "timeout": state.config.loop_.client_gone_threshold_secs,
            }))
            .into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"success": false, "error": "agent not found"})),
        )
            .into_response(),
    }
}
