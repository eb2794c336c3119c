//! `GET/POST/DELETE /state` (spec.md §6): read, write, or delete an agent's
//! persisted state record directly against the key-value backend.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::persistence::{agent_key, TTL_AGENT_STATE};
use crate::server::state::ServeState;

const STATE_SUFFIX: &str = "state";

pub(crate) fn router() -> Router<ServeState> {
    Router::new().route(
        "/state",
        get(get_state_handler).post(post_state_handler).delete(delete_state_handler),
    )
}

#[derive(Deserialize)]
struct AgentIdQuery {
    #[serde(rename = "agentId")]
    agent_id: String,
}

#[instrument(name = "agent.state.get", skip(state), fields(agent_id = %query.agent_id))]
async fn get_state_handler(State(state): State<ServeState>, Query(query): Query<AgentIdQuery>) -> impl IntoResponse {
    match state.kv.get(&agent_key(&query.agent_id, STATE_SUFFIX)).await {
        Ok(Some(raw)) => match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(value) => Json(json!({"success": true, "state": value})).into_response(),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"success": false, "error": err.to_string()})),
            )
                .into_response(),
        },
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({"success": false, "error": "no state stored for this agent"})),
        )
            .into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"success": false, "error": err.to_string()})),
        )
            .into_response(),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostStateBody {
    agent_id: String,
    state: serde_json::Value,
}

#[instrument(name = "agent.state.post", skip(state, body), fields(agent_id = %body.agent_id))]
async fn post_state_handler(State(state): State<ServeState>, Json(body): Json<PostStateBody>) -> impl IntoResponse {
    let serialized = match serde_json::to_string(&body.state) {
        Ok(s) => s,
        Err(err) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"success": false, "error": err.to_string()})),
            )
                .into_response()
        }
    };
    match state
        .kv
        .set(&agent_key(&body.agent_id, STATE_SUFFIX), &serialized, Some(TTL_AGENT_STATE))
        .await
    {
        Ok(()) => Json(json!({"success": true})).into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"success": false, "error": err.to_string()})),
        )
            .into_response(),
    }
}

#[instrument(name = "agent.state.delete", skip(state), fields(agent_id = %query.agent_id))]
async fn delete_state_handler(State(state): State<ServeState>, Query(query): Query<AgentIdQuery>) -> impl IntoResponse {
    match state.kv.del(&agent_key(&query.agent_id, STATE_SUFFIX)).await {
        Ok(()) => Json(json!({"success": true})).into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"success": false, "error": err.to_string()})),
        )
            .into_response(),
    }
}
