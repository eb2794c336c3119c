//! `GET/DELETE /memstash` (spec.md §6): read the notes projection an agent
//! carries into its prompts, or clear it along with the decision log.

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
    Router::new().route("/memstash", get(get_memstash_handler).delete(delete_memstash_handler))
}

#[derive(Deserialize)]
struct AgentIdQuery {
    #[serde(rename = "agentId")]
    agent_id: String,
}

#[instrument(name = "agent.memstash.get", skip(state), fields(agent_id = %query.agent_id))]
async fn get_memstash_handler(State(state): State<ServeState>, Query(query): Query<AgentIdQuery>) -> impl IntoResponse {
    match state.memory.get_notes(&query.agent_id).await {
        Ok(notes) => {
            let content = state.memory.format_notes_for_prompt(&notes);
            Json(json!({"content": content})).into_response()
        }
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"success": false, "error": err.to_string()})),
        )
            .into_response(),
    }
}

#[instrument(name = "agent.memstash.delete", skip(state), fields(agent_id = %query.agent_id))]
async fn delete_memstash_handler(State(state): State<ServeState>, Query(query): Query<AgentIdQuery>) -> impl IntoResponse {
    let notes_result = state.memory.clear_notes(&query.agent_id).await;
    let log_result = state.memory.clear_decision_log(&query.agent_id).await;
    match (notes_result, log_result) {
        (Ok(()), Ok(())) => Json(json!({"success": true})).into_response(),
        (Err(err), _) | (_, Err(err)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"success": false, "error": err.to_string()})),
        )
            .into_response(),
    }
}
