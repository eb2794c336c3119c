//! `GET /parse-state` (spec.md §6): best-effort parse of an agent's latest
//! checkpoint.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::frame_source::{parse_save_state, ParsedState};
use crate::server::state::ServeState;

pub(crate) fn router() -> Router<ServeState> {
    Router::new().route("/parse-state", get(parse_state_handler))
}

#[derive(Deserialize)]
struct AgentIdQuery {
    #[serde(rename = "agentId")]
    agent_id: String,
}

fn describe(parsed: &ParsedState) -> String {
    match parsed {
        ParsedState::Partial { fields } => format!("recognized checkpoint, extracted fields: {fields}"),
        ParsedState::Unrecognized => "checkpoint format not recognized".to_string(),
        ParsedState::Failed { reason } => format!("checkpoint header matched but parsing failed: {reason}"),
    }
}

#[instrument(name = "agent.parse_state", skip(state), fields(agent_id = %query.agent_id))]
async fn parse_state_handler(State(state): State<ServeState>, Query(query): Query<AgentIdQuery>) -> impl IntoResponse {
    let prefix = format!("save-states/{}/", query.agent_id);
    let entries = match state.blob.list(&prefix).await {
        Ok(entries) => entries,
        Err(err) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"success": false, "error": err.to_string()})),
            )
                .into_response()
        }
    };

    let Some(latest) = entries.last() else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"success": false, "error": "no checkpoint found for this agent"})),
        )
            .into_response();
    };

    let bytes = match state.blob.get(&latest.path).await {
        Ok(Some(bytes)) => bytes,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({"success": false, "error": "checkpoint listed but its bytes are gone"})),
            )
                .into_response()
        }
        Err(err) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"success": false, "error": err.to_string()})),
            )
                .into_response()
        }
    };

    let parsed = parse_save_state(&bytes);
    let formatted = describe(&parsed);
    Json(json!({"success": true, "parsed": parsed, "formatted": formatted})).into_response()
}
