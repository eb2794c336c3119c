//! `POST/GET /api/agent/decide` (spec.md §6): run one decision against an
//! externally-supplied frame, or fetch the current agent record.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;

use tracing::instrument;

use crate::decision::ButtonConfidences;
use crate::frame_source::MIN_FRAME_BYTES;
use crate::heuristics::AvoidHints;
use crate::server::state::ServeState;
use crate::types::Button;

pub(crate) fn router() -> Router<ServeState> {
    Router::new().route("/api/agent/decide", get(get_agent_handler).post(decide_handler))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DecideRequest {
    agent_id: String,
    model_id: String,
    frame: String,
    #[serde(default)]
    previous_frames: Vec<String>,
    #[serde(default)]
    command_history_with_changes: Vec<String>,
    #[serde(default)]
    previous_confidence_scores: Option<ButtonConfidences>,
    #[serde(default)]
    previous_dialog_history: Vec<String>,
    #[serde(default)]
    avoid_start_select: bool,
    #[serde(default)]
    avoid_wait: bool,
    #[serde(default)]
    avoid_b: bool,
    #[serde(default)]
    buttons_to_avoid: Vec<String>,
    #[serde(default)]
    banned_buttons: Vec<String>,
}

fn parse_buttons(names: &[String]) -> Vec<Button> {
    names.iter().filter_map(|s| Button::parse(s)).collect()
}

#[instrument(name = "agent.decide", skip(state, body), fields(agent_id = %body.agent_id))]
async fn decide_handler(State(state): State<ServeState>, Json(body): Json<DecideRequest>) -> impl IntoResponse {
    if body.agent_id.trim().is_empty() || body.frame.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"success": false, "error": "agentId and frame are required"})),
        )
            .into_response();
    }
    if body.frame.len() < MIN_FRAME_BYTES {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "error": format!(
                    "frame payload is {} bytes, below the {}-byte minimum",
                    body.frame.len(),
                    MIN_FRAME_BYTES
                ),
            })),
        )
            .into_response();
    }

    let coordinator = state.registry.get_or_create(&body.agent_id, &body.model_id);
    let avoid_hints = AvoidHints {
        avoid_start_select: body.avoid_start_select,
        avoid_wait: body.avoid_wait,
        avoid_b: body.avoid_b,
    };
    let buttons_to_avoid = parse_buttons(&body.buttons_to_avoid);
    let banned_buttons = parse_buttons(&body.banned_buttons);

    let decision = match coordinator
        .decide_from_request(
            &body.frame,
            &body.previous_frames,
            &body.command_history_with_changes,
            body.previous_confidence_scores,
            &body.previous_dialog_history,
            avoid_hints,
            &buttons_to_avoid,
            &banned_buttons,
        )
        .await
    {
        Ok(decision) => decision,
        Err(err) => {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"success": false, "error": format!("{err}")})),
            )
                .into_response()
        }
    };

    let agent = coordinator.snapshot().await;
    Json(json!({
        "success": true,
        "decision": decision,
        "gameState": agent.game_state,
        "cost": decision.cost,
        "totalCost": agent.total_cost,
        "totalDecisions": agent.total_decisions,
        "totalTokensIn": agent.total_tokens_in,
        "totalTokensOut": agent.total_tokens_out,
    }))
    .into_response()
}

#[derive(Deserialize)]
struct AgentIdQuery {
    #[serde(rename = "agentId")]
    agent_id: String,
}

#[derive(Serialize)]
struct AgentStateResponse {
    success: bool,
    #[serde(flatten)]
    agent: crate::coordinator::Agent,
}

#[instrument(name = "agent.get", skip(state), fields(agent_id = %query.agent_id))]
async fn get_agent_handler(State(state): State<ServeState>, Query(query): Query<AgentIdQuery>) -> impl IntoResponse {
    match state.registry.get(&query.agent_id) {
        Some(coordinator) => {
            let agent = coordinator.snapshot().await;
            Json(AgentStateResponse { success: true, agent }).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"success": false, "error": "agent not found"})),
        )
            .into_response(),
    }
}
