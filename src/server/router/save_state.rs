//! `POST /save-state` (spec.md §6): request a checkpoint from the frame
//! source and upload it to the blob store.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::server::state::ServeState;

pub(crate) fn router() -> Router<ServeState> {
    Router::new().route("/save-state", post(save_state_handler))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveStateBody {
    agent_id: String,
}

#[instrument(name = "agent.save_state", skip(state, body), fields(agent_id = %body.agent_id))]
async fn save_state_handler(State(state): State<ServeState>, Json(body): Json<SaveStateBody>) -> impl IntoResponse {
    let coordinator = match state.registry.get(&body.agent_id) {
        Some(coordinator) => coordinator,
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"success": false, "error": "no state: agent is not registered"})),
            )
                .into_response()
        }
    };

    let agent = coordinator.snapshot().await;
    match coordinator.save_checkpoint(&agent).await {
        Ok(checkpoint) => Json(json!({
            "success": true,
            "url": checkpoint.url,
            "filename": checkpoint.filename,
            "decisionNumber": checkpoint.decision_number,
        }))
        .into_response(),
        Err(err) => (
            StatusCode::BAD_REQUEST,
            Json(json!({"success": false, "error": format!("no state: {err}")})),
        )
            .into_response(),
    }
}
