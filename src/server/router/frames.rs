//! `GET/POST /frames` (spec.md §6): list or store milestone screenshots in
//! the blob store.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use base64::Engine;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::server::state::ServeState;

pub(crate) fn router() -> Router<ServeState> {
    Router::new().route("/frames", get(get_frames_handler).post(post_frames_handler))
}

#[derive(Deserialize)]
struct AgentIdQuery {
    #[serde(rename = "agentId")]
    agent_id: String,
}

#[instrument(name = "agent.frames.get", skip(state), fields(agent_id = %query.agent_id))]
async fn get_frames_handler(State(state): State<ServeState>, Query(query): Query<AgentIdQuery>) -> impl IntoResponse {
    let prefix = format!("frames/{}/", query.agent_id);
    match state.blob.list(&prefix).await {
        Ok(entries) => {
            let frames: Vec<_> = entries
                .iter()
                .map(|e| {
                    json!({
                        "path": e.path,
                        "size": e.size,
                        "uploadedAt": e.uploaded_at,
                        "url": e.url,
                    })
                })
                .collect();
            Json(json!({"frames": frames, "totalCount": frames.len()})).into_response()
        }
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"success": false, "error": err.to_string()})),
        )
            .into_response(),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostFramesBody {
    agent_id: String,
    frame: String,
}

#[instrument(name = "agent.frames.post", skip(state, body), fields(agent_id = %body.agent_id))]
async fn post_frames_handler(State(state): State<ServeState>, Json(body): Json<PostFramesBody>) -> impl IntoResponse {
    let bytes = match base64::engine::general_purpose::STANDARD.decode(body.frame.as_bytes()) {
        Ok(bytes) => bytes,
        Err(err) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"success": false, "error": format!("frame is not valid base64: {err}")})),
            )
                .into_response()
        }
    };

    let timestamp = state.clock.now();
    let path = format!("frames/{}/{}.png", body.agent_id, timestamp.format("%Y%m%d%H%M%S%3f"));
    match state.blob.put(&path, bytes).await {
        Ok(url) => Json(json!({
            "url": url,
            "timestamp": timestamp,
            "agentId": body.agent_id,
        }))
        .into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"success": false, "error": err.to_string()})),
        )
            .into_response(),
    }
}
