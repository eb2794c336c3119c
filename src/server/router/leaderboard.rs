//! `GET /api/leaderboard/{kind}`: ranked agents for a named score kind
//! (`badges`, `cost`, `milestones`), read out of the sorted sets the
//! coordinator's state publication (`badges`/`cost`) and milestone
//! bookkeeping (`milestones`) write on every iteration.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::persistence::leaderboard_key;
use crate::server::state::ServeState;

const DEFAULT_LIMIT: usize = 10;

pub(crate) fn router() -> Router<ServeState> {
    Router::new().route("/api/leaderboard/:kind", get(leaderboard_handler))
}

#[derive(Deserialize)]
struct LimitQuery {
    limit: Option<usize>,
}

#[instrument(name = "agent.leaderboard", skip(state), fields(kind = %kind))]
async fn leaderboard_handler(
    State(state): State<ServeState>,
    Path(kind): Path<String>,
    Query(query): Query<LimitQuery>,
) -> impl IntoResponse {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).max(1);
    match state.kv.zrange(&leaderboard_key(&kind), limit, true).await {
        Ok(ranked) => {
            let entries: Vec<_> = ranked
                .into_iter()
                .map(|(agent_id, score)| json!({"agentId": agent_id, "score": score}))
                .collect();
            Json(json!({"success": true, "kind": kind, "entries": entries})).into_response()
        }
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"success": false, "error": err.to_string()})),
        )
            .into_response(),
    }
}
