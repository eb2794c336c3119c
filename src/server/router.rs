//! Route groups (spec.md §6), merged into one `axum::Router<ServeState>`.

mod decide;
mod frames;
mod heartbeat;
mod leaderboard;
mod memstash;
mod parse_state;
mod save_state;
mod state;

use axum::Router;

use crate::server::state::ServeState;

/// Merge every route group into one router.
pub(crate) fn router() -> Router<ServeState> {
    Router::new()
        .merge(decide::router())
        .merge(heartbeat::router())
        .merge(state::router())
        .merge(save_state::router())
        .merge(frames::router())
        .merge(memstash::router())
        .merge(parse_state::router())
        .merge(leaderboard::router())
}
