//! Agent identity (§3 "Agent").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decision::GameState;
use crate::types::AgentStatus;

/// One autonomous loop instance. Owns one Loop, one Memory namespace, and
/// at most one in-flight Decision (enforced by the coordinator's mutex).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    /// Opaque agent id.
    pub id: String,
    /// Selected model identifier, e.g. `"openai/gpt-4o"`.
    pub model_id: String,
    /// Current lifecycle status.
    pub status: AgentStatus,
    /// When the agent was created.
    pub created_at: DateTime<Utc>,
    /// When the agent's record was last updated.
    pub updated_at: DateTime<Utc>,
    /// Total decisions executed this run.
    pub total_decisions: u64,
    /// Decisions that were the canonical fallback.
    pub fallback_count: u64,
    /// Accumulated dollar cost.
    pub total_cost: f64,
    /// Accumulated prompt tokens.
    pub total_tokens_in: u64,
    /// Accumulated completion tokens.
    pub total_tokens_out: u64,
    /// Current game state.
    pub game_state: GameState,
}

impl Agent {
    /// Build a freshly-initialized agent record.
    pub fn new(id: impl Into<String>, model_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            model_id: model_id.into(),
            status: AgentStatus::Idle,
            created_at: now,
            updated_at: now,
            total_decisions: 0,
            fallback_count: 0,
            total_cost: 0.0,
            total_tokens_in: 0,
            total_tokens_out: 0,
            game_state: GameState::default(),
        }
    }
}
