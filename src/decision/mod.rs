//! Decision Step (§4.5): prompt construction, the two-phase model call,
//! schema validation, sequence derivation, and cost accounting.

pub mod cost;
mod game_state;
pub mod json_extractor;
mod prompt;
mod schema;
mod service;

pub use game_state::{GameState, ProgressMetrics};
pub use prompt::PromptContext;
pub use schema::{
    ButtonConfidences, DecisionReply, FrameHistoryEntry, GameStateReply, ScreenTypeReply, SequenceStep,
    DECISION_MAX_TOKENS, MAX_DIALOG_HISTORY, MAX_FRAME_HISTORY, SCREEN_TYPE_MAX_TOKENS,
};
pub use service::{derive_sequence, Decision, DecisionStep, SEQUENCE_STEP_THRESHOLD};
