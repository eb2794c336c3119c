//! Append-only decision log (§3 "DecisionLog", §4.3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Button;

/// Most entries retained per agent.
pub const MAX_LOG_ENTRIES: usize = 500;

/// One executed decision, as recorded in the log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionLogEntry {
    /// Monotonically increasing step number, 1-based.
    pub step: u64,
    /// The button executed.
    pub button: Button,
    /// The decision's reasoning string.
    pub reasoning: String,
    /// When the decision was recorded.
    pub timestamp: DateTime<Utc>,
}
