//! Heuristic Engine (§4.4): pure, stateless-per-call computations plus the
//! coordinator-owned `ButtonStats` counters they're consulted against.

mod button_stats;
mod fingerprint;
mod rewards;
mod stuck;

pub use button_stats::{AvoidHints, ButtonStats, NO_CHANGE_CONFIDENCE_FLOOR};
pub use fingerprint::{fingerprint, visual_change};
pub use rewards::{event_reward, healing_reward, level_reward, navigation_reward, Milestone};
pub use stuck::{detect_stuck, priority_action, PriorityAction, PriorityInputs, CRITICAL_HP_THRESHOLD};
