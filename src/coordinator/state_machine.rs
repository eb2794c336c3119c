//! Agent lifecycle state machine (§4.6): `idle → thinking → acting → idle`
//! on success; `* → paused` on pause/client-gone/reset-in-progress;
//! `* → error` on adapter loss. All non-terminal states are resumable.

use crate::types::AgentStatus;

/// True if transitioning from `from` to `to` is allowed.
pub fn can_transition(from: AgentStatus, to: AgentStatus) -> bool {
    use AgentStatus::*;

    match (from, to) {
        // Paused and error are reachable from any state.
        (_, Paused) => true,
        (_, Error) => true,
        // The happy path.
        (Idle, Thinking) => true,
        (Thinking, Acting) => true,
        (Acting, Idle) => true,
        // Resuming from paused re-enters thinking on a fresh heartbeat.
        (Paused, Thinking) => true,
        (Paused, Idle) => true,
        // Error is terminal for the run.
        (Error, _) => false,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AgentStatus::*;

    #[test]
    fn happy_path_is_allowed() {
        assert!(can_transition(Idle, Thinking));
        assert!(can_transition(Thinking, Acting));
        assert!(can_transition(Acting, Idle));
    }

    #[test]
    fn any_state_can_pause_or_error() {
        for from in [Idle, Thinking, Acting, Paused] {
            assert!(can_transition(from, Paused));
            assert!(can_transition(from, Error));
        }
    }

    #[test]
    fn error_is_terminal() {
        assert!(!can_transition(Error, Idle));
        assert!(!can_transition(Error, Thinking));
    }

    #[test]
    fn paused_resumes_into_thinking() {
        assert!(can_transition(Paused, Thinking));
    }

    #[test]
    fn skipping_thinking_is_not_allowed() {
        assert!(!can_transition(Idle, Acting));
    }
}
