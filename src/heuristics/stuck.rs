//! Stuck detection and priority-action derivation (§4.4).

use crate::types::{Button, StuckPattern};

/// Minimum consecutive no-change count before stuck detection runs at all.
pub const STUCK_NO_CHANGE_THRESHOLD: u32 = 3;

/// Party HP fraction below which `priority_action` reports `HealOrEscape`.
pub const CRITICAL_HP_THRESHOLD: f64 = 0.2;

/// Classify a stuck episode from the consecutive no-change count and the
/// most recent 3-5 executed buttons (oldest first). Returns `None` if the
/// no-change streak hasn't reached the threshold.
pub fn detect_stuck(consecutive_no_change: u32, recent_actions: &[Button]) -> Option<StuckPattern> {
    if consecutive_no_change < STUCK_NO_CHANGE_THRESHOLD {
        return None;
    }

    let window = &recent_actions[recent_actions.len().saturating_sub(5)..];
    let last_three: Vec<Button> = window.iter().rev().take(3).copied().collect();

    let wall_collision = last_three.len() == 3
        && last_three.iter().all(|b| b.is_directional())
        && last_three.windows(2).all(|w| w[0] == w[1]);
    if wall_collision {
        return Some(StuckPattern::WallCollision);
    }

    let dialogue_loop = last_three.len() == 3 && last_three.iter().all(|b| *b == Button::A);
    if dialogue_loop {
        return Some(StuckPattern::DialogueLoop);
    }

    Some(StuckPattern::Unknown)
}

/// Minimal shape of game state the priority-action heuristic needs,
/// decoupled from the full `GameState` record so this module stays pure.
#[derive(Debug, Clone, Copy)]
pub struct PriorityInputs {
    /// True if any active party member's HP fraction is below a critical threshold.
    pub critical_hp: bool,
    /// True if the screen is a battle encounter.
    pub in_battle: bool,
    /// True if a dialogue box is open.
    pub in_dialogue: bool,
    /// True if a menu is open.
    pub in_menu: bool,
}

/// What the agent should prioritize this step, derived from game state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityAction {
    /// Critical HP: heal or flee.
    HealOrEscape,
    /// Fight the current battle.
    Battle,
    /// Advance a dialogue or menu interaction.
    Progress,
    /// Nothing urgent: keep exploring.
    Explore,
}

/// Derive the priority action from game state, per §4.4's ordering:
/// critical HP first, then battle, then dialogue/menu, then explore.
pub fn priority_action(inputs: PriorityInputs) -> PriorityAction {
    if inputs.critical_hp {
        PriorityAction::HealOrEscape
    } else if inputs.in_battle {
        PriorityAction::Battle
    } else if inputs.in_dialogue || inputs.in_menu {
        PriorityAction::Progress
    } else {
        PriorityAction::Explore
    }
}

impl PriorityAction {
    /// A short hint surfaced in the decision prompt so the model sees the
    /// same prioritization the coordinator has already derived from game
    /// state, without exposing the raw `PriorityInputs`.
    pub fn hint(self) -> &'static str {
        match self {
            PriorityAction::HealOrEscape => "Party HP is critical: prioritize healing or escaping over progress.",
            PriorityAction::Battle => "Currently in battle: prioritize battle actions.",
            PriorityAction::Progress => "Dialogue or a menu is open: prioritize advancing it.",
            PriorityAction::Explore => "Nothing urgent: continue exploring toward the current objective.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn below_threshold_is_not_stuck() {
        assert_eq!(detect_stuck(2, &[Button::Up, Button::Up, Button::Up]), None);
    }

    #[test]
    fn three_identical_directional_presses_is_wall_collision() {
        let recent = vec![Button::Right, Button::Right, Button::Right];
        assert_eq!(
            detect_stuck(3, &recent),
            Some(StuckPattern::WallCollision)
        );
    }

    #[test]
    fn three_a_presses_is_dialogue_loop() {
        let recent = vec![Button::A, Button::A, Button::A];
        assert_eq!(detect_stuck(3, &recent), Some(StuckPattern::DialogueLoop));
    }

    #[test]
    fn mixed_recent_actions_is_unknown() {
        let recent = vec![Button::Up, Button::B, Button::Start];
        assert_eq!(detect_stuck(3, &recent), Some(StuckPattern::Unknown));
    }

    #[test]
    fn critical_hp_outranks_everything() {
        let inputs = PriorityInputs {
            critical_hp: true,
            in_battle: true,
            in_dialogue: true,
            in_menu: true,
        };
        assert_eq!(priority_action(inputs), PriorityAction::HealOrEscape);
    }

    #[test]
    fn battle_outranks_dialogue_and_explore() {
        let inputs = PriorityInputs {
            critical_hp: false,
            in_battle: true,
            in_dialogue: true,
            in_menu: false,
        };
        assert_eq!(priority_action(inputs), PriorityAction::Battle);
    }

    #[test]
    fn otherwise_explore() {
        let inputs = PriorityInputs {
            critical_hp: false,
            in_battle: false,
            in_dialogue: false,
            in_menu: false,
        };
        assert_eq!(priority_action(inputs), PriorityAction::Explore);
    }
}
