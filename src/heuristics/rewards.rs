//! Reward shaping functions (§4.4).

use serde::{Deserialize, Serialize};

/// Navigation reward: 0.005 per newly visited area label this step.
pub fn navigation_reward(newly_visited_areas: u32) -> f64 {
    0.005 * newly_visited_areas as f64
}

/// Healing reward: 2.5 × Σ max(0, HPafter − HPbefore) / HPmax, summed
/// across party members by the caller and passed in as already-normalized
/// totals.
pub fn healing_reward(hp_before: f64, hp_after: f64, hp_max: f64) -> f64 {
    if hp_max <= 0.0 {
        return 0.0;
    }
    2.5 * (hp_after - hp_before).max(0.0) / hp_max
}

/// The soft-capped contribution of a total party level sum, shared by
/// `level_reward`'s before/after differential.
fn level_component(sum_levels: u32) -> f64 {
    let s = sum_levels as f64;
    0.5 * s.min((s - 22.0) / 4.0 + 22.0)
}

/// Level reward: 0.5 × min(Σlevels, (Σlevels − 22)/4 + 22), applied only as
/// the positive differential between the before and after totals (a party
/// that loses levels, e.g. via a reset, earns nothing).
pub fn level_reward(sum_levels_before: u32, sum_levels_after: u32) -> f64 {
    (level_component(sum_levels_after) - level_component(sum_levels_before)).max(0.0)
}

/// Named milestone events and their one-time integer reward. Reported by
/// the model as an optional `GameStateReply` field (§3 "Milestone").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Milestone {
    /// Defeating a gym leader.
    GymLeader,
    /// Exiting a cave.
    CaveExit,
    /// Entering the Elite Four.
    EliteFourEntry,
    /// Becoming Champion.
    Champion,
}

/// Integer event reward for a milestone's first occurrence.
pub fn event_reward(milestone: Milestone) -> i32 {
    match milestone {
        Milestone::GymLeader => 5,
        Milestone::CaveExit => 3,
        Milestone::EliteFourEntry => 10,
        Milestone::Champion => 50,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigation_reward_scales_linearly() {
        assert!((navigation_reward(3) - 0.015).abs() < 1e-9);
    }

    #[test]
    fn healing_reward_ignores_hp_loss() {
        assert_eq!(healing_reward(80.0, 40.0, 100.0), 0.0);
    }

    #[test]
    fn healing_reward_rewards_positive_delta() {
        let r = healing_reward(40.0, 90.0, 100.0);
        assert!((r - 1.25).abs() < 1e-9);
    }

    #[test]
    fn level_reward_is_zero_when_levels_do_not_increase() {
        assert_eq!(level_reward(30, 30), 0.0);
        assert_eq!(level_reward(30, 20), 0.0);
    }

    #[test]
    fn level_reward_rewards_growth() {
        assert!(level_reward(20, 25) > 0.0);
    }

    #[test]
    fn event_rewards_match_the_spec_table() {
        assert_eq!(event_reward(Milestone::GymLeader), 5);
        assert_eq!(event_reward(Milestone::CaveExit), 3);
        assert_eq!(event_reward(Milestone::EliteFourEntry), 10);
        assert_eq!(event_reward(Milestone::Champion), 50);
    }
}
