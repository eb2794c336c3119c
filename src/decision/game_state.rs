//! `GameState` and `ProgressMetrics` (§3): created on agent init, mutated
//! only by the Decision Step's response merger, destroyed on reset.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decision::schema::GameStateReply;
use crate::types::{Button, ScreenKind, VisualChange};
use crate::utils::OrderedSet;

/// The agent's current understanding of the game screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    /// Current area label.
    pub area: String,
    /// In a battle encounter.
    pub in_battle: bool,
    /// A menu is open.
    pub in_menu: bool,
    /// A dialogue box is open.
    pub in_dialogue: bool,
    /// A text-entry prompt is active.
    pub in_text_entry: bool,
    /// Inferred screen kind.
    pub screen_kind: ScreenKind,
    /// Badge count.
    pub badges: u32,
    /// Estimated party HP fraction, 0..1.
    pub party_hp: f64,
    /// Sum of the active party's levels, feeding `level_reward`.
    pub party_level_sum: u32,
    /// Last executed input.
    pub last_input: Option<Button>,
    /// Running progress totals.
    pub progress: ProgressMetrics,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            area: String::new(),
            in_battle: false,
            in_menu: false,
            in_dialogue: false,
            in_text_entry: false,
            screen_kind: ScreenKind::Unknown,
            badges: 0,
            party_hp: 1.0,
            party_level_sum: 0,
            last_input: None,
            progress: ProgressMetrics::default(),
        }
    }
}

impl GameState {
    /// Apply the decision phase's reported fields. Unreported fields keep
    /// their previous value (§3: "mutated only by the response merger").
    ///
    /// `visual_change` is the change detected between the previous capture
    /// and this one, i.e. the effect of the *previous* executed action
    /// (`self.last_input`, before it is overwritten below) — not of
    /// `executed`, which hasn't produced an observable frame yet.
    pub fn apply_reply(&mut self, reply: &GameStateReply, executed: Button, visual_change: VisualChange) {
        if let Some(prev) = self.last_input {
            if prev != Button::Wait && visual_change == VisualChange::ChangeDetected {
                self.progress.last_effective_action = Some(prev);
            }
        }
        if let Some(area) = &reply.area {
            if self.progress.visited_areas.insert(area.clone()) {
                self.progress.unique_area_count = self.progress.visited_areas.len() as u32;
            }
            self.area = area.clone();
        }
        if let Some(v) = reply.in_battle {
            self.in_battle = v;
        }
        if let Some(v) = reply.in_menu {
            self.in_menu = v;
        }
        if let Some(v) = reply.in_dialogue {
            self.in_dialogue = v;
        }
        if let Some(v) = reply.in_text_entry {
            self.in_text_entry = v;
        }
        if let Some(kind) = reply.screen_type {
            self.screen_kind = kind;
        }
        if let Some(badges) = reply.badges {
            self.badges = badges;
        }
        if let Some(hp) = reply.estimated_party_hp {
            self.party_hp = hp;
        }
        if let Some(levels) = reply.party_level_sum {
            self.party_level_sum = levels;
        }
        self.last_input = Some(executed);
    }
}

/// Running progress counters (§3 "ProgressMetrics"). The milestones set is
/// monotonically growing within a run; reset is the only way to shrink it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressMetrics {
    /// Completed milestones, ordered by first-seen time.
    pub completed_milestones: Vec<String>,
    /// Visited area labels, for `navigation_reward` and `unique_area_count`.
    /// Serialized as a plain ordered array, never the runtime set type
    /// (spec.md §9 "Sets that must be persisted").
    pub visited_areas: OrderedSet<String>,
    /// `visited_areas.len()`, kept alongside it for cheap reads.
    pub unique_area_count: u32,
    /// Running total of healing reward accrued this run.
    pub total_healing_reward: f64,
    /// Running total of level reward accrued this run.
    pub total_level_reward: f64,
    /// Consecutive no-change count, used by stuck detection.
    pub consecutive_no_change: u32,
    /// The last effective (non-WAIT, visually-changing) action.
    pub last_effective_action: Option<Button>,
    /// When this run started.
    pub started_at: DateTime<Utc>,
}

impl Default for ProgressMetrics {
    fn default() -> Self {
        Self {
            completed_milestones: Vec::new(),
            visited_areas: OrderedSet::new(),
            unique_area_count: 0,
            total_healing_reward: 0.0,
            total_level_reward: 0.0,
            consecutive_no_change: 0,
            last_effective_action: None,
            started_at: Utc::now(),
        }
    }
}

impl ProgressMetrics {
    /// Record a milestone's first occurrence. No-op if already recorded
    /// (§3 invariant: monotonically growing, never duplicated).
    pub fn record_milestone(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.completed_milestones.contains(&name) {
            self.completed_milestones.push(name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_reply_only_overwrites_reported_fields() {
        let mut state = GameState {
            area: "route-1".into(),
            badges: 2,
            ..Default::default()
        };
        state.apply_reply(
            &GameStateReply {
                in_battle: Some(true),
                ..Default::default()
            },
            Button::A,
            VisualChange::FirstFrame,
        );
        assert_eq!(state.area, "route-1");
        assert_eq!(state.badges, 2);
        assert!(state.in_battle);
        assert_eq!(state.last_input, Some(Button::A));
    }

    #[test]
    fn visiting_a_new_area_grows_unique_area_count() {
        let mut state = GameState::default();
        state.apply_reply(
            &GameStateReply {
                area: Some("cave-1".into()),
                ..Default::default()
            },
            Button::Up,
            VisualChange::FirstFrame,
        );
        state.apply_reply(
            &GameStateReply {
                area: Some("cave-1".into()),
                ..Default::default()
            },
            Button::Up,
            VisualChange::ChangeDetected,
        );
        assert_eq!(state.progress.unique_area_count, 1);
    }

    #[test]
    fn last_effective_action_records_the_prior_non_wait_action_on_change() {
        let mut state = GameState::default();
        state.apply_reply(&GameStateReply::default(), Button::Up, VisualChange::FirstFrame);
        assert_eq!(state.progress.last_effective_action, None);
        state.apply_reply(&GameStateReply::default(), Button::A, VisualChange::ChangeDetected);
        assert_eq!(state.progress.last_effective_action, Some(Button::Up));
    }

    #[test]
    fn last_effective_action_ignores_wait_and_no_change() {
        let mut state = GameState::default();
        state.apply_reply(&GameStateReply::default(), Button::Wait, VisualChange::FirstFrame);
        state.apply_reply(&GameStateReply::default(), Button::A, VisualChange::ChangeDetected);
        assert_eq!(state.progress.last_effective_action, None);
        state.apply_reply(&GameStateReply::default(), Button::B, VisualChange::NoChange);
        assert_eq!(state.progress.last_effective_action, None);
    }

    #[test]
    fn milestones_are_recorded_once() {
        let mut progress = ProgressMetrics::default();
        progress.record_milestone("gym-leader-1");
        progress.record_milestone("gym-leader-1");
        assert_eq!(progress.completed_milestones.len(), 1);
    }
}
