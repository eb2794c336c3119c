//! Wire shapes for the Decision Step's two model-call phases (§4.5).

use serde::{Deserialize, Serialize};

use crate::heuristics::Milestone;
use crate::memory::NotesDelta;
use crate::types::{Button, ScreenKind, VisualChange};

/// One entry in the bounded frame history (§3 "FrameHistoryEntry").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameHistoryEntry {
    /// Button executed that step.
    pub button: Button,
    /// Truncated reasoning string from that decision.
    pub reasoning: String,
    /// When the decision was made.
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Frame fingerprint at that step.
    pub fingerprint: u32,
    /// How the frame changed relative to the previous one.
    pub visual_change: VisualChange,
}

/// Cap on retained frame history entries.
pub const MAX_FRAME_HISTORY: usize = 25;
/// Cap on retained dialog-comment history.
pub const MAX_DIALOG_HISTORY: usize = 10;

/// The screen-type phase's expected schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenTypeReply {
    /// Inferred screen kind.
    pub screen_type: ScreenKind,
    /// A short free-text description of the screen.
    pub brief_description: String,
}

/// Max output tokens budgeted for the screen-type phase.
pub const SCREEN_TYPE_MAX_TOKENS: u32 = 100;
/// Max output tokens budgeted for the decision phase.
pub const DECISION_MAX_TOKENS: u32 = 1000;

/// Per-button confidence table, one entry per button in `Button::ALL` order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ButtonConfidences {
    /// Confidence for A.
    pub a: f64,
    /// Confidence for B.
    pub b: f64,
    /// Confidence for START.
    pub start: f64,
    /// Confidence for SELECT.
    pub select: f64,
    /// Confidence for UP.
    pub up: f64,
    /// Confidence for DOWN.
    pub down: f64,
    /// Confidence for LEFT.
    pub left: f64,
    /// Confidence for RIGHT.
    pub right: f64,
    /// Confidence for L.
    pub l: f64,
    /// Confidence for R.
    pub r: f64,
    /// Confidence for WAIT.
    pub wait: f64,
}

impl ButtonConfidences {
    /// Look up the confidence for a specific button.
    pub fn get(&self, button: Button) -> f64 {
        match button {
            Button::A => self.a,
            Button::B => self.b,
            Button::Start => self.start,
            Button::Select => self.select,
            Button::Up => self.up,
            Button::Down => self.down,
            Button::Left => self.left,
            Button::Right => self.right,
            Button::L => self.l,
            Button::R => self.r,
            Button::Wait => self.wait,
        }
    }

    /// The button with the highest confidence, ties broken by `Button::ALL`
    /// order.
    pub fn argmax(&self) -> (Button, f64) {
        Button::ALL
            .into_iter()
            .map(|b| (b, self.get(b)))
            .fold((Button::Wait, f64::MIN), |best, candidate| {
                if candidate.1 > best.1 {
                    candidate
                } else {
                    best
                }
            })
    }

    fn set(&mut self, button: Button, value: f64) {
        match button {
            Button::A => self.a = value,
            Button::B => self.b = value,
            Button::Start => self.start = value,
            Button::Select => self.select = value,
            Button::Up => self.up = value,
            Button::Down => self.down = value,
            Button::Left => self.left = value,
            Button::Right => self.right = value,
            Button::L => self.l = value,
            Button::R => self.r = value,
            Button::Wait => self.wait = value,
        }
    }

    /// A copy with every button in `buttons` capped at `floor` — §4.4's
    /// no-change penalty ("set that button's confidence floor to 0.20 in
    /// the prompt's 'previous scores' context") and invariant 5 ("the next
    /// prompt's previous-confidence table reports b ≤ 0.20").
    pub fn floored(&self, buttons: &[Button], floor: f64) -> Self {
        let mut out = self.clone();
        for &button in buttons {
            let current = out.get(button);
            out.set(button, current.min(floor));
        }
        out
    }

    /// A table with every button at a low, uniform confidence except WAIT,
    /// used by the fallback decision.
    pub fn wait_favored() -> Self {
        Self {
            a: 0.05,
            b: 0.05,
            start: 0.05,
            select: 0.05,
            up: 0.05,
            down: 0.05,
            left: 0.05,
            right: 0.05,
            l: 0.05,
            r: 0.05,
            wait: 0.5,
        }
    }
}

/// One step of a decided button sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceStep {
    /// Per-button confidence table for this step.
    pub confidences: ButtonConfidences,
}

/// Progress-relevant fields the decision phase may report; all optional
/// with defaults applied by the response merger.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateReply {
    /// Current area label.
    pub area: Option<String>,
    /// In battle.
    pub in_battle: Option<bool>,
    /// In a menu.
    pub in_menu: Option<bool>,
    /// In dialogue.
    pub in_dialogue: Option<bool>,
    /// In a text-entry prompt.
    pub in_text_entry: Option<bool>,
    /// Party member count.
    pub pokemon_count: Option<u32>,
    /// Badge count.
    pub badges: Option<u32>,
    /// Inferred screen kind.
    pub screen_type: Option<ScreenKind>,
    /// Estimated party HP fraction, 0..1.
    pub estimated_party_hp: Option<f64>,
    /// Sum of the active party's levels, feeding `level_reward`'s
    /// before/after differential.
    pub party_level_sum: Option<u32>,
    /// A milestone event observed this turn, if any (§4.4 "Event reward").
    pub milestone: Option<Milestone>,
}

/// The decision phase's expected schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionReply {
    /// Reported game-state fields, merged into the agent's `GameState`.
    #[serde(default)]
    pub game_state: GameStateReply,
    /// A description of what the screen shows.
    pub screen_analysis: String,
    /// The model's reasoning for this decision.
    pub reasoning: String,
    /// An optional personality flourish; empty string tolerated as absent.
    #[serde(default)]
    pub personality_comment: Option<String>,
    /// The button sequence, at least one step.
    pub button_sequence: Vec<SequenceStep>,
    /// Confidence that overall progress is being made, 0..1.
    pub progress_confidence: f64,
    /// Notes delta to merge into the agent's persistent notes.
    #[serde(default)]
    pub notes: NotesDelta,
}
