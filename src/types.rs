//! Shared domain vocabulary used across every component.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The externally observable button vocabulary (§6). `Wait` is a
/// coordinator-only convention meaning "no input this step" and is never
/// forwarded to a `FrameSource`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Button {
    /// A
    A,
    /// B
    B,
    /// START
    Start,
    /// SELECT
    Select,
    /// UP
    Up,
    /// DOWN
    Down,
    /// LEFT
    Left,
    /// RIGHT
    Right,
    /// L shoulder
    L,
    /// R shoulder
    R,
    /// No input this step.
    Wait,
}

impl Button {
    /// All eleven buttons, in the fixed order the confidence table uses.
    pub const ALL: [Button; 11] = [
        Button::A,
        Button::B,
        Button::Start,
        Button::Select,
        Button::Up,
        Button::Down,
        Button::Left,
        Button::Right,
        Button::L,
        Button::R,
        Button::Wait,
    ];

    /// The wire name, matching spec.md §6's vocabulary exactly.
    pub fn as_str(self) -> &'static str {
        match self {
            Button::A => "A",
            Button::B => "B",
            Button::Start => "START",
            Button::Select => "SELECT",
            Button::Up => "UP",
            Button::Down => "DOWN",
            Button::Left => "LEFT",
            Button::Right => "RIGHT",
            Button::L => "L",
            Button::R => "R",
            Button::Wait => "WAIT",
        }
    }

    /// Parse the wire name back into a `Button`.
    pub fn parse(s: &str) -> Option<Button> {
        Button::ALL.into_iter().find(|b| b.as_str() == s)
    }

    /// True for UP/DOWN/LEFT/RIGHT, used by wall-collision stuck detection.
    pub fn is_directional(self) -> bool {
        matches!(self, Button::Up | Button::Down | Button::Left | Button::Right)
    }
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The screen kind inferred by the screen-type model phase, or merged into
/// `GameState` by the decision-phase response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScreenKind {
    /// Free-roam exploration.
    Overworld,
    /// A battle/combat encounter.
    Battle,
    /// A menu is open.
    Menu,
    /// An NPC or system dialogue box is showing.
    Dialogue,
    /// A text entry prompt (e.g. naming) is active.
    TextEntry,
    /// A screen transition/animation is in progress.
    Transition,
    /// Could not be classified.
    Unknown,
}

impl Default for ScreenKind {
    fn default() -> Self {
        ScreenKind::Unknown
    }
}

/// Outcome of comparing two consecutive frame fingerprints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualChange {
    /// There was no previous frame to compare against.
    FirstFrame,
    /// The fingerprint differs from the previous frame.
    ChangeDetected,
    /// The fingerprint is identical to the previous frame.
    NoChange,
}

/// Coordinator-classified "stuck" pattern, derived from recent actions and
/// consecutive no-change counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StuckMode {
    /// Not currently judged stuck.
    None,
    /// Scanning the perimeter of an obstacle.
    PerimeterScan,
    /// Hugging a wall to find an opening.
    WallHug,
    /// Backtracking along the recent path.
    Backtrack,
}

impl Default for StuckMode {
    fn default() -> Self {
        StuckMode::None
    }
}

/// The specific pattern a stuck-detection pass classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StuckPattern {
    /// Three or more identical directional presses produced no change.
    WallCollision,
    /// Three or more "A" presses produced no change (stuck in dialogue).
    DialogueLoop,
    /// Stuck, but not matching a recognized pattern.
    Unknown,
}

/// Agent lifecycle status (§3 "Agent").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// Waiting for the next iteration to start.
    Idle,
    /// A model call is in flight.
    Thinking,
    /// Executing the derived button sequence.
    Acting,
    /// Suspended: user-paused or client heartbeat lost.
    Paused,
    /// Terminal: the frame source adapter was lost.
    Error,
}

impl Default for AgentStatus {
    fn default() -> Self {
        AgentStatus::Idle
    }
}
