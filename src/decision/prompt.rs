//! Prompt builder (§4.5 "Inputs"): assembles system + history + notes +
//! heuristics + current frame into the two model-call message lists.

use crate::decision::schema::{FrameHistoryEntry, ScreenTypeReply};
use crate::heuristics::{AvoidHints, PriorityAction};
use crate::llm::ChatMessage;
use crate::types::Button;

/// Everything the Decision Step gathers before building a prompt, besides
/// the current frame itself.
pub struct PromptContext<'a> {
    /// Base64 PNG of the current frame.
    pub current_frame_base64: &'a str,
    /// Up to the last 2 frames, most recent last.
    pub previous_frames_base64: &'a [String],
    /// Command history with change indicators, most recent last, ≤25.
    pub history: &'a [FrameHistoryEntry],
    /// Previous per-button confidence table, if any prior decision exists.
    pub previous_confidences: Option<&'a crate::decision::schema::ButtonConfidences>,
    /// Last up-to-10 personality comments.
    pub dialog_history: &'a [String],
    /// Avoid-hint flags derived from consecutive-press counters.
    pub avoid_hints: AvoidHints,
    /// Buttons currently floored by the no-change penalty.
    pub buttons_to_avoid: &'a [Button],
    /// Buttons currently banned.
    pub banned_buttons: &'a [Button],
    /// Formatted notes projection, ≤1000 chars.
    pub notes_projection: &'a str,
    /// Pre-analyzed screen-type result, if the screen-type phase already ran.
    pub screen_type: Option<&'a ScreenTypeReply>,
    /// Already-formatted history lines supplied directly by an external
    /// caller (the HTTP decide surface), used in place of `history` when
    /// non-empty.
    pub raw_history: &'a [String],
    /// The heuristic engine's priority-action verdict for the current game
    /// state (§4.4 "Priority action"), surfaced as a one-line hint.
    pub priority_action: Option<PriorityAction>,
}

/// Build the lightweight screen-type phase prompt.
pub fn build_screen_type_messages(frame_base64: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(
            "Classify the current game screen. Respond with JSON: \
             {\"screenType\": one of overworld|battle|menu|dialogue|textEntry|transition|unknown, \
             \"briefDescription\": a short sentence}.",
        ),
        ChatMessage::user_with_image("What kind of screen is this?", frame_base64),
    ]
}

/// Build the full decision-phase prompt from the gathered context.
pub fn build_decision_messages(ctx: &PromptContext<'_>) -> Vec<ChatMessage> {
    let mut system = String::from(
        "You are playing a turn-based handheld game through screenshots and button presses. \
         Choose the next button(s) to press. Respond with JSON matching the decision schema: \
         gameState, screenAnalysis, reasoning, personality_comment, buttonSequence (array of \
         per-button confidence tables), progressConfidence, notes.",
    );

    if let Some(priority) = ctx.priority_action {
        system.push_str(&format!("\n\nPriority: {}", priority.hint()));
    }

    if let Some(result) = ctx.screen_type {
        system.push_str(&format!(
            "\n\nPre-analyzed screen type: {:?} ({}).",
            result.screen_type, result.brief_description
        ));
    }

    if ctx.avoid_hints.avoid_start_select {
        system.push_str("\nAvoid START/SELECT; it has been pressed repeatedly with no benefit.");
    }
    if ctx.avoid_hints.avoid_wait {
        system.push_str("\nAvoid WAIT; it has been used repeatedly.");
    }
    if ctx.avoid_hints.avoid_b {
        system.push_str("\nAvoid B; it has been pressed repeatedly.");
    }
    if !ctx.buttons_to_avoid.is_empty() {
        system.push_str(&format!(
            "\nThese buttons produced no visible change recently, avoid them: {}.",
            join_buttons(ctx.buttons_to_avoid)
        ));
    }
    if !ctx.banned_buttons.is_empty() {
        system.push_str(&format!(
            "\nThese buttons are temporarily banned, do not select them: {}.",
            join_buttons(ctx.banned_buttons)
        ));
    }

    if !ctx.notes_projection.is_empty() {
        system.push_str(&format!("\n\nNotes from previous turns:\n{}", ctx.notes_projection));
    }

    if let Some(prev) = ctx.previous_confidences {
        system.push_str(&format!(
            "\n\nPrevious confidence table: A={:.2} B={:.2} START={:.2} SELECT={:.2} \
             UP={:.2} DOWN={:.2} LEFT={:.2} RIGHT={:.2} L={:.2} R={:.2} WAIT={:.2}",
            prev.a, prev.b, prev.start, prev.select, prev.up, prev.down, prev.left, prev.right,
            prev.l, prev.r, prev.wait
        ));
    }

    if !ctx.raw_history.is_empty() {
        system.push_str(&format!("\n\nRecent command history:\n{}", ctx.raw_history.join("\n")));
    } else if !ctx.history.is_empty() {
        let lines: Vec<String> = ctx
            .history
            .iter()
            .map(|entry| format!("{} -> {:?}: {}", entry.button, entry.visual_change, entry.reasoning))
            .collect();
        system.push_str(&format!("\n\nRecent command history:\n{}", lines.join("\n")));
    }

    if !ctx.dialog_history.is_empty() {
        system.push_str(&format!(
            "\n\nRecent personality comments:\n{}",
            ctx.dialog_history.join("\n")
        ));
    }

    let mut messages = vec![ChatMessage::system(system)];

    for previous in ctx.previous_frames_base64 {
        messages.push(ChatMessage::user_with_image("Earlier frame for context.", previous));
    }

    messages.push(ChatMessage::user_with_image(
        "Current frame. Decide the next button(s).",
        ctx.current_frame_base64,
    ));

    messages
}

fn join_buttons(buttons: &[Button]) -> String {
    buttons
        .iter()
        .map(|b| b.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
