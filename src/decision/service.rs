//! Decision Step (§4.5): two-phase model call, schema validation,
//! sequence derivation, response merger, fallback decision, cost
//! accounting.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::decision::cost::{call_cost, FALLBACK_COMPLETION_TOKENS, FALLBACK_PROMPT_TOKENS};
use crate::decision::json_extractor::JSONExtractor;
use crate::decision::prompt::{build_decision_messages, build_screen_type_messages, PromptContext};
use crate::decision::schema::{
    ButtonConfidences, DecisionReply, GameStateReply, ScreenTypeReply, DECISION_MAX_TOKENS, SCREEN_TYPE_MAX_TOKENS,
};
use crate::llm::VisionChatModel;
use crate::memory::MemoryStore;
use crate::types::Button;

/// Sequence steps beyond the first execute only if their argmax
/// confidence meets this threshold.
pub const SEQUENCE_STEP_THRESHOLD: f64 = 0.85;

/// The fully derived output of one decision iteration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    /// The button to execute first (argmax of step 1).
    pub button: Button,
    /// Confidence for `button` (step 1's argmax value).
    pub confidence: f64,
    /// Step 1's full per-button confidence table.
    pub confidence_scores: ButtonConfidences,
    /// The full derived execution plan, at least one element.
    pub sequence: Vec<Button>,
    /// A description of what the screen shows.
    pub screen_analysis: String,
    /// The model's reasoning for this decision.
    pub reasoning: String,
    /// An optional personality flourish.
    pub personality_comment: Option<String>,
    /// Confidence that overall progress is being made.
    pub progress_confidence: f64,
    /// True if this is the canonical fallback (model/schema/timeout failure).
    pub is_fallback: bool,
    /// When this decision was produced.
    pub timestamp: DateTime<Utc>,
    /// Prompt tokens charged to this decision (estimated on fallback).
    pub prompt_tokens: u32,
    /// Completion tokens charged to this decision (estimated on fallback).
    pub completion_tokens: u32,
    /// Dollar cost of this decision.
    pub cost: f64,
    /// Game-state fields the model reported this turn, if any.
    pub game_state: GameStateReply,
}

impl Decision {
    fn fallback(model_id: &str) -> Self {
        let table = ButtonConfidences::wait_favored();
        Self {
            button: Button::Wait,
            confidence: 0.5,
            confidence_scores: table,
            sequence: vec![Button::Wait],
            screen_analysis: String::new(),
            reasoning: "fallback decision: model call did not yield a usable reply".to_string(),
            personality_comment: None,
            progress_confidence: 0.0,
            is_fallback: true,
            timestamp: Utc::now(),
            game_state: GameStateReply::default(),
            prompt_tokens: FALLBACK_PROMPT_TOKENS,
            completion_tokens: FALLBACK_COMPLETION_TOKENS,
            cost: call_cost(model_id, FALLBACK_PROMPT_TOKENS, FALLBACK_COMPLETION_TOKENS),
        }
    }
}

/// Derive the execution plan from a raw button sequence: the first step
/// always executes; steps 2..N execute only while their argmax confidence
/// stays at or above `SEQUENCE_STEP_THRESHOLD`. Never returns an empty
/// plan — `WAIT` is substituted if the input sequence is empty.
pub fn derive_sequence(raw: &[ButtonConfidences]) -> Vec<Button> {
    if raw.is_empty() {
        return vec![Button::Wait];
    }

    let mut plan = vec![raw[0].argmax().0];
    for step in &raw[1..] {
        let (button, confidence) = step.argmax();
        if confidence >= SEQUENCE_STEP_THRESHOLD {
            plan.push(button);
        } else {
            break;
        }
    }
    plan
}

/// Drives the two-phase model call and the response merger that follows a
/// successful reply.
pub struct DecisionStep {
    model: Arc<dyn VisionChatModel>,
    memory: Arc<MemoryStore>,
    screen_type_timeout: Duration,
    decision_timeout: Duration,
    extractor: JSONExtractor,
}

impl DecisionStep {
    /// Build a decision step over `model`, persisting notes/log via `memory`.
    pub fn new(
        model: Arc<dyn VisionChatModel>,
        memory: Arc<MemoryStore>,
        screen_type_timeout: Duration,
        decision_timeout: Duration,
    ) -> Self {
        Self {
            model,
            memory,
            screen_type_timeout,
            decision_timeout,
            extractor: JSONExtractor::new(),
        }
    }

    /// Run the lightweight screen-type phase. Any failure (timeout,
    /// network, schema, cancellation) yields `unknown` and the iteration
    /// continues (§4.5: "Failure yields `unknown` and continues").
    async fn run_screen_type(&self, frame_base64: &str, cancel: &CancellationToken) -> ScreenTypeReply {
        let messages = build_screen_type_messages(frame_base64);
        let call = self.model.chat(&messages, SCREEN_TYPE_MAX_TOKENS, cancel);

        match tokio::time::timeout(self.screen_type_timeout, call).await {
            Ok(Ok(completion)) => self.parse_screen_type(&completion.completion),
            _ => ScreenTypeReply {
                screen_type: crate::types::ScreenKind::Unknown,
                brief_description: String::new(),
            },
        }
    }

    fn parse_screen_type(&self, raw: &str) -> ScreenTypeReply {
        let extracted = self.extractor.extract_from_response(raw);
        self.repair_and_parse(&extracted).unwrap_or(ScreenTypeReply {
            screen_type: crate::types::ScreenKind::Unknown,
            brief_description: String::new(),
        })
    }

    fn repair_and_parse<T: for<'de> Deserialize<'de>>(&self, extracted: &str) -> Option<T> {
        if let Ok(value) = serde_json::from_str(extracted) {
            return Some(value);
        }
        let repaired = anyrepair::repair(extracted).ok()?;
        serde_json::from_str(&repaired).ok()
    }

    /// Run one full decision iteration: screen-type phase, decision phase,
    /// sequence derivation, and the response merger (MergeNotes +
    /// AppendDecisionLog). On any model/schema/timeout failure, returns the
    /// canonical fallback decision and still logs/charges it.
    ///
    /// `cancel` is the coordinator's per-agent cancellation token and
    /// `iteration_deadline` its 30s hard deadline (§4.6, §8 "overall
    /// iteration deadline 30s from start of decision phase"): this races
    /// against the phases' own 30s/60s model timeouts, and whichever fires
    /// first wins (§9). Both `cancel` and the deadline race cover the
    /// model call itself (threaded into `VisionChatModel::chat`), not just
    /// the gap between button presses.
    pub async fn decide(
        &self,
        agent_id: &str,
        ctx: &mut PromptContext<'_>,
        cancel: &CancellationToken,
        iteration_deadline: Duration,
    ) -> Decision {
        let decision = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::warn!(agent_id, "decision cancelled before completion");
                Decision::fallback(self.model.model())
            }
            _ = tokio::time::sleep(iteration_deadline) => {
                tracing::warn!(agent_id, ?iteration_deadline, "decision exceeded the coordinator's iteration deadline");
                Decision::fallback(self.model.model())
            }
            decision = self.run_phases(agent_id, ctx, cancel) => decision,
        };

        if let Err(err) = self
            .memory
            .append_decision_log(agent_id, decision.button, decision.reasoning.clone())
            .await
        {
            tracing::warn!(agent_id, error = %err, "failed to append decision log entry");
        }

        decision
    }

    /// The screen-type and decision phases themselves, without the outer
    /// cancellation/deadline race or the decision-log append (split out so
    /// `decide` can race it against the coordinator's own deadline).
    async fn run_phases(&self, agent_id: &str, ctx: &mut PromptContext<'_>, cancel: &CancellationToken) -> Decision {
        let screen_type = self.run_screen_type(ctx.current_frame_base64, cancel).await;
        ctx.screen_type = Some(&screen_type);

        let messages = build_decision_messages(ctx);
        let call = self.model.chat(&messages, DECISION_MAX_TOKENS, cancel);

        match tokio::time::timeout(self.decision_timeout, call).await {
            Ok(Ok(completion)) => {
                let usage = completion.usage;
                match self.parse_decision_reply(&completion.completion) {
                    Some(reply) => {
                        if let Err(err) = self.memory.merge_notes(agent_id, reply.notes.clone()).await {
                            tracing::warn!(agent_id, error = %err, "failed to merge notes delta");
                        }
                        self.merge_reply(reply, usage)
                    }
                    None => Decision::fallback(self.model.model()),
                }
            }
            Ok(Err(_)) => Decision::fallback(self.model.model()),
            Err(_) => Decision::fallback(self.model.model()),
        }
    }

    fn parse_decision_reply(&self, raw: &str) -> Option<DecisionReply> {
        let extracted = self.extractor.extract_from_response(raw);
        let reply: DecisionReply = self.repair_and_parse(&extracted)?;
        if reply.button_sequence.is_empty() {
            return None;
        }
        Some(reply)
    }

    fn merge_reply(&self, reply: DecisionReply, usage: Option<crate::llm::ChatInvokeUsage>) -> Decision {
        let confidences: Vec<ButtonConfidences> =
            reply.button_sequence.iter().map(|s| s.confidences.clone()).collect();
        let sequence = derive_sequence(&confidences);
        let (button, confidence) = confidences[0].argmax();

        let (prompt_tokens, completion_tokens) = usage
            .map(|u| (u.prompt_tokens, u.completion_tokens))
            .unwrap_or((0, 0));

        Decision {
            button,
            confidence,
            confidence_scores: confidences[0].clone(),
            sequence,
            screen_analysis: reply.screen_analysis,
            reasoning: reply.reasoning,
            personality_comment: reply.personality_comment.filter(|s| !s.is_empty()),
            progress_confidence: reply.progress_confidence,
            is_fallback: false,
            timestamp: Utc::now(),
            game_state: reply.game_state,
            prompt_tokens,
            completion_tokens,
            cost: call_cost(self.model.model(), prompt_tokens, completion_tokens),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::InMemoryKv;

    fn table(lead: Button, confidence: f64) -> ButtonConfidences {
        let mut table = ButtonConfidences::wait_favored();
        match lead {
            Button::A => table.a = confidence,
            Button::Up => table.up = confidence,
            _ => unreachable!(),
        }
        table
    }

    #[test]
    fn empty_sequence_falls_back_to_wait() {
        assert_eq!(derive_sequence(&[]), vec![Button::Wait]);
    }

    #[test]
    fn steps_above_threshold_are_included() {
        let raw = vec![table(Button::A, 0.9), table(Button::Up, 0.9)];
        assert_eq!(derive_sequence(&raw), vec![Button::A, Button::Up]);
    }

    #[test]
    fn steps_below_threshold_stop_the_plan() {
        let raw = vec![table(Button::A, 0.9), table(Button::Up, 0.5)];
        assert_eq!(derive_sequence(&raw), vec![Button::A]);
    }

    #[test]
    fn first_step_always_executes_regardless_of_confidence() {
        let raw = vec![table(Button::A, 0.1)];
        assert_eq!(derive_sequence(&raw), vec![Button::A]);
    }

    #[tokio::test]
    async fn model_timeout_yields_fallback_and_charges_estimated_tokens() {
        use crate::llm::FakeChatModel;

        let model: Arc<dyn VisionChatModel> = Arc::new(FakeChatModel::scripted("test/fake", vec![]));
        let memory = Arc::new(MemoryStore::new(Arc::new(InMemoryKv::new())));
        let step = DecisionStep::new(model, memory, Duration::from_secs(1), Duration::from_secs(1));

        let mut ctx = PromptContext {
            current_frame_base64: "frame",
            previous_frames_base64: &[],
            history: &[],
            previous_confidences: None,
            dialog_history: &[],
            avoid_hints: Default::default(),
            buttons_to_avoid: &[],
            banned_buttons: &[],
            notes_projection: "",
            screen_type: None,
            raw_history: &[],
            priority_action: None,
        };

        let cancel = CancellationToken::new();
        let decision = step.decide("agent-1", &mut ctx, &cancel, Duration::from_secs(30)).await;
        assert!(decision.is_fallback);
        assert_eq!(decision.button, Button::Wait);
        assert!(decision.cost > 0.0);
    }

    #[tokio::test]
    async fn cancellation_token_yields_fallback() {
        use crate::llm::FakeChatModel;

        let model: Arc<dyn VisionChatModel> = Arc::new(FakeChatModel::scripted("test/fake", vec!["{}".to_string()]));
        let memory = Arc::new(MemoryStore::new(Arc::new(InMemoryKv::new())));
        let step = DecisionStep::new(model, memory, Duration::from_secs(30), Duration::from_secs(60));

        let mut ctx = PromptContext {
            current_frame_base64: "frame",
            previous_frames_base64: &[],
            history: &[],
            previous_confidences: None,
            dialog_history: &[],
            avoid_hints: Default::default(),
            buttons_to_avoid: &[],
            banned_buttons: &[],
            notes_projection: "",
            screen_type: None,
            raw_history: &[],
            priority_action: None,
        };

        let cancel = CancellationToken::new();
        cancel.cancel();
        let decision = step.decide("agent-1", &mut ctx, &cancel, Duration::from_secs(30)).await;
        assert!(decision.is_fallback);
        assert_eq!(decision.button, Button::Wait);
    }

    #[tokio::test]
    async fn short_iteration_deadline_still_returns_a_fallback_promptly() {
        use crate::llm::FakeChatModel;

        let model: Arc<dyn VisionChatModel> = Arc::new(FakeChatModel::scripted("test/fake", vec![]));
        let memory = Arc::new(MemoryStore::new(Arc::new(InMemoryKv::new())));
        let step = DecisionStep::new(model, memory, Duration::from_secs(30), Duration::from_secs(60));

        let mut ctx = PromptContext {
            current_frame_base64: "frame",
            previous_frames_base64: &[],
            history: &[],
            previous_confidences: None,
            dialog_history: &[],
            avoid_hints: Default::default(),
            buttons_to_avoid: &[],
            banned_buttons: &[],
            notes_projection: "",
            screen_type: None,
            raw_history: &[],
            priority_action: None,
        };

        let cancel = CancellationToken::new();
        let started = std::time::Instant::now();
        let decision = step.decide("agent-1", &mut ctx, &cancel, Duration::from_millis(50)).await;
        assert!(decision.is_fallback);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn valid_reply_derives_button_from_step_one_argmax() {
        use crate::llm::FakeChatModel;

        let decision_json = serde_json::json!({
            "gameState": {},
            "screenAnalysis": "overworld",
            "reasoning": "heading north",
            "personality_comment": null,
            "buttonSequence": [{"confidences": {
                "a": 0.1, "b": 0.1, "start": 0.0, "select": 0.0,
                "up": 0.95, "down": 0.0, "left": 0.0, "right": 0.0,
                "l": 0.0, "r": 0.0, "wait": 0.0
            }}],
            "progressConfidence": 0.8,
            "notes": {}
        })
        .to_string();

        let model: Arc<dyn VisionChatModel> = Arc::new(FakeChatModel::scripted(
            "test/fake",
            vec!["{}".to_string(), decision_json],
        ));
        let memory = Arc::new(MemoryStore::new(Arc::new(InMemoryKv::new())));
        let step = DecisionStep::new(model, memory, Duration::from_secs(1), Duration::from_secs(1));

        let mut ctx = PromptContext {
            current_frame_base64: "frame",
            previous_frames_base64: &[],
            history: &[],
            previous_confidences: None,
            dialog_history: &[],
            avoid_hints: Default::default(),
            buttons_to_avoid: &[],
            banned_buttons: &[],
            notes_projection: "",
            screen_type: None,
            raw_history: &[],
            priority_action: None,
        };

        let cancel = CancellationToken::new();
        let decision = step.decide("agent-1", &mut ctx, &cancel, Duration::from_secs(30)).await;
        assert!(!decision.is_fallback);
        assert_eq!(decision.button, Button::Up);
    }
}
