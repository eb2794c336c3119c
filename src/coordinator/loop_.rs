//! Loop Coordinator (§4.6): the per-agent driver owning the mutex,
//! cancellation token, heartbeat, cadence/cooldown, checkpointing, and
//! state publication.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::clock::Clock;
use crate::coordinator::agent::Agent;
use crate::coordinator::state_machine::can_transition;
use crate::decision::{ButtonConfidences, Decision, DecisionStep, FrameHistoryEntry, PromptContext};
use crate::error::{AgentError, Result};
use crate::frame_source::{validate_frame, FrameSource};
use crate::heuristics::{
    detect_stuck, event_reward, fingerprint, healing_reward, level_reward, navigation_reward, priority_action,
    visual_change, ButtonStats, Milestone, PriorityInputs, CRITICAL_HP_THRESHOLD, NO_CHANGE_CONFIDENCE_FLOOR,
};
use crate::memory::{MemoryStore, NotesDelta};
use crate::persistence::{agent_key, leaderboard_key, BlobStore, KvStore, TTL_AGENT_STATE};
use crate::types::{AgentStatus, ScreenKind, StuckMode, VisualChange};
use crate::LoopConfig;

/// Bound on retained frame-history/dialog-history/recent-action entries.
pub const MAX_RECENT_ACTIONS: usize = 5;

struct Inner {
    agent: Agent,
    button_stats: ButtonStats,
    last_fingerprint: Option<u32>,
    last_confidences: Option<ButtonConfidences>,
    recent_actions: VecDeque<crate::types::Button>,
    frame_history: VecDeque<FrameHistoryEntry>,
    dialog_history: VecDeque<String>,
    decisions_since_checkpoint: u64,
}

/// Per-agent decision loop driver. One instance owns exactly one mutex
/// guarding the decision/input/cooldown critical section, so at most one
/// decision is ever in flight for this agent (§5).
pub struct Coordinator {
    agent_id: String,
    inner: tokio::sync::Mutex<Inner>,
    cancel: std::sync::Mutex<CancellationToken>,
    heartbeat_millis: AtomicI64,
    clock: Arc<dyn Clock>,
    kv: Arc<dyn KvStore>,
    blob: Arc<dyn BlobStore>,
    memory: Arc<MemoryStore>,
    frame_source: Arc<dyn FrameSource>,
    decision_step: Arc<DecisionStep>,
    loop_config: LoopConfig,
}

/// The outcome of one `run_iteration` call: the decision plus how long the
/// caller should sleep before starting the next one.
pub struct IterationOutcome {
    /// The decision produced (or the fallback).
    pub decision: Decision,
    /// Cooldown to honor before the next iteration (§4.6 "Cooldown").
    pub cooldown: std::time::Duration,
}

impl Coordinator {
    /// Construct a coordinator for a freshly-created agent.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        agent_id: impl Into<String>,
        model_id: impl Into<String>,
        clock: Arc<dyn Clock>,
        kv: Arc<dyn KvStore>,
        blob: Arc<dyn BlobStore>,
        memory: Arc<MemoryStore>,
        frame_source: Arc<dyn FrameSource>,
        decision_step: Arc<DecisionStep>,
        loop_config: LoopConfig,
    ) -> Self {
        let agent_id = agent_id.into();
        let now = clock.now();
        let agent = Agent::new(agent_id.clone(), model_id, now);
        Self {
            agent_id,
            inner: tokio::sync::Mutex::new(Inner {
                agent,
                button_stats: ButtonStats::new(),
                last_fingerprint: None,
                last_confidences: None,
                recent_actions: VecDeque::new(),
                frame_history: VecDeque::new(),
                dialog_history: VecDeque::new(),
                decisions_since_checkpoint: 0,
            }),
            cancel: std::sync::Mutex::new(CancellationToken::new()),
            heartbeat_millis: AtomicI64::new(now.timestamp_millis()),
            clock,
            kv,
            blob,
            memory,
            frame_source,
            decision_step,
            loop_config,
        }
    }

    /// This coordinator's agent id.
    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// The cancellation token for the current run; in-flight model calls
    /// and input execution observe it.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.lock().expect("cancel mutex poisoned").clone()
    }

    /// Refresh liveness. Cheap: does not take the iteration mutex, so a
    /// heartbeat always lands even while a decision is in flight.
    pub async fn heartbeat(&self) -> Result<chrono::DateTime<Utc>> {
        let now = self.clock.now();
        self.heartbeat_millis.store(now.timestamp_millis(), Ordering::SeqCst);
        self.kv
            .set(
                &agent_key(&self.agent_id, "heartbeat"),
                &now.to_rfc3339(),
                Some(self.loop_config.heartbeat_ttl()),
            )
            .await?;
        Ok(now)
    }

    /// `(last_beat, elapsed_secs, alive)` per the `/heartbeat` GET contract.
    pub fn heartbeat_status(&self) -> (chrono::DateTime<Utc>, i64, bool) {
        let last_beat_ms = self.heartbeat_millis.load(Ordering::SeqCst);
        let last_beat = chrono::DateTime::from_timestamp_millis(last_beat_ms).unwrap_or_else(Utc::now);
        let elapsed = (self.clock.now() - last_beat).num_seconds();
        let alive = elapsed <= self.loop_config.client_gone_threshold_secs as i64;
        (last_beat, elapsed, alive)
    }

    /// A cloned snapshot of the agent's current record.
    pub async fn snapshot(&self) -> Agent {
        self.inner.lock().await.agent.clone()
    }

    /// Current lifecycle status.
    pub async fn status(&self) -> AgentStatus {
        self.inner.lock().await.agent.status
    }

    /// Abort in-flight work, clear per-run state, and delete this agent's
    /// keys. Reinitializes `GameState`/`ProgressMetrics` (§4.6 "Reset").
    pub async fn reset(&self) -> Result<()> {
        {
            let cancel = self.cancel.lock().expect("cancel mutex poisoned");
            cancel.cancel();
        }
        *self.cancel.lock().expect("cancel mutex poisoned") = CancellationToken::new();

        let mut inner = self.inner.lock().await;
        let now = self.clock.now();
        let model_id = inner.agent.model_id.clone();
        inner.agent = Agent::new(self.agent_id.clone(), model_id, now);
        inner.button_stats = ButtonStats::new();
        inner.last_fingerprint = None;
        inner.last_confidences = None;
        inner.recent_actions.clear();
        inner.frame_history.clear();
        inner.dialog_history.clear();
        inner.decisions_since_checkpoint = 0;
        drop(inner);

        self.memory.clear_notes(&self.agent_id).await?;
        self.memory.clear_decision_log(&self.agent_id).await?;
        for key in self.kv.keys_with_prefix(&agent_key(&self.agent_id, "")).await? {
            self.kv.del(&key).await?;
        }
        Ok(())
    }

    /// Run one full iteration: capture, heuristics, memory read, decision,
    /// input execution, memory write, state publication. Transitions the
    /// agent through `idle → thinking → acting → idle` on success.
    pub async fn run_iteration(&self) -> Result<IterationOutcome> {
        let (last_beat, elapsed, _) = self.heartbeat_status();
        if elapsed > self.loop_config.client_gone_threshold_secs as i64 && last_beat.timestamp_millis() > 0 {
            let mut inner = self.inner.lock().await;
            inner.agent.status = AgentStatus::Paused;
            self.publish_state(&inner.agent).await.ok();
            return Err(AgentError::Agent(format!(
                "agent {} paused: no heartbeat for {}s",
                self.agent_id, elapsed
            )));
        }

        let mut inner = self.inner.lock().await;
        self.transition(&mut inner, AgentStatus::Thinking);

        let captured = match self.frame_source.capture().await {
            Ok(frame) => frame,
            Err(err) => {
                inner.agent.status = AgentStatus::Idle;
                return Err(err);
            }
        };
        if let Err(err) = validate_frame(&captured) {
            inner.agent.status = AgentStatus::Idle;
            return Err(err);
        }

        let current_fp = fingerprint(&captured.base64_png);
        let change = visual_change(inner.last_fingerprint, current_fp);
        if let Some(last_button) = inner.agent.game_state.last_input {
            inner.button_stats.record_visual_change(last_button, change);
            if change == VisualChange::NoChange {
                inner.agent.game_state.progress.consecutive_no_change += 1;
            } else {
                inner.agent.game_state.progress.consecutive_no_change = 0;
            }
        }
        inner.last_fingerprint = Some(current_fp);

        let notes = self.memory.get_notes(&self.agent_id).await?;
        let notes_projection = self.memory.format_notes_for_prompt(&notes);

        let avoid_hints = inner.button_stats.avoid_hints();
        let buttons_to_avoid: Vec<_> = inner.button_stats.buttons_to_avoid.iter().copied().collect();
        let banned_buttons: Vec<_> = inner.button_stats.banned_buttons.keys().copied().collect();
        let history: Vec<FrameHistoryEntry> = inner.frame_history.iter().cloned().collect();
        let dialog_history: Vec<String> = inner.dialog_history.iter().cloned().collect();
        let recent_actions: Vec<_> = inner.recent_actions.iter().copied().collect();
        // §4.4 "No-change penalty": the previous prompt's confidence table
        // is floored to ≤0.20 for every button the no-change penalty has
        // marked, not shown verbatim (invariant 5).
        let previous_confidences: Option<ButtonConfidences> = inner
            .last_confidences
            .as_ref()
            .map(|table| table.floored(&buttons_to_avoid, NO_CHANGE_CONFIDENCE_FLOOR));

        let priority = priority_action(PriorityInputs {
            critical_hp: inner.agent.game_state.party_hp < CRITICAL_HP_THRESHOLD,
            in_battle: inner.agent.game_state.in_battle,
            in_dialogue: inner.agent.game_state.in_dialogue,
            in_menu: inner.agent.game_state.in_menu,
        });

        let mut ctx = PromptContext {
            current_frame_base64: &captured.base64_png,
            previous_frames_base64: &[],
            history: &history,
            previous_confidences: previous_confidences.as_ref(),
            dialog_history: &dialog_history,
            avoid_hints,
            buttons_to_avoid: &buttons_to_avoid,
            banned_buttons: &banned_buttons,
            notes_projection: &notes_projection,
            screen_type: None,
            raw_history: &[],
            priority_action: Some(priority),
        };

        let decision = self
            .decision_step
            .decide(&self.agent_id, &mut ctx, &self.cancellation_token(), self.loop_config.iteration_deadline())
            .await;
        inner.last_confidences = Some(decision.confidence_scores.clone());

        self.transition(&mut inner, AgentStatus::Acting);

        for (i, button) in decision.sequence.iter().enumerate() {
            if self.cancellation_token().is_cancelled() {
                break;
            }
            // WAIT is a coordinator-only convention (§6) and is never sent to
            // the Frame Source, but it still counts toward `ButtonStats`'
            // consecutive counters (§4.4 "Button counters" tracks WAIT the
            // same as START/SELECT/B) and the recent-actions window stuck
            // detection consults.
            if *button != crate::types::Button::Wait {
                self.frame_source.press_and_release(*button, crate::frame_source::MIN_OBSERVABLE_HOLD_MS).await?;
            }
            inner.button_stats.record_press(*button);
            inner.recent_actions.push_back(*button);
            if inner.recent_actions.len() > MAX_RECENT_ACTIONS {
                inner.recent_actions.pop_front();
            }
            if i + 1 < decision.sequence.len() {
                tokio::time::sleep(std::time::Duration::from_millis(500)).await;
            }
        }
        inner.button_stats.tick_ban_countdown();

        if let Some(pattern) = detect_stuck(inner.agent.game_state.progress.consecutive_no_change, &recent_actions) {
            let stuck_mode = match pattern {
                crate::types::StuckPattern::WallCollision => StuckMode::WallHug,
                crate::types::StuckPattern::DialogueLoop => StuckMode::Backtrack,
                crate::types::StuckPattern::Unknown => StuckMode::PerimeterScan,
            };
            self.memory
                .merge_notes(
                    &self.agent_id,
                    NotesDelta {
                        stuck_mode: Some(stuck_mode),
                        ..Default::default()
                    },
                )
                .await?;
        }

        let areas_before = inner.agent.game_state.progress.unique_area_count;
        let hp_before = inner.agent.game_state.party_hp;
        let levels_before = inner.agent.game_state.party_level_sum;
        let milestone = decision.game_state.milestone;
        inner.agent.game_state.apply_reply(&decision.game_state, decision.button, change);
        let newly_visited = inner.agent.game_state.progress.unique_area_count.saturating_sub(areas_before);
        if newly_visited > 0 {
            tracing::debug!(
                agent_id = %self.agent_id,
                reward = navigation_reward(newly_visited),
                "navigation reward for newly visited area(s)"
            );
        }

        let healing = healing_reward(hp_before, inner.agent.game_state.party_hp, 1.0);
        if healing > 0.0 {
            inner.agent.game_state.progress.total_healing_reward += healing;
        }
        let level_gain = level_reward(levels_before, inner.agent.game_state.party_level_sum);
        if level_gain > 0.0 {
            inner.agent.game_state.progress.total_level_reward += level_gain;
        }
        if let Some(milestone) = milestone {
            let key = match milestone {
                Milestone::GymLeader => format!("gym_leader_{}", inner.agent.game_state.badges),
                Milestone::CaveExit => format!("cave_exit_{}", inner.agent.game_state.area),
                Milestone::EliteFourEntry => "elite_four_entry".to_string(),
                Milestone::Champion => "champion".to_string(),
            };
            tracing::debug!(
                agent_id = %self.agent_id,
                milestone = %key,
                reward = event_reward(milestone),
                "milestone event reward"
            );
            inner.agent.game_state.progress.record_milestone(key);
            self.kv
                .zadd(
                    &leaderboard_key("milestones"),
                    &self.agent_id,
                    inner.agent.game_state.progress.completed_milestones.len() as f64,
                )
                .await
                .ok();
        }
        inner.agent.total_decisions += 1;
        if decision.is_fallback {
            inner.agent.fallback_count += 1;
        }
        inner.agent.total_cost += decision.cost;
        inner.agent.total_tokens_in += decision.prompt_tokens as u64;
        inner.agent.total_tokens_out += decision.completion_tokens as u64;
        inner.agent.updated_at = self.clock.now();

        if let Some(comment) = &decision.personality_comment {
            inner.dialog_history.push_back(comment.clone());
            if inner.dialog_history.len() > crate::decision::MAX_DIALOG_HISTORY {
                inner.dialog_history.pop_front();
            }
        }
        inner.frame_history.push_back(FrameHistoryEntry {
            button: decision.button,
            reasoning: decision.reasoning.chars().take(200).collect(),
            timestamp: decision.timestamp,
            fingerprint: current_fp,
            visual_change: change,
        });
        if inner.frame_history.len() > crate::decision::MAX_FRAME_HISTORY {
            inner.frame_history.pop_front();
        }

        inner.decisions_since_checkpoint += 1;
        if inner.decisions_since_checkpoint >= self.loop_config.checkpoint_every_n_decisions {
            inner.decisions_since_checkpoint = 0;
            let agent = inner.agent.clone();
            if let Err(err) = self.save_checkpoint(&agent).await {
                tracing::warn!(agent_id = %self.agent_id, error = %err, "automatic checkpoint failed");
            }
        }

        self.publish_state(&inner.agent).await.ok();
        let screen_kind = inner.agent.game_state.screen_kind;
        self.transition(&mut inner, AgentStatus::Idle);

        let cooldown = if screen_kind == ScreenKind::Dialogue {
            self.loop_config.cooldown_dialogue()
        } else {
            self.loop_config.cooldown_default()
        };

        Ok(IterationOutcome { decision, cooldown })
    }

    /// Run one decision against an externally-supplied frame and heuristic
    /// hints, for the `POST /api/agent/decide` surface (§6). Unlike
    /// `run_iteration`, the caller owns frame capture and the avoid/banned
    /// hint bookkeeping; this still serializes through the same mutex, so
    /// it never races with a concurrent `run_iteration` for the same agent.
    #[allow(clippy::too_many_arguments)]
    pub async fn decide_from_request(
        &self,
        frame_base64: &str,
        previous_frames_base64: &[String],
        history_lines: &[String],
        previous_confidences: Option<crate::decision::ButtonConfidences>,
        dialog_history: &[String],
        avoid_hints: crate::heuristics::AvoidHints,
        buttons_to_avoid: &[crate::types::Button],
        banned_buttons: &[crate::types::Button],
    ) -> Result<Decision> {
        let (last_beat, elapsed, _) = self.heartbeat_status();
        if elapsed > self.loop_config.client_gone_threshold_secs as i64 && last_beat.timestamp_millis() > 0 {
            let mut inner = self.inner.lock().await;
            inner.agent.status = AgentStatus::Paused;
            self.publish_state(&inner.agent).await.ok();
            return Err(AgentError::Agent(format!(
                "agent {} paused: no heartbeat for {}s",
                self.agent_id, elapsed
            )));
        }

        let mut inner = self.inner.lock().await;
        self.transition(&mut inner, AgentStatus::Thinking);

        let notes_projection = {
            let notes = self.memory.get_notes(&self.agent_id).await.unwrap_or_default();
            self.memory.format_notes_for_prompt(&notes)
        };

        let priority = priority_action(PriorityInputs {
            critical_hp: inner.agent.game_state.party_hp < CRITICAL_HP_THRESHOLD,
            in_battle: inner.agent.game_state.in_battle,
            in_dialogue: inner.agent.game_state.in_dialogue,
            in_menu: inner.agent.game_state.in_menu,
        });

        let mut ctx = PromptContext {
            current_frame_base64: frame_base64,
            previous_frames_base64,
            history: &[],
            previous_confidences: previous_confidences.as_ref(),
            dialog_history,
            avoid_hints,
            buttons_to_avoid,
            banned_buttons,
            notes_projection: &notes_projection,
            screen_type: None,
            raw_history: history_lines,
            priority_action: Some(priority),
        };

        self.transition(&mut inner, AgentStatus::Acting);
        let decision = self
            .decision_step
            .decide(&self.agent_id, &mut ctx, &self.cancellation_token(), self.loop_config.iteration_deadline())
            .await;

        // No frame-to-frame fingerprint comparison happens on this path
        // (the caller owns capture), so there is no basis for asserting a
        // visual change here; `last_effective_action` is left untouched.
        inner
            .agent
            .game_state
            .apply_reply(&decision.game_state, decision.button, VisualChange::FirstFrame);
        inner.agent.total_decisions += 1;
        if decision.is_fallback {
            inner.agent.fallback_count += 1;
        }
        inner.agent.total_cost += decision.cost;
        inner.agent.total_tokens_in += decision.prompt_tokens as u64;
        inner.agent.total_tokens_out += decision.completion_tokens as u64;
        inner.agent.updated_at = self.clock.now();

        self.publish_state(&inner.agent).await.ok();
        self.transition(&mut inner, AgentStatus::Idle);

        Ok(decision)
    }

    fn transition(&self, inner: &mut Inner, to: AgentStatus) {
        if can_transition(inner.agent.status, to) {
            inner.agent.status = to;
        }
    }

    async fn publish_state(&self, agent: &Agent) -> Result<()> {
        let serialized = serde_json::to_string(agent)?;
        self.kv
            .set(&agent_key(&self.agent_id, "state"), &serialized, Some(TTL_AGENT_STATE))
            .await?;
        self.kv.incr_by(&agent_key(&self.agent_id, "frames"), 1).await?;

        // Leaderboard sorted sets: member = agentId, score = the latest
        // measured value, so a repeated publish for the same agent just
        // overwrites its entry rather than accumulating (§5 "idempotent").
        self.kv
            .zadd(&leaderboard_key("badges"), &self.agent_id, agent.game_state.badges as f64)
            .await
            .ok();
        self.kv
            .zadd(&leaderboard_key("cost"), &self.agent_id, agent.total_cost)
            .await
            .ok();
        Ok(())
    }

    /// Request a save-state from the frame source and upload it to the
    /// blob store under the checkpoint filename convention (§6). Used
    /// both by the automatic every-N-decisions checkpoint and by the
    /// `POST /save-state` surface, so both paths share one filename
    /// format and upload path.
    pub async fn save_checkpoint(&self, agent: &Agent) -> Result<CheckpointInfo> {
        let bytes = self.frame_source.save_state().await?;
        let now = self.clock.now();
        let model_safe = safe_model_name(&agent.model_id);
        let filename = format!(
            "save-states/{}/{}_{}_D{}_{}.state",
            self.agent_id,
            now.format("%Y-%m-%d"),
            now.format("%H-%M"),
            agent.total_decisions,
            model_safe
        );
        let url = self.blob.put(&filename, bytes).await?;
        Ok(CheckpointInfo {
            url,
            filename,
            decision_number: agent.total_decisions,
        })
    }
}

/// The result of a successful checkpoint upload (§6 `POST /save-state`).
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointInfo {
    /// The blob store's fetchable URL for the uploaded checkpoint.
    pub url: String,
    /// The checkpoint filename, per the `save-states/{agentId}/...` convention.
    pub filename: String,
    /// The decision count this checkpoint was taken at.
    pub decision_number: u64,
}

fn safe_model_name(model_id: &str) -> String {
    model_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::clock::FixedClock;
    use crate::decision::DecisionStep;
    use crate::frame_source::MockFrameSource;
    use crate::heuristics::AvoidHints;
    use crate::llm::FakeChatModel;
    use crate::memory::MemoryStore;
    use crate::persistence::{InMemoryBlob, InMemoryKv};

    #[test]
    fn safe_model_name_replaces_non_alphanumeric_characters() {
        assert_eq!(safe_model_name("openai/gpt-4o"), "openai-gpt-4o");
    }

    fn test_coordinator(clock: Arc<FixedClock>) -> Coordinator {
        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKv::new());
        let blob: Arc<dyn BlobStore> = Arc::new(InMemoryBlob::new());
        let memory = Arc::new(MemoryStore::new(kv.clone()));
        let model = Arc::new(FakeChatModel::scripted("test-model", vec![]));
        let decision_step = Arc::new(DecisionStep::new(
            model,
            memory.clone(),
            std::time::Duration::from_secs(5),
            std::time::Duration::from_secs(5),
        ));
        Coordinator::new(
            "agent-loop-test",
            "test-model",
            clock,
            kv,
            blob,
            memory,
            Arc::new(MockFrameSource::changing()),
            decision_step,
            LoopConfig::default(),
        )
    }

    #[tokio::test]
    async fn decide_from_request_is_rejected_once_heartbeat_is_stale() {
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let coordinator = test_coordinator(clock.clone());
        coordinator.heartbeat().await.unwrap();

        clock.advance(chrono::Duration::seconds(31));

        let result = coordinator
            .decide_from_request(
                &"x".repeat(2000),
                &[],
                &[],
                None,
                &[],
                AvoidHints::default(),
                &[],
                &[],
            )
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn decide_from_request_proceeds_with_a_fresh_heartbeat() {
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let coordinator = test_coordinator(clock.clone());
        coordinator.heartbeat().await.unwrap();

        let result = coordinator
            .decide_from_request(
                &"x".repeat(2000),
                &[],
                &[],
                None,
                &[],
                AvoidHints::default(),
                &[],
                &[],
            )
            .await;
        assert!(result.is_ok());
    }
}
