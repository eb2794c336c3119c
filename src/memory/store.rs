//! Memory Store (§4.3): Notes and DecisionLog, layered on the persistence
//! layer's key-value interface.

use std::sync::Arc;

use chrono::Utc;

use crate::error::{AgentError, Result};
use crate::memory::log::{DecisionLogEntry, MAX_LOG_ENTRIES};
use crate::memory::notes::{Notes, NotesDelta, NOTES_PROMPT_LIMIT};
use crate::persistence::{agent_key, KvStore};
use crate::types::Button;

const NOTES_SUFFIX: &str = "memstash";
const LOG_SUFFIX: &str = "decisionlog";

/// Reads and writes Notes/DecisionLog for a single agent namespace. Memory
/// Store exclusively writes these two keys (§3 "Ownership"); nothing else
/// in the crate should touch `memstash`/`decisionlog` directly.
pub struct MemoryStore {
    kv: Arc<dyn KvStore>,
}

impl MemoryStore {
    /// Build a memory store over a shared key-value backend.
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Read the current notes for `agent_id`, or an empty `Notes` if none
    /// have been written yet. Tolerates a legacy free-text value by
    /// wrapping it in `Notes::legacy`.
    pub async fn get_notes(&self, agent_id: &str) -> Result<Notes> {
        let key = agent_key(agent_id, NOTES_SUFFIX);
        match self.kv.get(&key).await? {
            None => Ok(Notes::default()),
            Some(raw) => match serde_json::from_str::<Notes>(&raw) {
                Ok(notes) => Ok(notes),
                Err(_) => Ok(Notes {
                    legacy: Some(raw),
                    ..Default::default()
                }),
            },
        }
    }

    /// Merge `delta` into the agent's stored notes and persist the result.
    pub async fn merge_notes(&self, agent_id: &str, delta: NotesDelta) -> Result<Notes> {
        let mut notes = self.get_notes(agent_id).await?;
        notes.merge(delta);
        let serialized = serde_json::to_string(&notes)?;
        self.kv.set(&agent_key(agent_id, NOTES_SUFFIX), &serialized, None).await?;
        Ok(notes)
    }

    /// Clear an agent's notes, called on reset.
    pub async fn clear_notes(&self, agent_id: &str) -> Result<()> {
        self.kv.del(&agent_key(agent_id, NOTES_SUFFIX)).await
    }

    /// Deterministic, human-readable projection of `notes`, bounded to
    /// `limit` characters (defaults to 1000 via `format_notes_for_prompt`).
    pub fn format_notes_for_prompt(&self, notes: &Notes) -> String {
        notes.format_for_prompt(NOTES_PROMPT_LIMIT)
    }

    /// Append one decision to the log, assigning the next step number and
    /// truncating to the most recent `MAX_LOG_ENTRIES`.
    pub async fn append_decision_log(&self, agent_id: &str, button: Button, reasoning: String) -> Result<DecisionLogEntry> {
        let key = agent_key(agent_id, LOG_SUFFIX);
        let step = self.kv.llen(&key).await? + 1;
        let entry = DecisionLogEntry {
            step,
            button,
            reasoning,
            timestamp: Utc::now(),
        };
        let serialized = serde_json::to_string(&entry)?;
        self.kv.rpush(&key, &serialized).await?;
        if step > MAX_LOG_ENTRIES as u64 {
            self.kv.ltrim(&key, -(MAX_LOG_ENTRIES as i64), -1).await?;
        }
        Ok(entry)
    }

    /// Read the full retained decision log, oldest first.
    pub async fn get_decision_log(&self, agent_id: &str) -> Result<Vec<DecisionLogEntry>> {
        let key = agent_key(agent_id, LOG_SUFFIX);
        let raw = self.kv.lrange(&key, 0, -1).await?;
        raw.iter()
            .map(|s| serde_json::from_str(s).map_err(AgentError::from))
            .collect()
    }

    /// Clear an agent's decision log, called on reset.
    pub async fn clear_decision_log(&self, agent_id: &str) -> Result<()> {
        self.kv.del(&agent_key(agent_id, LOG_SUFFIX)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::InMemoryKv;

    fn store() -> MemoryStore {
        MemoryStore::new(Arc::new(InMemoryKv::new()))
    }

    #[tokio::test]
    async fn merge_then_read_roundtrips() {
        let store = store();
        store
            .merge_notes(
                "a1",
                NotesDelta {
                    current_objective: Some("find exit".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let notes = store.get_notes("a1").await.unwrap();
        assert_eq!(notes.current_objective.as_deref(), Some("find exit"));
    }

    #[tokio::test]
    async fn merge_of_empty_delta_matches_single_merge() {
        let store = store();
        store
            .merge_notes(
                "a1",
                NotesDelta {
                    current_objective: Some("find exit".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let once = store.get_notes("a1").await.unwrap();
        store.merge_notes("a1", NotesDelta::default()).await.unwrap();
        let after_noop = store.get_notes("a1").await.unwrap();
        assert_eq!(once.current_objective, after_noop.current_objective);
    }

    #[tokio::test]
    async fn clear_notes_resets_to_empty() {
        let store = store();
        store
            .merge_notes(
                "a1",
                NotesDelta {
                    general: Some("hi".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        store.clear_notes("a1").await.unwrap();
        let notes = store.get_notes("a1").await.unwrap();
        assert!(notes.general.is_none());
    }

    #[tokio::test]
    async fn decision_log_assigns_increasing_step_numbers() {
        let store = store();
        let first = store
            .append_decision_log("a1", Button::A, "pressed A".into())
            .await
            .unwrap();
        let second = store
            .append_decision_log("a1", Button::B, "pressed B".into())
            .await
            .unwrap();
        assert_eq!(first.step, 1);
        assert_eq!(second.step, 2);
    }

    #[tokio::test]
    async fn decision_log_truncates_to_max_entries() {
        let store = store();
        for i in 0..(MAX_LOG_ENTRIES + 10) {
            store
                .append_decision_log("a1", Button::Wait, format!("step {i}"))
                .await
                .unwrap();
        }
        let log = store.get_decision_log("a1").await.unwrap();
        assert_eq!(log.len(), MAX_LOG_ENTRIES);
    }

    #[tokio::test]
    async fn reset_clears_both_notes_and_log() {
        let store = store();
        store
            .merge_notes(
                "a1",
                NotesDelta {
                    general: Some("x".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        store
            .append_decision_log("a1", Button::A, "x".into())
            .await
            .unwrap();

        store.clear_notes("a1").await.unwrap();
        store.clear_decision_log("a1").await.unwrap();

        assert!(store.get_notes("a1").await.unwrap().general.is_none());
        assert!(store.get_decision_log("a1").await.unwrap().is_empty());
    }
}
