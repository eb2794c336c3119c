//! Structured agent notes (§3 "Notes", §4.3).

use serde::{Deserialize, Serialize};

use crate::types::StuckMode;

/// Maximum number of retained `failedAttempts` entries.
pub const MAX_FAILED_ATTEMPTS: usize = 5;
/// Character budget for the prompt projection (§4.3).
pub const NOTES_PROMPT_LIMIT: usize = 1000;

/// Structured, persistent per-agent scratchpad. All fields are optional
/// and overwrite-on-write except `failed_attempts`, which is append-then-
/// truncate. `legacy` tolerates a free-text predecessor format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notes {
    /// What the agent is currently trying to accomplish.
    pub current_objective: Option<String>,
    /// The last area label the agent believed it was in.
    pub last_known_location: Option<String>,
    /// Whether an exit/path forward has been located.
    pub exit_found: Option<bool>,
    /// The coordinator's current stuck classification, if any.
    pub stuck_mode: Option<StuckMode>,
    /// The most recent failed approaches, oldest first, capped to 5.
    pub failed_attempts: Vec<String>,
    /// A noteworthy one-off discovery worth recalling.
    pub important_discovery: Option<String>,
    /// Freeform notes that don't fit another field.
    pub general: Option<String>,
    /// Unstructured predecessor-format text, tolerated for compatibility.
    pub legacy: Option<String>,
}

/// A partial update applied to an existing `Notes` record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotesDelta {
    /// See `Notes::current_objective`.
    pub current_objective: Option<String>,
    /// See `Notes::last_known_location`.
    pub last_known_location: Option<String>,
    /// See `Notes::exit_found`.
    pub exit_found: Option<bool>,
    /// See `Notes::stuck_mode`.
    pub stuck_mode: Option<StuckMode>,
    /// Appended to `failed_attempts`, then truncated to the last 5.
    pub failed_attempts: Vec<String>,
    /// See `Notes::important_discovery`.
    pub important_discovery: Option<String>,
    /// See `Notes::general`.
    pub general: Option<String>,
}

impl Notes {
    /// Apply `delta` field-by-field: `Some` values overwrite, `None`
    /// leaves the existing value untouched. `failed_attempts` entries are
    /// appended, then the list is truncated to the most recent 5.
    pub fn merge(&mut self, delta: NotesDelta) {
        if delta.current_objective.is_some() {
            self.current_objective = delta.current_objective;
        }
        if delta.last_known_location.is_some() {
            self.last_known_location = delta.last_known_location;
        }
        if delta.exit_found.is_some() {
            self.exit_found = delta.exit_found;
        }
        if delta.stuck_mode.is_some() {
            self.stuck_mode = delta.stuck_mode;
        }
        if delta.important_discovery.is_some() {
            self.important_discovery = delta.important_discovery;
        }
        if delta.general.is_some() {
            self.general = delta.general;
        }

        self.failed_attempts.extend(delta.failed_attempts);
        if self.failed_attempts.len() > MAX_FAILED_ATTEMPTS {
            let excess = self.failed_attempts.len() - MAX_FAILED_ATTEMPTS;
            self.failed_attempts.drain(0..excess);
        }
    }

    /// A deterministic, human-readable projection of these notes,
    /// truncated to `limit` characters on a line boundary.
    pub fn format_for_prompt(&self, limit: usize) -> String {
        let mut lines = Vec::new();
        if let Some(o) = &self.current_objective {
            lines.push(format!("objective: {o}"));
        }
        if let Some(l) = &self.last_known_location {
            lines.push(format!("location: {l}"));
        }
        if let Some(e) = self.exit_found {
            lines.push(format!("exit found: {e}"));
        }
        if let Some(m) = self.stuck_mode {
            lines.push(format!("stuck mode: {m:?}"));
        }
        if !self.failed_attempts.is_empty() {
            lines.push(format!("failed attempts: {}", self.failed_attempts.join("; ")));
        }
        if let Some(d) = &self.important_discovery {
            lines.push(format!("discovery: {d}"));
        }
        if let Some(g) = &self.general {
            lines.push(format!("notes: {g}"));
        }
        if let Some(legacy) = &self.legacy {
            lines.push(format!("legacy: {legacy}"));
        }

        truncate_on_line_boundary(&lines.join("\n"), limit)
    }
}

fn truncate_on_line_boundary(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        return text.to_string();
    }
    let mut cut = 0;
    for (i, line) in text.split_inclusive('\n').enumerate() {
        if cut + line.len() > limit {
            if i == 0 {
                return text[..limit.min(text.len())].to_string();
            }
            break;
        }
        cut += line.len();
    }
    text[..cut].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_overwrites_present_fields_and_leaves_others() {
        let mut notes = Notes {
            current_objective: Some("find the exit".into()),
            general: Some("keep going".into()),
            ..Default::default()
        };
        notes.merge(NotesDelta {
            current_objective: Some("reach the gym".into()),
            ..Default::default()
        });
        assert_eq!(notes.current_objective.as_deref(), Some("reach the gym"));
        assert_eq!(notes.general.as_deref(), Some("keep going"));
    }

    #[test]
    fn failed_attempts_append_then_truncate_to_five() {
        let mut notes = Notes::default();
        for i in 0..7 {
            notes.merge(NotesDelta {
                failed_attempts: vec![format!("attempt-{i}")],
                ..Default::default()
            });
        }
        assert_eq!(notes.failed_attempts.len(), 5);
        assert_eq!(notes.failed_attempts[0], "attempt-2");
        assert_eq!(notes.failed_attempts[4], "attempt-6");
    }

    #[test]
    fn merge_of_empty_delta_is_a_no_op() {
        let mut notes = Notes::default();
        notes.merge(NotesDelta {
            current_objective: Some("go north".into()),
            ..Default::default()
        });
        let once = notes.clone();
        notes.merge(NotesDelta::default());
        assert_eq!(notes.current_objective, once.current_objective);
        assert_eq!(notes.failed_attempts, once.failed_attempts);
    }

    #[test]
    fn prompt_projection_never_exceeds_limit() {
        let mut notes = Notes::default();
        notes.general = Some("x".repeat(5000));
        let formatted = notes.format_for_prompt(NOTES_PROMPT_LIMIT);
        assert!(formatted.len() <= NOTES_PROMPT_LIMIT);
    }
}
