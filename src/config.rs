//! Configuration management for arcade-pilot

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// Vision model provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// API key for the configured provider, if any.
    pub api_key: Option<String>,
    /// Default model identifier, e.g. `"openai/gpt-4o"`.
    pub default_model: String,
    /// Base URL of the provider's chat-completions-style endpoint.
    pub base_url: String,
    /// Screen-type phase timeout, in seconds.
    pub screen_type_timeout_secs: u64,
    /// Decision phase timeout, in seconds.
    pub decision_timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_model: "openai/gpt-4o".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            screen_type_timeout_secs: 30,
            decision_timeout_secs: 60,
        }
    }
}

/// Loop coordinator cadence/cooldown/checkpoint knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopConfig {
    /// Default period between the end of one iteration and the start of the next.
    pub iteration_period_ms: u64,
    /// Cooldown after a non-dialogue decision.
    pub cooldown_default_ms: u64,
    /// Cooldown after a decision whose screen was a dialogue.
    pub cooldown_dialogue_ms: u64,
    /// Hard per-iteration deadline from the start of the decision phase.
    pub iteration_deadline_secs: u64,
    /// Heartbeat emission cadence.
    pub heartbeat_interval_secs: u64,
    /// Heartbeat TTL in the KV store.
    pub heartbeat_ttl_secs: u64,
    /// Threshold after which a missing heartbeat means "client gone".
    pub client_gone_threshold_secs: u64,
    /// Number of decisions between automatic checkpoints.
    pub checkpoint_every_n_decisions: u64,
}

impl LoopConfig {
    /// Default inter-iteration period as a `Duration`.
    pub fn iteration_period(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.iteration_period_ms)
    }
    /// Cooldown after a non-dialogue decision, as a `Duration`.
    pub fn cooldown_default(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.cooldown_default_ms)
    }
    /// Cooldown after a dialogue-screen decision, as a `Duration`.
    pub fn cooldown_dialogue(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.cooldown_dialogue_ms)
    }
    /// Hard per-iteration deadline, as a `Duration`.
    pub fn iteration_deadline(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.iteration_deadline_secs)
    }
    /// Heartbeat emission cadence, as a `Duration`.
    pub fn heartbeat_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.heartbeat_interval_secs)
    }
    /// Heartbeat TTL in the KV store, as a `Duration`.
    pub fn heartbeat_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.heartbeat_ttl_secs)
    }
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            iteration_period_ms: 3_000,
            cooldown_default_ms: 500,
            cooldown_dialogue_ms: 8_000,
            iteration_deadline_secs: 30,
            heartbeat_interval_secs: 10,
            heartbeat_ttl_secs: 60,
            client_gone_threshold_secs: 30,
            checkpoint_every_n_decisions: 100,
        }
    }
}

/// Top-level configuration for the service.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Vision model provider settings.
    pub model: ModelConfig,
    /// Loop coordinator timing settings.
    pub loop_: LoopConfig,
}

impl Config {
    /// Load configuration from environment variables, with `.env` support.
    pub fn from_env() -> Self {
        let _ = dotenv::dotenv();

        let mut model = ModelConfig::default();
        if let Ok(key) = std::env::var("ARCADE_PILOT_MODEL_API_KEY") {
            model.api_key = Some(key);
        }
        if let Ok(m) = std::env::var("ARCADE_PILOT_DEFAULT_MODEL") {
            model.default_model = m;
        }
        if let Ok(url) = std::env::var("ARCADE_PILOT_MODEL_BASE_URL") {
            model.base_url = url;
        }

        Self {
            model,
            loop_: LoopConfig::default(),
        }
    }

    /// Load configuration from a JSON file, falling back to `from_env` if missing.
    pub fn load_from_file<P: AsRef<Path>>(
        path: P,
    ) -> std::result::Result<Self, Box<dyn std::error::Error>> {
        if !path.as_ref().exists() {
            warn!("config file not found, using environment defaults");
            return Ok(Self::from_env());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }
}
