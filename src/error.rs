//! Error types for arcade-pilot

use thiserror::Error;

/// Top-level error type for the agent decision loop.
#[derive(Error, Debug)]
pub enum AgentError {
    /// Configuration could not be loaded or was invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error, e.g. reading a config file or a checkpoint.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP error talking to the vision model provider.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The frame source could not produce a frame this attempt; transient.
    #[error("frame unavailable: {0}")]
    FrameUnavailable(String),

    /// The frame source adapter is permanently gone; terminal for the run.
    #[error("adapter lost: {0}")]
    AdapterLost(String),

    /// `ReadMemory` is not implemented by this frame source.
    #[error("memory read unsupported")]
    ReadMemoryUnsupported,

    /// The decision-phase or screen-type-phase model call exceeded its deadline.
    #[error("model call timed out after {0:?}")]
    ModelTimeout(std::time::Duration),

    /// The model call failed (network, non-2xx, or provider-reported error).
    #[error("model call failed: {0}")]
    ModelError(String),

    /// The model's reply did not validate against the expected schema.
    #[error("schema violation: {0}")]
    SchemaViolation(String),

    /// A persistence operation (KV or blob) failed; callers log and continue.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// A value failed a structural invariant check.
    #[error("validation error: {0}")]
    Validation(String),

    /// No agent is registered under the given id.
    #[error("unknown agent: {0}")]
    UnknownAgent(String),

    /// The agent's coordinator could not honor the request in its current state.
    #[error("agent error: {0}")]
    Agent(String),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, AgentError>;
