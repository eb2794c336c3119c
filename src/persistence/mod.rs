//! Persistence layer: a typed key-value store and a blob store, both with
//! in-memory reference implementations (see §4.2 of SPEC_FULL.md).
//!
//! Concrete external backends (Redis, S3, ...) are deliberately not
//! fabricated here; the traits are the contract and the in-memory
//! implementations are what tests and local runs use.

mod blob;
mod kv;

pub use blob::{BlobEntry, BlobStore, InMemoryBlob};
pub use kv::{InMemoryKv, KvStore};

/// TTL applied to the agent heartbeat key.
pub const TTL_HEARTBEAT: std::time::Duration = std::time::Duration::from_secs(60);
/// TTL applied to reward-history keys.
pub const TTL_REWARD_HISTORY: std::time::Duration = std::time::Duration::from_secs(3600);
/// TTL applied to the stuck-state key.
pub const TTL_STUCK_STATE: std::time::Duration = std::time::Duration::from_secs(300);
/// TTL applied to the full persisted agent state record.
pub const TTL_AGENT_STATE: std::time::Duration = std::time::Duration::from_secs(86_400);

/// Build the namespaced key `agent:{id}:{suffix}`.
pub fn agent_key(agent_id: &str, suffix: &str) -> String {
    format!("agent:{agent_id}:{suffix}")
}

/// Build the key prefix used to delete every key belonging to an agent.
pub fn agent_prefix(agent_id: &str) -> String {
    format!("agent:{agent_id}:")
}

/// Build a shared leaderboard key `leaderboard:{kind}`.
pub fn leaderboard_key(kind: &str) -> String {
    format!("leaderboard:{kind}")
}
