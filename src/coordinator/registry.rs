//! Agent registry (§9): one coordinator per agent, addressable by id.
//!
//! Uses a sharded concurrent map rather than a single `Mutex<HashMap<_>>`
//! so that creating/looking up one agent never blocks another agent's
//! decision loop (§9 option (a), "per-agent task").

use std::sync::Arc;

use dashmap::DashMap;

use crate::clock::Clock;
use crate::coordinator::loop_::Coordinator;
use crate::decision::DecisionStep;
use crate::error::{AgentError, Result};
use crate::frame_source::FrameSource;
use crate::memory::MemoryStore;
use crate::persistence::{BlobStore, KvStore};
use crate::LoopConfig;

/// Owns every live `Coordinator`, keyed by agent id.
pub struct CoordinatorRegistry {
    coordinators: DashMap<String, Arc<Coordinator>>,
    clock: Arc<dyn Clock>,
    kv: Arc<dyn KvStore>,
    blob: Arc<dyn BlobStore>,
    memory: Arc<MemoryStore>,
    frame_source: Arc<dyn FrameSource>,
    decision_step: Arc<DecisionStep>,
    loop_config: LoopConfig,
}

impl CoordinatorRegistry {
    /// Construct a registry sharing the given adapters/config across every
    /// agent it creates.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        clock: Arc<dyn Clock>,
        kv: Arc<dyn KvStore>,
        blob: Arc<dyn BlobStore>,
        memory: Arc<MemoryStore>,
        frame_source: Arc<dyn FrameSource>,
        decision_step: Arc<DecisionStep>,
        loop_config: LoopConfig,
    ) -> Self {
        Self {
            coordinators: DashMap::new(),
            clock,
            kv,
            blob,
            memory,
            frame_source,
            decision_step,
            loop_config,
        }
    }

    /// Get the existing coordinator for `agent_id`, or create one using
    /// `model_id` if this is the first time this agent id has been seen.
    pub fn get_or_create(&self, agent_id: &str, model_id: &str) -> Arc<Coordinator> {
        if let Some(existing) = self.coordinators.get(agent_id) {
            return existing.clone();
        }
        let coordinator = Arc::new(Coordinator::new(
            agent_id.to_string(),
            model_id.to_string(),
            self.clock.clone(),
            self.kv.clone(),
            self.blob.clone(),
            self.memory.clone(),
            self.frame_source.clone(),
            self.decision_step.clone(),
            self.loop_config.clone(),
        ));
        self.coordinators.insert(agent_id.to_string(), coordinator.clone());
        coordinator
    }

    /// Look up an existing coordinator, if any.
    pub fn get(&self, agent_id: &str) -> Option<Arc<Coordinator>> {
        self.coordinators.get(agent_id).map(|entry| entry.clone())
    }

    /// Look up an existing coordinator, or the `UnknownAgent` error.
    pub fn require(&self, agent_id: &str) -> Result<Arc<Coordinator>> {
        self.get(agent_id)
            .ok_or_else(|| AgentError::UnknownAgent(agent_id.to_string()))
    }

    /// Remove a coordinator entirely (does not touch its persisted state).
    pub fn remove(&self, agent_id: &str) -> Option<Arc<Coordinator>> {
        self.coordinators.remove(agent_id).map(|(_, coordinator)| coordinator)
    }

    /// Every live agent id, for listing/draining.
    pub fn agent_ids(&self) -> Vec<String> {
        self.coordinators.iter().map(|entry| entry.key().clone()).collect()
    }

    /// All live coordinators, for graceful-shutdown draining.
    pub fn all(&self) -> Vec<Arc<Coordinator>> {
        self.coordinators.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Number of live agents.
    pub fn len(&self) -> usize {
        self.coordinators.len()
    }

    /// True if no agents are currently registered.
    pub fn is_empty(&self) -> bool {
        self.coordinators.is_empty()
    }
}
