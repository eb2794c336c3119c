//! Shared HTTP application state (§6): the coordinator registry plus the
//! adapters every route group needs, cloned cheaply into each handler.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::clock::Clock;
use crate::config::Config;
use crate::coordinator::CoordinatorRegistry;
use crate::memory::MemoryStore;
use crate::persistence::{BlobStore, KvStore};

/// Liveness/readiness flags surfaced by `/health`, `/livez`, `/readyz`.
#[derive(Default)]
pub struct ServeHealth {
    live: AtomicBool,
    ready: AtomicBool,
}

impl ServeHealth {
    /// Mark the process as having started serving traffic.
    pub fn mark_live(&self) {
        self.live.store(true, Ordering::SeqCst);
    }

    /// Mark the process as ready to accept decide/heartbeat traffic.
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::SeqCst);
    }

    /// True once `mark_live` has been called.
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    /// True once `mark_ready` has been called.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

/// The `axum` `State` extension shared by every route handler.
#[derive(Clone)]
pub struct ServeState {
    /// Every live agent's coordinator, addressable by agent id.
    pub registry: Arc<CoordinatorRegistry>,
    /// Shared key-value backend, for routes that read/write persisted keys directly.
    pub kv: Arc<dyn KvStore>,
    /// Shared blob backend, for checkpoint upload/list.
    pub blob: Arc<dyn BlobStore>,
    /// Shared memory store, for `/memstash`.
    pub memory: Arc<MemoryStore>,
    /// Loaded configuration.
    pub config: Arc<Config>,
    /// Injected clock, for deterministic tests of time-sensitive routes.
    pub clock: Arc<dyn Clock>,
    /// Process liveness/readiness.
    pub health: Arc<ServeHealth>,
}

impl ServeState {
    /// Construct shared state over the given adapters.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Arc<CoordinatorRegistry>,
        kv: Arc<dyn KvStore>,
        blob: Arc<dyn BlobStore>,
        memory: Arc<MemoryStore>,
        config: Arc<Config>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            kv,
            blob,
            memory,
            config,
            clock,
            health: Arc::new(ServeHealth::default()),
        }
    }
}
