//! arcade-pilot: an autonomous agent loop that plays a game emulator by
//! reading captured frames, asking a vision model for the next input, and
//! injecting it back through an abstract frame source.

pub mod clock;
pub mod config;
pub mod coordinator;
pub mod decision;
pub mod error;
pub mod frame_source;
pub mod heuristics;
pub mod llm;
pub mod logging;
pub mod memory;
pub mod persistence;
pub mod server;
pub mod types;
pub mod utils;

pub use config::{Config, LoopConfig, ModelConfig};
pub use error::{AgentError, Result};

/// Initialize process-wide concerns (structured logging) ahead of serving
/// or running a demo loop.
pub fn init() {
    logging::setup_logging();
}
