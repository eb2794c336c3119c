//! Frame Source Adapter (§4.1): the abstract boundary to the emulator.
//!
//! The emulator runtime itself is out of scope (spec.md §1); this module
//! only defines the trait boundary plus an in-process reference adapter
//! (`MockFrameSource`) used by tests, the CLI demo loop, and anywhere a
//! real emulator bridge has not been wired in.

mod mock;
pub mod parse_state;

pub use mock::MockFrameSource;
pub use parse_state::{parse_save_state, ParsedState};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{AgentError, Result};
use crate::types::Button;

/// One megabyte-free lower bound a captured frame must meet to be
/// considered valid, per §4.1's contract.
pub const MIN_FRAME_BYTES: usize = 1024;

/// A captured frame: base64-encoded PNG bytes plus the capture timestamp.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    /// Base64-encoded PNG payload.
    pub base64_png: String,
    /// When the frame was captured.
    pub captured_at: DateTime<Utc>,
}

/// Minimum hold duration, in milliseconds, for which a press is guaranteed
/// observable to the emulator before `press_and_release` returns.
pub const MIN_OBSERVABLE_HOLD_MS: u64 = 100;

/// Abstract emulator boundary. Capture and input calls are asynchronous
/// and non-blocking from the coordinator's perspective; the coordinator
/// is responsible for serializing its own calls (§4.1, no ordering
/// guarantee between concurrent capture/input from the same caller).
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Capture the current screen as a base64 PNG.
    async fn capture(&self) -> Result<CapturedFrame>;

    /// Press and release a button, holding for `hold_ms`. `Button::Wait` is
    /// a coordinator-only convention and must never be passed here.
    async fn press_and_release(&self, button: Button, hold_ms: u64) -> Result<()>;

    /// Set emulator audio volume, 0.0..=1.0.
    async fn set_volume(&self, volume: f32) -> Result<()>;

    /// Pause the emulator.
    async fn pause(&self) -> Result<()>;

    /// Resume the emulator.
    async fn resume(&self) -> Result<()>;

    /// Produce a save-state blob.
    async fn save_state(&self) -> Result<Vec<u8>>;

    /// Load a save-state blob.
    async fn load_state(&self, bytes: &[u8]) -> Result<()>;

    /// Read emulator memory, if supported.
    async fn read_memory(&self, addr: u32, len: u32) -> Result<Vec<u8>>;
}

/// Validate a captured frame against §4.1's size contract.
pub fn validate_frame(frame: &CapturedFrame) -> Result<()> {
    if frame.base64_png.len() < MIN_FRAME_BYTES {
        return Err(AgentError::FrameUnavailable(format!(
            "frame payload is {} bytes, below the {}-byte minimum",
            frame.base64_png.len(),
            MIN_FRAME_BYTES
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_below_1024_bytes_is_rejected() {
        let frame = CapturedFrame {
            base64_png: "x".repeat(999),
            captured_at: Utc::now(),
        };
        assert!(validate_frame(&frame).is_err());
    }

    #[test]
    fn frame_above_1024_bytes_is_accepted() {
        let frame = CapturedFrame {
            base64_png: "x".repeat(1001),
            captured_at: Utc::now(),
        };
        assert!(validate_frame(&frame).is_ok());
    }
}
