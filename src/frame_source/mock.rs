//! In-process reference `FrameSource`, for tests, demos, and the CLI when
//! no real emulator bridge is configured.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::clock::{Clock, SystemClock};
use crate::error::{AgentError, Result};
use crate::frame_source::{CapturedFrame, FrameSource};
use crate::types::Button;
use std::sync::Arc;

struct Inner {
    script: Vec<String>,
    cursor: usize,
    pressed: Vec<(Button, u64)>,
    paused: bool,
}

/// A deterministic, in-memory `FrameSource`. Frames are either a fixed
/// scripted sequence (for reproducible tests) or synthesized on the fly
/// so each capture differs from the last.
pub struct MockFrameSource {
    inner: Mutex<Inner>,
    clock: Arc<dyn Clock>,
}

impl MockFrameSource {
    /// A source that synthesizes a fresh, changing frame on every capture.
    pub fn changing() -> Self {
        Self {
            inner: Mutex::new(Inner {
                script: vec![],
                cursor: 0,
                pressed: vec![],
                paused: false,
            }),
            clock: Arc::new(SystemClock),
        }
    }

    /// A source that replays a fixed sequence of base64 PNG payloads,
    /// repeating the last entry once exhausted. Useful for asserting on
    /// `no_change` streaks deterministically.
    pub fn scripted(frames: Vec<String>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                script: frames,
                cursor: 0,
                pressed: vec![],
                paused: false,
            }),
            clock: Arc::new(SystemClock),
        }
    }

    /// Override the clock, for deterministic capture timestamps in tests.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Every button press observed so far, in order.
    pub fn pressed_log(&self) -> Vec<(Button, u64)> {
        self.inner.lock().expect("mock frame source mutex poisoned").pressed.clone()
    }

    fn synth_frame(cursor: usize) -> String {
        // Pad a distinguishing marker out past the 1 KiB floor so it passes
        // `validate_frame` the way a real PNG payload would.
        format!("SYNTHFRAME{:08}{}", cursor, "A".repeat(1100))
    }
}

#[async_trait]
impl FrameSource for MockFrameSource {
    async fn capture(&self) -> Result<CapturedFrame> {
        let mut guard = self.inner.lock().expect("mock frame source mutex poisoned");
        let payload = if guard.script.is_empty() {
            let frame = Self::synth_frame(guard.cursor);
            guard.cursor += 1;
            frame
        } else {
            let idx = guard.cursor.min(guard.script.len() - 1);
            let frame = guard.script[idx].clone();
            if guard.cursor + 1 < guard.script.len() {
                guard.cursor += 1;
            }
            frame
        };
        Ok(CapturedFrame {
            base64_png: payload,
            captured_at: self.clock.now(),
        })
    }

    async fn press_and_release(&self, button: Button, hold_ms: u64) -> Result<()> {
        if button == Button::Wait {
            return Err(AgentError::Agent(
                "WAIT must never be forwarded to a FrameSource".to_string(),
            ));
        }
        let mut guard = self.inner.lock().expect("mock frame source mutex poisoned");
        guard.pressed.push((button, hold_ms));
        Ok(())
    }

    async fn set_volume(&self, _volume: f32) -> Result<()> {
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        self.inner.lock().expect("mock frame source mutex poisoned").paused = true;
        Ok(())
    }

    async fn resume(&self) -> Result<()> {
        self.inner.lock().expect("mock frame source mutex poisoned").paused = false;
        Ok(())
    }

    async fn save_state(&self) -> Result<Vec<u8>> {
        let guard = self.inner.lock().expect("mock frame source mutex poisoned");
        Ok(format!("mock-save-state@{}", guard.cursor).into_bytes())
    }

    async fn load_state(&self, _bytes: &[u8]) -> Result<()> {
        Ok(())
    }

    async fn read_memory(&self, _addr: u32, _len: u32) -> Result<Vec<u8>> {
        Err(AgentError::ReadMemoryUnsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_source_repeats_last_frame() {
        let source = MockFrameSource::scripted(vec!["a".repeat(1100), "b".repeat(1100)]);
        let f1 = source.capture().await.unwrap();
        let f2 = source.capture().await.unwrap();
        let f3 = source.capture().await.unwrap();
        assert_eq!(f1.base64_png, "a".repeat(1100));
        assert_eq!(f2.base64_png, "b".repeat(1100));
        assert_eq!(f3.base64_png, "b".repeat(1100));
    }

    #[tokio::test]
    async fn wait_is_rejected_by_press_and_release() {
        let source = MockFrameSource::changing();
        assert!(source.press_and_release(Button::Wait, 100).await.is_err());
    }

    #[tokio::test]
    async fn read_memory_is_unsupported_by_default() {
        let source = MockFrameSource::changing();
        assert!(matches!(
            source.read_memory(0, 1).await,
            Err(AgentError::ReadMemoryUnsupported)
        ));
    }
}
