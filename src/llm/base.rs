//! Base traits for vision-capable chat models.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::Result;

/// One piece of message content: either plain text or a base64 image.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Plain text content.
    Text {
        /// The text itself.
        text: String,
    },
    /// A base64-encoded PNG image, as a data URL.
    Image {
        /// `data:image/png;base64,...` payload.
        data_url: String,
    },
}

impl ContentPart {
    /// Convenience constructor for a text part.
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }

    /// Convenience constructor for an image part from a bare base64 PNG
    /// payload (without the `data:` prefix).
    pub fn image_png(base64_png: impl AsRef<str>) -> Self {
        ContentPart::Image {
            data_url: format!("data:image/png;base64,{}", base64_png.as_ref()),
        }
    }
}

/// Chat message for model communication. Content is a sequence of parts so
/// a single user turn can carry both instructions and a frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// `"system"`, `"user"`, or `"assistant"`.
    pub role: String,
    /// One or more content parts.
    pub content: Vec<ContentPart>,
}

impl ChatMessage {
    /// Build a message with an explicit role and parts.
    pub fn new(role: impl Into<String>, content: Vec<ContentPart>) -> Self {
        Self {
            role: role.into(),
            content,
        }
    }

    /// A system message with a single text part.
    pub fn system(text: impl Into<String>) -> Self {
        Self::new("system", vec![ContentPart::text(text)])
    }

    /// A user message with a single text part.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self::new("user", vec![ContentPart::text(text)])
    }

    /// A user message carrying text plus an image.
    pub fn user_with_image(text: impl Into<String>, base64_png: impl AsRef<str>) -> Self {
        Self::new(
            "user",
            vec![ContentPart::text(text), ContentPart::image_png(base64_png)],
        )
    }

    /// An assistant message with a single text part.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new("assistant", vec![ContentPart::text(text)])
    }
}

/// Token usage reported by a model invocation.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ChatInvokeUsage {
    /// Input/prompt tokens.
    pub prompt_tokens: u32,
    /// Output/completion tokens.
    pub completion_tokens: u32,
}

impl ChatInvokeUsage {
    /// Total tokens, prompt plus completion.
    pub fn total_tokens(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// Response from a model invocation: the raw text completion plus usage,
/// if the provider reported it.
#[derive(Debug, Clone)]
pub struct ChatInvokeCompletion {
    /// The model's raw text reply, before JSON extraction/repair.
    pub completion: String,
    /// Token usage, if reported.
    pub usage: Option<ChatInvokeUsage>,
}

impl ChatInvokeCompletion {
    /// Wrap a completion with no usage information.
    pub fn new(completion: impl Into<String>) -> Self {
        Self {
            completion: completion.into(),
            usage: None,
        }
    }

    /// Attach usage information.
    pub fn with_usage(mut self, usage: ChatInvokeUsage) -> Self {
        self.usage = Some(usage);
        self
    }
}

/// A vision-capable chat model: the boundary the Decision Step calls
/// through for both the screen-type and decision phases. The provider's
/// internals are out of scope; this crate ships one provider-agnostic HTTP
/// implementation plus a scripted test double.
#[async_trait]
pub trait VisionChatModel: Send + Sync {
    /// The opaque model identifier, e.g. `"openai/gpt-4o"`.
    fn model(&self) -> &str;

    /// Invoke the model with a bounded output size, returning its raw text
    /// reply. Callers (the Decision Step) apply their own timeout around
    /// this call; implementations should not impose a shorter one.
    ///
    /// `cancel` is the coordinator's cancellation token (§4.6, §9
    /// "Cancellation must be propagated to the HTTP client"); an
    /// implementation backed by a real network call must race the request
    /// against it so an aborted request actually releases its socket.
    async fn chat(
        &self,
        messages: &[ChatMessage],
        max_output_tokens: u32,
        cancel: &CancellationToken,
    ) -> Result<ChatInvokeCompletion>;
}
