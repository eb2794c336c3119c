//! Provider-agnostic HTTP vision-chat client.
//!
//! Generalizes the teacher's `WatsonxChat`: a single concrete
//! implementation that speaks an OpenAI-chat-completions-shaped wire
//! format, since every provider the pack's examples touch is adapter-
//! compatible with that shape. Provider-specific quirks are out of scope.

use async_trait::async_trait;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::error::{AgentError, Result};
use crate::llm::base::{ChatInvokeCompletion, ChatInvokeUsage, ChatMessage, ContentPart, VisionChatModel};

/// An HTTP-backed vision chat model speaking the chat-completions wire
/// format against a configurable base URL.
pub struct HttpVisionModel {
    api_key: Option<String>,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl HttpVisionModel {
    /// Build a client for `model` against `base_url`, authenticating with
    /// `api_key` if present (sent as a bearer token).
    pub fn new(model: impl Into<String>, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            api_key,
            model: model.into(),
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    fn messages_to_wire(&self, messages: &[ChatMessage]) -> serde_json::Value {
        let wire_messages: Vec<serde_json::Value> = messages
            .iter()
            .map(|msg| {
                let parts: Vec<serde_json::Value> = msg
                    .content
                    .iter()
                    .map(|part| match part {
                        ContentPart::Text { text } => json!({"type": "text", "text": text}),
                        ContentPart::Image { data_url } => json!({
                            "type": "image_url",
                            "image_url": {"url": data_url},
                        }),
                    })
                    .collect();
                json!({"role": msg.role, "content": parts})
            })
            .collect();
        json!({"messages": wire_messages})
    }
}

#[async_trait]
impl VisionChatModel for HttpVisionModel {
    fn model(&self) -> &str {
        &self.model
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        max_output_tokens: u32,
        cancel: &CancellationToken,
    ) -> Result<ChatInvokeCompletion> {
        let mut payload = self.messages_to_wire(messages);
        payload["model"] = json!(self.model);
        payload["max_tokens"] = json!(max_output_tokens);

        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        // Race the send against the coordinator's cancellation token so a
        // reset/deadline during an in-flight call actually aborts the
        // socket instead of waiting the request out (§9 "Cancellation must
        // be propagated to the HTTP client").
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(AgentError::ModelError("request cancelled".into()));
            }
            result = request.send() => result?,
        };
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::ModelError(format!(
                "provider returned {status}: {body}"
            )));
        }

        let body: serde_json::Value = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(AgentError::ModelError("request cancelled".into()));
            }
            result = response.json() => result?,
        };
        let completion = body["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| AgentError::ModelError("response missing choices[0].message.content".into()))?
            .to_string();

        let usage = body.get("usage").map(|u| ChatInvokeUsage {
            prompt_tokens: u["prompt_tokens"].as_u64().unwrap_or(0) as u32,
            completion_tokens: u["completion_tokens"].as_u64().unwrap_or(0) as u32,
        });

        Ok(match usage {
            Some(u) => ChatInvokeCompletion::new(completion).with_usage(u),
            None => ChatInvokeCompletion::new(completion),
        })
    }
}
