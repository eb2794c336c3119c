//! Vision-capable chat model boundary (§4.5): the provider itself is out
//! of scope, so this module ships a trait, one provider-agnostic HTTP
//! implementation, and a scripted test double.

mod base;
mod fake;
mod http_client;

pub use base::{ChatInvokeCompletion, ChatInvokeUsage, ChatMessage, ContentPart, VisionChatModel};
pub use fake::FakeChatModel;
pub use http_client::HttpVisionModel;
