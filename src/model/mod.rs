//! Remote generative model seam.
//!
//! The generation loop only ever sees [`TextModel`]: one instruction in, one block of text
//! out. Concrete backends translate that exchange to their wire format.
//!
//! | Backend | Description |
//! |---------|-------------|
//! | [`GeminiModel`] | Google `generateContent` over HTTPS |
//! | [`ScriptedModel`] | Replays queued responses; for tests and dry runs |

pub mod gemini;
pub mod scripted;

use async_trait::async_trait;

use crate::transport::TransportError;

pub use gemini::GeminiModel;
pub use scripted::{ScriptedModel, ScriptedReply};

/// Sampling parameters sent with every attempt.
///
/// Fixed for the lifetime of a client; tuned low so the model prefers its most
/// probable continuation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingParams {
    pub temperature: f64,
    pub top_p: f64,
    pub max_output_tokens: Option<u32>,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            top_p: 0.9,
            max_output_tokens: None,
        }
    }
}

/// One stateless request to the remote model.
#[derive(Debug, Clone, Copy)]
pub struct ModelRequest<'a> {
    /// Full instruction text, resent verbatim on every attempt.
    pub prompt: &'a str,
    pub sampling: SamplingParams,
}

/// Token usage information.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageInfo {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// Raw reply from the remote model.
#[derive(Debug, Clone, Default)]
pub struct ModelResponse {
    /// Concatenated text of the reply; empty when the model produced none.
    pub text: String,
    /// Finish reason normalized to lower snake case (`stop`, `length`, `content_filter`).
    pub finish_reason: Option<String>,
    pub usage: Option<UsageInfo>,
}

impl ModelResponse {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// A free-text generator reachable over some transport.
///
/// Implementations must hold no per-call mutable state visible to callers; the client
/// shares one instance across concurrent invocations.
#[async_trait]
pub trait TextModel: Send + Sync + std::fmt::Debug {
    /// Model identifier used in logs.
    fn model_id(&self) -> &str;

    /// Perform one request/response exchange.
    async fn generate(&self, request: ModelRequest<'_>) -> Result<ModelResponse, TransportError>;
}
