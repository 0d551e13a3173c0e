//! Deterministic stand-in for a remote model.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::transport::TransportError;

use super::{ModelRequest, ModelResponse, SamplingParams, TextModel};

/// One queued reply.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Return this text.
    Text(String),
    /// Fail the exchange with a transport error.
    TransportFailure(String),
    /// Fail the exchange as if the remote answered with this HTTP status.
    Status(u16),
    /// Never answer; the call only ends when its future is dropped.
    Hang,
}

impl ScriptedReply {
    pub fn text(s: impl Into<String>) -> Self {
        ScriptedReply::Text(s.into())
    }
}

/// Replays replies in order and records every prompt it receives.
///
/// Once the script runs out, further calls fail with a transport error.
#[derive(Debug, Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<ScriptedReply>>,
    prompts: Mutex<Vec<String>>,
    sampling: Mutex<Vec<SamplingParams>>,
    calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn new(replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            ..Default::default()
        }
    }

    /// Script made only of text replies.
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(texts.into_iter().map(|t| ScriptedReply::Text(t.into())))
    }

    /// Number of exchanges attempted so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompts received, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn sampling_history(&self) -> Vec<SamplingParams> {
        self.sampling.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().map(|q| q.len()).unwrap_or(0)
    }
}

#[async_trait]
impl TextModel for ScriptedModel {
    fn model_id(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: ModelRequest<'_>) -> Result<ModelResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut p) = self.prompts.lock() {
            p.push(request.prompt.to_string());
        }
        if let Ok(mut s) = self.sampling.lock() {
            s.push(request.sampling);
        }

        let next = self.replies.lock().ok().and_then(|mut q| q.pop_front());
        match next {
            Some(ScriptedReply::Text(text)) => Ok(ModelResponse::from_text(text)),
            Some(ScriptedReply::TransportFailure(msg)) => Err(TransportError::Other(msg)),
            Some(ScriptedReply::Status(status)) => Err(TransportError::Status {
                status,
                message: format!("scripted HTTP {}", status),
            }),
            Some(ScriptedReply::Hang) => {
                std::future::pending::<()>().await;
                Err(TransportError::Other("unreachable".into()))
            }
            None => Err(TransportError::Other("script exhausted".into())),
        }
    }
}
