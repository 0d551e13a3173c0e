use serde::{Deserialize, Serialize};

use super::error::AttemptOutcome;

/// Record of a single round-trip to the model.
///
/// Handed to the configured [`crate::telemetry::AttemptSink`] and then dropped; nothing
/// persists past the invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationAttempt {
    /// Correlates all attempts of one invocation.
    pub invocation_id: String,
    /// 1-based attempt index.
    pub attempt: u32,
    pub max_attempts: u32,
    /// Raw reply text, when the transport succeeded.
    pub raw_text: Option<String>,
    /// The extracted array text, when extraction succeeded.
    pub candidate: Option<String>,
    /// Another array followed the extracted one and was ignored.
    pub trailing_array: bool,
    pub outcome: AttemptOutcome,
    /// Failure description for unsuccessful attempts.
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl GenerationAttempt {
    pub(crate) fn start(invocation_id: &str, attempt: u32, max_attempts: u32) -> Self {
        Self {
            invocation_id: invocation_id.to_string(),
            attempt,
            max_attempts,
            raw_text: None,
            candidate: None,
            trailing_array: false,
            outcome: AttemptOutcome::Success,
            error: None,
            duration_ms: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == AttemptOutcome::Success
    }

    pub fn is_last(&self) -> bool {
        self.attempt >= self.max_attempts
    }
}
