//! Attempt observation.
//!
//! The client reports each [`GenerationAttempt`] to an [`AttemptSink`] after it ends. Sinks
//! are application-controlled; the default collects nothing.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`NoopAttemptSink`] | Default no-op sink |
//! | [`InMemoryAttemptSink`] | Bounded in-memory sink for tests |
//! | [`JsonLinesAttemptSink`] | Writes one JSON object per attempt to a writer |

use async_trait::async_trait;
use std::io::Write;
use std::sync::{Arc, Mutex, RwLock};

use crate::generation::GenerationAttempt;
use crate::Result;

#[async_trait]
pub trait AttemptSink: Send + Sync {
    async fn record(&self, attempt: &GenerationAttempt) -> Result<()>;
}

/// Collects nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAttemptSink;

#[async_trait]
impl AttemptSink for NoopAttemptSink {
    async fn record(&self, _attempt: &GenerationAttempt) -> Result<()> {
        Ok(())
    }
}

pub fn noop_sink() -> Arc<dyn AttemptSink> {
    Arc::new(NoopAttemptSink)
}

/// In-memory sink for testing.
pub struct InMemoryAttemptSink {
    attempts: RwLock<Vec<GenerationAttempt>>,
    max_attempts: usize,
}

impl InMemoryAttemptSink {
    pub fn new(max: usize) -> Self {
        Self {
            attempts: RwLock::new(Vec::new()),
            max_attempts: max.max(1),
        }
    }

    pub fn attempts(&self) -> Vec<GenerationAttempt> {
        self.attempts.read().map(|a| a.clone()).unwrap_or_default()
    }

    pub fn by_invocation(&self, invocation_id: &str) -> Vec<GenerationAttempt> {
        self.attempts()
            .into_iter()
            .filter(|a| a.invocation_id == invocation_id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.attempts.read().map(|a| a.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryAttemptSink {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl AttemptSink for InMemoryAttemptSink {
    async fn record(&self, attempt: &GenerationAttempt) -> Result<()> {
        if let Ok(mut attempts) = self.attempts.write() {
            attempts.push(attempt.clone());
            if attempts.len() > self.max_attempts {
                attempts.remove(0);
            }
        }
        Ok(())
    }
}

/// Writes each attempt as a JSON line.
pub struct JsonLinesAttemptSink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesAttemptSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> Option<W> {
        self.writer.into_inner().ok()
    }
}

#[async_trait]
impl<W: Write + Send> AttemptSink for JsonLinesAttemptSink<W> {
    async fn record(&self, attempt: &GenerationAttempt) -> Result<()> {
        let line = serde_json::to_string(attempt)?;
        let mut writer = self.writer.lock().map_err(|_| {
            crate::Error::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "attempt writer poisoned",
            ))
        })?;
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::AttemptOutcome;

    fn attempt(id: &str, n: u32) -> GenerationAttempt {
        GenerationAttempt {
            invocation_id: id.into(),
            attempt: n,
            max_attempts: 3,
            raw_text: Some("nope".into()),
            candidate: None,
            trailing_array: false,
            outcome: AttemptOutcome::ExtractionFailure,
            error: Some("no JSON array found in model response".into()),
            duration_ms: 4,
        }
    }

    #[tokio::test]
    async fn test_in_memory_is_bounded() {
        let sink = InMemoryAttemptSink::new(2);
        for n in 1..=3 {
            sink.record(&attempt("a", n)).await.unwrap();
        }
        let kept: Vec<u32> = sink.attempts().iter().map(|a| a.attempt).collect();
        assert_eq!(kept, vec![2, 3]);
        assert_eq!(sink.by_invocation("b").len(), 0);
    }

    #[tokio::test]
    async fn test_json_lines() {
        let sink = JsonLinesAttemptSink::new(Vec::new());
        sink.record(&attempt("x", 1)).await.unwrap();
        let out = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        assert!(out.ends_with('\n'));
        let v: serde_json::Value = serde_json::from_str(out.trim()).unwrap();
        assert_eq!(v["outcome"], "extraction_failure");
        assert_eq!(v["attempt"], 1);
    }
}
