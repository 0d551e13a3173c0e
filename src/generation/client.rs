//! The constrained generation loop.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::model::{GeminiModel, ModelRequest, ModelResponse, SamplingParams, TextModel};
use crate::structured::{extract_array, Record, RecordValidator};
use crate::telemetry::{noop_sink, AttemptSink};
use crate::transport::TransportError;
use crate::Result;

use super::attempt::GenerationAttempt;
use super::error::{AttemptFailure, AttemptOutcome, GenerationError};
use super::policy::{ExponentialBackoff, ImmediateRetry, RetryPolicy};
use super::prompt::build_instruction;
use super::request::{GenerationRequest, DEFAULT_MAX_ATTEMPTS};

/// Asks a free-text model for an array of records and keeps asking until the reply validates.
///
/// The client owns no mutable state; clones share the model handle and may be used from
/// any number of tasks at once.
#[derive(Clone)]
pub struct StrictOutputClient {
    model: Arc<dyn TextModel>,
    sampling: SamplingParams,
    retry_policy: Arc<dyn RetryPolicy>,
    attempt_timeout: Option<Duration>,
    default_max_attempts: u32,
    sink: Arc<dyn AttemptSink>,
}

impl std::fmt::Debug for StrictOutputClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrictOutputClient")
            .field("model", &self.model)
            .field("sampling", &self.sampling)
            .field("retry_policy", &self.retry_policy)
            .field("attempt_timeout", &self.attempt_timeout)
            .field("default_max_attempts", &self.default_max_attempts)
            .finish_non_exhaustive()
    }
}

impl StrictOutputClient {
    pub fn builder(model: Arc<dyn TextModel>) -> StrictOutputClientBuilder {
        StrictOutputClientBuilder::new(model)
    }

    /// Gemini-backed client from configuration.
    pub fn from_config(config: &ClientConfig, api_key: Option<String>) -> Result<Self> {
        config.validate()?;
        let model = Arc::new(GeminiModel::from_config(config, api_key)?);
        Ok(Self::builder(model).apply_config(config).build())
    }

    pub fn model(&self) -> &Arc<dyn TextModel> {
        &self.model
    }

    pub fn sampling(&self) -> SamplingParams {
        self.sampling
    }

    /// Generate records for `request`.
    ///
    /// Returns every record of the first attempt that passes extraction, parsing, shape and
    /// count checks, or [`GenerationError::Exhausted`] once the attempt bound is reached.
    /// Dropping the returned future abandons the in-flight remote call.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<Vec<Record>> {
        self.run(request, None, Ok).await
    }

    /// Like [`generate`](Self::generate), decoding each record into `T`.
    ///
    /// A record that does not decode fails the attempt as a shape failure.
    pub async fn generate_as<T>(&self, request: &GenerationRequest) -> Result<Vec<T>>
    where
        T: DeserializeOwned + Send,
    {
        self.run(request, None, decode_records::<T>).await
    }

    /// Like [`generate`](Self::generate), stopping with [`GenerationError::Cancelled`] once
    /// `token` fires.
    pub async fn generate_cancellable(
        &self,
        request: &GenerationRequest,
        token: &CancellationToken,
    ) -> Result<Vec<Record>> {
        self.run(request, Some(token), Ok).await
    }

    pub async fn generate_as_cancellable<T>(
        &self,
        request: &GenerationRequest,
        token: &CancellationToken,
    ) -> Result<Vec<T>>
    where
        T: DeserializeOwned + Send,
    {
        self.run(request, Some(token), decode_records::<T>).await
    }

    async fn run<T, F>(
        &self,
        request: &GenerationRequest,
        cancel: Option<&CancellationToken>,
        decode: F,
    ) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(Vec<Record>) -> std::result::Result<Vec<T>, AttemptFailure> + Send + Sync,
    {
        let invocation_id = Uuid::new_v4().to_string();
        let max_attempts = request.max_attempts().unwrap_or(self.default_max_attempts);
        let prompt = build_instruction(request);
        let validator = RecordValidator::new(request.shape())
            .expected_count(request.expected_count())
            .field_check(request.field_check());
        let started = Instant::now();

        debug!(
            invocation_id = invocation_id.as_str(),
            model = self.model.model_id(),
            prompt_len = prompt.len(),
            expected_count = request.expected_count(),
            max_attempts,
            "starting constrained generation"
        );

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            if cancel.map_or(false, |t| t.is_cancelled()) {
                return Err(cancelled(&invocation_id, attempt - 1));
            }

            let attempt_start = Instant::now();
            let mut record = GenerationAttempt::start(&invocation_id, attempt, max_attempts);

            let reply = match until_cancelled(cancel, self.call_model(&prompt)).await {
                Some(reply) => reply,
                None => return Err(cancelled(&invocation_id, attempt)),
            };

            let result = match reply {
                Ok(response) => {
                    record.raw_text = Some(response.text.clone());
                    evaluate(&response, &validator, &decode, &mut record)
                }
                Err(e) => Err(AttemptFailure::Transport(e)),
            };
            record.duration_ms = attempt_start.elapsed().as_millis() as u64;

            match result {
                Ok(items) => {
                    record.outcome = AttemptOutcome::Success;
                    self.report(&record).await;
                    info!(
                        invocation_id = invocation_id.as_str(),
                        attempt,
                        max_attempts,
                        items = items.len(),
                        duration_ms = started.elapsed().as_millis() as u64,
                        "constrained generation succeeded"
                    );
                    return Ok(items);
                }
                Err(failure) => {
                    record.outcome = failure.outcome();
                    record.error = Some(failure.to_string());
                    self.report(&record).await;

                    if record.is_last() {
                        error!(
                            invocation_id = invocation_id.as_str(),
                            attempts = attempt,
                            outcome = failure.outcome().as_str(),
                            error = %failure,
                            duration_ms = started.elapsed().as_millis() as u64,
                            "constrained generation exhausted all attempts"
                        );
                        return Err(GenerationError::Exhausted {
                            attempts: attempt,
                            last: Box::new(failure),
                        }
                        .into());
                    }

                    let delay = self.retry_policy.delay(attempt, &failure);
                    warn!(
                        invocation_id = invocation_id.as_str(),
                        attempt,
                        max_attempts,
                        outcome = failure.outcome().as_str(),
                        error = %failure,
                        retry_in_ms = delay.as_millis() as u64,
                        "generation attempt failed"
                    );
                    if !delay.is_zero()
                        && until_cancelled(cancel, tokio::time::sleep(delay))
                            .await
                            .is_none()
                    {
                        return Err(cancelled(&invocation_id, attempt));
                    }
                }
            }
        }
    }

    async fn report(&self, record: &GenerationAttempt) {
        if let Err(e) = self.sink.record(record).await {
            warn!(
                invocation_id = record.invocation_id.as_str(),
                attempt = record.attempt,
                error = %e,
                "attempt sink failed; continuing"
            );
        }
    }

    async fn call_model(&self, prompt: &str) -> std::result::Result<ModelResponse, TransportError> {
        let exchange = self.model.generate(ModelRequest {
            prompt,
            sampling: self.sampling,
        });
        match self.attempt_timeout {
            Some(limit) => match tokio::time::timeout(limit, exchange).await {
                Ok(reply) => reply,
                Err(_) => Err(TransportError::Timeout {
                    after_ms: limit.as_millis() as u64,
                }),
            },
            None => exchange.await,
        }
    }
}

/// Race `fut` against the token; `None` means cancelled first.
async fn until_cancelled<F: Future>(cancel: Option<&CancellationToken>, fut: F) -> Option<F::Output> {
    match cancel {
        Some(token) => tokio::select! {
            biased;
            _ = token.cancelled() => None,
            out = fut => Some(out),
        },
        None => Some(fut.await),
    }
}

fn cancelled(invocation_id: &str, attempts_started: u32) -> crate::Error {
    info!(invocation_id, attempts_started, "constrained generation cancelled");
    GenerationError::Cancelled { attempts_started }.into()
}

fn evaluate<T, F>(
    response: &ModelResponse,
    validator: &RecordValidator<'_>,
    decode: &F,
    record: &mut GenerationAttempt,
) -> std::result::Result<Vec<T>, AttemptFailure>
where
    F: Fn(Vec<Record>) -> std::result::Result<Vec<T>, AttemptFailure>,
{
    let candidate = extract_array(&response.text).ok_or(AttemptFailure::Extraction)?;
    record.candidate = Some(candidate.as_str().to_string());
    record.trailing_array = candidate.has_trailing_array();
    if candidate.has_trailing_array() {
        warn!(
            invocation_id = record.invocation_id.as_str(),
            attempt = record.attempt,
            span_end = candidate.span().end,
            "model reply contains more than one JSON array; using the first"
        );
    }

    let records = validator.validate(candidate.as_str())?;
    decode(records)
}

fn decode_records<T: DeserializeOwned>(
    records: Vec<Record>,
) -> std::result::Result<Vec<T>, AttemptFailure> {
    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            serde_json::from_value(Value::Object(record)).map_err(|e| AttemptFailure::Shape {
                reason: format!("items[{}]: {}", index, e),
            })
        })
        .collect()
}

/// Builder for [`StrictOutputClient`].
pub struct StrictOutputClientBuilder {
    model: Arc<dyn TextModel>,
    sampling: SamplingParams,
    retry_policy: Arc<dyn RetryPolicy>,
    attempt_timeout: Option<Duration>,
    default_max_attempts: u32,
    sink: Arc<dyn AttemptSink>,
}

impl StrictOutputClientBuilder {
    pub fn new(model: Arc<dyn TextModel>) -> Self {
        Self {
            model,
            sampling: SamplingParams::default(),
            retry_policy: Arc::new(ImmediateRetry),
            attempt_timeout: None,
            default_max_attempts: DEFAULT_MAX_ATTEMPTS,
            sink: noop_sink(),
        }
    }

    /// Take sampling, attempt bound, timeout and backoff from `config`.
    pub fn apply_config(mut self, config: &ClientConfig) -> Self {
        self.sampling = SamplingParams {
            temperature: config.temperature,
            top_p: config.top_p,
            max_output_tokens: config.max_output_tokens,
        };
        self.default_max_attempts = config.max_attempts.max(1);
        self.attempt_timeout = config.attempt_timeout();
        if config.backoff_min_ms > 0 {
            self.retry_policy = Arc::new(ExponentialBackoff::from_millis(
                config.backoff_min_ms,
                config.backoff_max_ms,
            ));
        }
        self
    }

    pub fn sampling(mut self, sampling: SamplingParams) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn retry_policy(mut self, policy: impl RetryPolicy + 'static) -> Self {
        self.retry_policy = Arc::new(policy);
        self
    }

    /// Bound each remote call; expiry counts as a transport failure.
    pub fn attempt_timeout(mut self, limit: Duration) -> Self {
        self.attempt_timeout = Some(limit);
        self
    }

    /// Attempts used when a request does not set its own bound.
    pub fn default_max_attempts(mut self, attempts: u32) -> Self {
        self.default_max_attempts = attempts.max(1);
        self
    }

    pub fn attempt_sink(mut self, sink: Arc<dyn AttemptSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn build(self) -> StrictOutputClient {
        StrictOutputClient {
            model: self.model,
            sampling: self.sampling,
            retry_policy: self.retry_policy,
            attempt_timeout: self.attempt_timeout,
            default_max_attempts: self.default_max_attempts,
            sink: self.sink,
        }
    }
}
