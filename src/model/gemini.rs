//! Google Gemini generateContent API backend. Key points:
//! - Uses `contents` with `parts`, and a single `user` turn per attempt.
//! - `generationConfig` wraps temperature, topP and `maxOutputTokens`.
//! - Response text lives in `candidates[0].content.parts[*].text`.
//! - API key is sent in the `x-goog-api-key` header.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Instant;
use tracing::debug;
use url::Url;

use crate::config::ClientConfig;
use crate::transport::http::{build_http_client, resolve_api_key};
use crate::transport::TransportError;
use crate::{Error, ErrorContext, Result};

use super::{ModelRequest, ModelResponse, SamplingParams, TextModel, UsageInfo};

const PROVIDER: &str = "gemini";

/// Gemini `generateContent` client bound to one model and one credential.
#[derive(Clone)]
pub struct GeminiModel {
    http: reqwest::Client,
    endpoint: Url,
    model: String,
    api_key: String,
}

impl std::fmt::Debug for GeminiModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiModel")
            .field("endpoint", &self.endpoint.as_str())
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl GeminiModel {
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self> {
        let model = model.into();
        let endpoint = Self::endpoint_url(base_url, &model)?;
        Ok(Self {
            http,
            endpoint,
            model,
            api_key: api_key.into(),
        })
    }

    /// Build from configuration. With no explicit key, the keyring entry
    /// `quizgen/gemini` is tried, then `GEMINI_API_KEY`.
    pub fn from_config(config: &ClientConfig, api_key: Option<String>) -> Result<Self> {
        let api_key = api_key
            .filter(|k| !k.trim().is_empty())
            .or_else(|| resolve_api_key(PROVIDER))
            .ok_or_else(|| {
                Error::configuration_with_context(
                    "No Gemini API key available",
                    ErrorContext::new()
                        .with_details("set GEMINI_API_KEY or store a keyring entry quizgen/gemini")
                        .with_source("gemini_model"),
                )
            })?;
        let http = build_http_client(config)?;
        Self::new(http, &config.base_url, config.model.clone(), api_key)
    }

    fn endpoint_url(base_url: &str, model: &str) -> Result<Url> {
        let model = model.strip_prefix("models/").unwrap_or(model);
        let raw = format!(
            "{}/models/{}:generateContent",
            base_url.trim_end_matches('/'),
            model
        );
        Url::parse(&raw).map_err(|e| {
            Error::configuration_with_context(
                "Invalid Gemini endpoint",
                ErrorContext::new()
                    .with_field_path("config.base_url")
                    .with_details(format!("{}: {}", raw, e))
                    .with_source("gemini_model"),
            )
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub(crate) fn build_body(prompt: &str, sampling: &SamplingParams) -> Value {
        let mut gen_config = serde_json::json!({
            "temperature": sampling.temperature,
            "topP": sampling.top_p,
        });
        if let Some(mt) = sampling.max_output_tokens {
            gen_config["maxOutputTokens"] = serde_json::json!(mt);
        }
        serde_json::json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": gen_config,
        })
    }

    pub(crate) fn parse_body(body: &Value) -> ModelResponse {
        // { candidates: [{ content: { parts: [{text: "..."}] }, finishReason }], usageMetadata }
        let text = body
            .pointer("/candidates/0/content/parts")
            .and_then(|p| p.as_array())
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                    .collect::<String>()
            })
            .unwrap_or_default();

        let finish_reason = body
            .pointer("/candidates/0/finishReason")
            .and_then(|v| v.as_str())
            .map(|r| match r {
                "STOP" => "stop".to_string(),
                "MAX_TOKENS" => "length".to_string(),
                "SAFETY" | "RECITATION" => "content_filter".to_string(),
                other => other.to_lowercase(),
            });

        let usage = body.get("usageMetadata").map(|u| UsageInfo {
            prompt_tokens: u["promptTokenCount"].as_u64().unwrap_or(0),
            completion_tokens: u["candidatesTokenCount"].as_u64().unwrap_or(0),
            total_tokens: u["totalTokenCount"].as_u64().unwrap_or(0),
        });

        ModelResponse {
            text,
            finish_reason,
            usage,
        }
    }
}

#[async_trait]
impl TextModel for GeminiModel {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        request: ModelRequest<'_>,
    ) -> std::result::Result<ModelResponse, TransportError> {
        let body = Self::build_body(request.prompt, &request.sampling);
        let start = Instant::now();

        let resp = self
            .http
            .post(self.endpoint.clone())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            debug!(
                http_status = status.as_u16(),
                model = self.model.as_str(),
                duration_ms = start.elapsed().as_millis() as u64,
                "gemini request failed"
            );
            return Err(TransportError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let json: Value = resp.json().await?;
        let parsed = Self::parse_body(&json);
        debug!(
            model = self.model.as_str(),
            duration_ms = start.elapsed().as_millis() as u64,
            text_len = parsed.text.len(),
            finish_reason = parsed.finish_reason.as_deref().unwrap_or(""),
            "gemini request completed"
        );
        Ok(parsed)
    }
}
