//! Client configuration: defaults, YAML files and `QUIZGEN_*` environment overrides.

use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Everything needed to construct a [`crate::StrictOutputClient`] backed by Gemini.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub model: String,
    pub base_url: String,
    pub temperature: f64,
    pub top_p: f64,
    pub max_output_tokens: Option<u32>,
    pub max_attempts: u32,
    pub http_timeout_secs: u64,
    pub attempt_timeout_ms: Option<u64>,
    pub backoff_min_ms: u64,
    pub backoff_max_ms: u64,
    pub proxy_url: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: 0.2,
            top_p: 0.9,
            max_output_tokens: None,
            max_attempts: 3,
            http_timeout_secs: 30,
            attempt_timeout_ms: None,
            backoff_min_ms: 0,
            backoff_max_ms: 0,
            proxy_url: None,
        }
    }
}

impl ClientConfig {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml).map_err(|e| {
            Error::configuration_with_context(
                "Invalid client configuration",
                ErrorContext::new()
                    .with_details(e.to_string())
                    .with_source("config_loader"),
            )
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML file, then apply environment overrides on top.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let mut config = Self::from_yaml_str(&text)?;
        config.apply_env()?;
        Ok(config)
    }

    /// Overlay `QUIZGEN_*` environment variables onto this config.
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(v) = env::var("QUIZGEN_MODEL") {
            self.model = v;
        }
        if let Ok(v) = env::var("QUIZGEN_BASE_URL") {
            self.base_url = v;
        }
        if let Ok(v) = env::var("QUIZGEN_PROXY_URL") {
            self.proxy_url = Some(v);
        }
        if let Some(v) = parse_env("QUIZGEN_TEMPERATURE")? {
            self.temperature = v;
        }
        if let Some(v) = parse_env("QUIZGEN_TOP_P")? {
            self.top_p = v;
        }
        if let Some(v) = parse_env("QUIZGEN_MAX_ATTEMPTS")? {
            self.max_attempts = v;
        }
        if let Some(v) = parse_env("QUIZGEN_HTTP_TIMEOUT_SECS")? {
            self.http_timeout_secs = v;
        }
        if let Some(v) = parse_env::<u64>("QUIZGEN_ATTEMPT_TIMEOUT_MS")? {
            self.attempt_timeout_ms = Some(v).filter(|ms| *ms > 0);
        }
        if let Some(v) = parse_env("QUIZGEN_BACKOFF_MIN_MS")? {
            self.backoff_min_ms = v;
        }
        if let Some(v) = parse_env("QUIZGEN_BACKOFF_MAX_MS")? {
            self.backoff_max_ms = v;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(invalid("temperature", "must be within [0, 2]", self.temperature));
        }
        if !(self.top_p > 0.0 && self.top_p <= 1.0) {
            return Err(invalid("top_p", "must be within (0, 1]", self.top_p));
        }
        if self.max_attempts == 0 {
            return Err(invalid("max_attempts", "must be at least 1", self.max_attempts));
        }
        if self.model.trim().is_empty() {
            return Err(invalid("model", "must not be empty", "\"\""));
        }
        Ok(())
    }

    pub fn attempt_timeout(&self) -> Option<Duration> {
        self.attempt_timeout_ms.map(Duration::from_millis)
    }
}

fn parse_env<T: FromStr>(key: &str) -> Result<Option<T>> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            Error::configuration_with_context(
                format!("Cannot parse environment variable {}", key),
                ErrorContext::new()
                    .with_field_path(key)
                    .with_details(format!("value: {:?}", raw))
                    .with_source("config_env"),
            )
        }),
        Err(_) => Ok(None),
    }
}

fn invalid(field: &str, rule: &str, actual: impl std::fmt::Display) -> Error {
    Error::configuration_with_context(
        format!("{} {}", field, rule),
        ErrorContext::new()
            .with_field_path(format!("config.{}", field))
            .with_details(format!("got {}", actual))
            .with_source("config_validator"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_deterministic_sampling() {
        let config = ClientConfig::default();
        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.temperature, 0.2);
        assert_eq!(config.top_p, 0.9);
        assert_eq!(config.max_attempts, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_partial_override() {
        let config = ClientConfig::from_yaml_str(
            "model: gemini-2.0-flash\nmax_attempts: 5\nattempt_timeout_ms: 2500\n",
        )
        .unwrap();
        assert_eq!(config.model, "gemini-2.0-flash");
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.attempt_timeout(), Some(Duration::from_millis(2500)));
        assert_eq!(config.top_p, 0.9);
    }

    #[test]
    fn test_yaml_rejects_zero_attempts() {
        let err = ClientConfig::from_yaml_str("max_attempts: 0\n").unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
        assert!(err.to_string().contains("max_attempts"));
    }

    #[test]
    fn test_yaml_rejects_unknown_shape() {
        let err = ClientConfig::from_yaml_str("temperature: [1, 2]\n").unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn test_out_of_range_sampling() {
        let mut config = ClientConfig::default();
        config.top_p = 0.0;
        assert!(config.validate().is_err());
        config.top_p = 1.0;
        config.temperature = 2.5;
        assert!(config.validate().is_err());
    }
}
