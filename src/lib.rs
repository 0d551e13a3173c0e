//! # quizgen
//!
//! Constrained JSON-array generation over free-form language models.
//!
//! A model is asked for an array of records with a declared shape and, optionally, an exact
//! count. Its reply is scanned for the first balanced JSON array, parsed, checked against the
//! shape and count, and on any failure the same instruction is sent again until an attempt
//! validates or the attempt bound is reached.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use quizgen::{ClientConfig, GenerationRequest, RecordShape, StrictOutputClient};
//!
//! #[tokio::main]
//! async fn main() -> quizgen::Result<()> {
//!     let config = ClientConfig::from_env()?;
//!     let client = StrictOutputClient::from_config(&config, None)?;
//!
//!     let request = GenerationRequest::builder(
//!         "You are an expert quiz generator.",
//!         "Generate EXACTLY 2 open ended questions about \"volcanoes\".",
//!         RecordShape::new().text("question").text("answer"),
//!     )
//!     .expected_count(2)
//!     .build()?;
//!
//!     let records = client.generate(&request).await?;
//!     println!("{}", serde_json::to_string_pretty(&records)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`structured`] | Record shapes, array extraction and validation |
//! | [`generation`] | Requests, instruction text and the retry loop |
//! | [`model`] | Remote model seam and the Gemini backend |
//! | [`transport`] | HTTP client construction and transport errors |
//! | [`telemetry`] | Per-attempt sinks |
//! | [`config`] | YAML and environment configuration |
//! | [`quiz`] | Quiz generation on top of the client |

pub mod config;
pub mod error;
pub mod generation;
pub mod model;
pub mod quiz;
pub mod structured;
pub mod telemetry;
pub mod transport;

pub use config::ClientConfig;
pub use error::{Error, ErrorContext};
pub use generation::{
    AttemptFailure, AttemptOutcome, ExponentialBackoff, GenerationAttempt, GenerationError,
    GenerationRequest, ImmediateRetry, RetryPolicy, StrictOutputClient,
    StrictOutputClientBuilder,
};
pub use model::{GeminiModel, ModelRequest, ModelResponse, SamplingParams, TextModel};
pub use quiz::{GeneratedQuiz, QuestionKind, QuizGenerator, QuizRequest};
pub use structured::{extract_array, FieldCheck, Record, RecordShape, ValidationError};
pub use telemetry::AttemptSink;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;
