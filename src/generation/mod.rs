//! Bounded retry loop that turns free-text replies into validated records.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`GenerationRequest`] | Role, task, shape, count and attempt bound |
//! | [`build_instruction`] | The single instruction resent on every attempt |
//! | [`StrictOutputClient`] | Runs attempts until one validates or the bound is hit |
//! | [`RetryPolicy`] | Pause between failed attempts; immediate by default |
//! | [`GenerationAttempt`] | Per-attempt record handed to an attempt sink |

pub mod attempt;
pub mod client;
pub mod error;
pub mod policy;
pub mod prompt;
pub mod request;

pub use attempt::GenerationAttempt;
pub use client::{StrictOutputClient, StrictOutputClientBuilder};
pub use error::{AttemptFailure, AttemptOutcome, GenerationError};
pub use policy::{ExponentialBackoff, ImmediateRetry, RetryPolicy};
pub use prompt::build_instruction;
pub use request::{GenerationRequest, GenerationRequestBuilder, DEFAULT_MAX_ATTEMPTS};
