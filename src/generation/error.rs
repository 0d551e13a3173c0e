use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::structured::ValidationError;
use crate::transport::TransportError;

/// Coarse classification of how an attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    TransportFailure,
    ExtractionFailure,
    ParseFailure,
    ShapeFailure,
    CountMismatch,
}

impl AttemptOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptOutcome::Success => "success",
            AttemptOutcome::TransportFailure => "transport_failure",
            AttemptOutcome::ExtractionFailure => "extraction_failure",
            AttemptOutcome::ParseFailure => "parse_failure",
            AttemptOutcome::ShapeFailure => "shape_failure",
            AttemptOutcome::CountMismatch => "count_mismatch",
        }
    }
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a single attempt failed. All variants are retryable.
#[derive(Debug, Error)]
pub enum AttemptFailure {
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    #[error("no JSON array found in model response")]
    Extraction,

    #[error("parse failure: {message} (line {line}, column {column})")]
    Parse {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("shape failure: {reason}")]
    Shape { reason: String },

    #[error("count mismatch: expected {expected} items, got {actual}")]
    CountMismatch { expected: usize, actual: usize },
}

impl AttemptFailure {
    pub fn outcome(&self) -> AttemptOutcome {
        match self {
            AttemptFailure::Transport(_) => AttemptOutcome::TransportFailure,
            AttemptFailure::Extraction => AttemptOutcome::ExtractionFailure,
            AttemptFailure::Parse { .. } => AttemptOutcome::ParseFailure,
            AttemptFailure::Shape { .. } => AttemptOutcome::ShapeFailure,
            AttemptFailure::CountMismatch { .. } => AttemptOutcome::CountMismatch,
        }
    }
}

impl From<ValidationError> for AttemptFailure {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::Parse {
                message,
                line,
                column,
            } => AttemptFailure::Parse {
                message,
                line,
                column,
            },
            ValidationError::Count { expected, actual } => {
                AttemptFailure::CountMismatch { expected, actual }
            }
            shape => AttemptFailure::Shape {
                reason: shape.to_string(),
            },
        }
    }
}

/// Terminal failure of a generation call.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Every attempt failed; carries the last attempt's cause.
    #[error("generation failed after {attempts} attempt(s): {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<AttemptFailure>,
    },

    /// The caller cancelled the invocation.
    #[error("generation cancelled after {attempts_started} attempt(s) started")]
    Cancelled { attempts_started: u32 },
}

impl GenerationError {
    pub fn last_failure(&self) -> Option<&AttemptFailure> {
        match self {
            GenerationError::Exhausted { last, .. } => Some(last),
            GenerationError::Cancelled { .. } => None,
        }
    }

    /// Remote calls started before the error was raised.
    pub fn attempts(&self) -> u32 {
        match self {
            GenerationError::Exhausted { attempts, .. } => *attempts,
            GenerationError::Cancelled { attempts_started } => *attempts_started,
        }
    }
}
