use crate::structured::{FieldCheck, RecordShape};
use crate::{Error, ErrorContext, Result};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Immutable description of one generation call.
///
/// Built through [`GenerationRequest::builder`], which validates everything up front so the
/// retry loop never starts on a request that could not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    role: String,
    task: String,
    shape: RecordShape,
    expected_count: Option<usize>,
    max_attempts: Option<u32>,
    field_check: FieldCheck,
}

impl GenerationRequest {
    pub fn builder(
        role: impl Into<String>,
        task: impl Into<String>,
        shape: RecordShape,
    ) -> GenerationRequestBuilder {
        GenerationRequestBuilder {
            role: role.into(),
            task: task.into(),
            shape,
            expected_count: None,
            max_attempts: None,
            field_check: FieldCheck::default(),
        }
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn shape(&self) -> &RecordShape {
        &self.shape
    }

    pub fn expected_count(&self) -> Option<usize> {
        self.expected_count
    }

    /// Attempt bound set on this request, if any; the client default applies otherwise.
    pub fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }

    pub fn field_check(&self) -> FieldCheck {
        self.field_check
    }
}

pub struct GenerationRequestBuilder {
    role: String,
    task: String,
    shape: RecordShape,
    expected_count: Option<usize>,
    max_attempts: Option<u32>,
    field_check: FieldCheck,
}

impl GenerationRequestBuilder {
    /// Require exactly `count` records.
    pub fn expected_count(mut self, count: usize) -> Self {
        self.expected_count = Some(count);
        self
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    pub fn field_check(mut self, check: FieldCheck) -> Self {
        self.field_check = check;
        self
    }

    pub fn build(self) -> Result<GenerationRequest> {
        self.shape.validate()?;

        if self.max_attempts == Some(0) {
            return Err(Error::validation_with_context(
                "max_attempts must be at least 1",
                ErrorContext::new()
                    .with_field_path("request.max_attempts")
                    .with_source("request_builder"),
            ));
        }
        if self.expected_count == Some(0) {
            return Err(Error::validation_with_context(
                "expected_count must be at least 1 when set",
                ErrorContext::new()
                    .with_field_path("request.expected_count")
                    .with_details("omit the count to accept any length")
                    .with_source("request_builder"),
            ));
        }
        if self.role.trim().is_empty() {
            tracing::warn!("generation request built with an empty role instruction");
        }

        Ok(GenerationRequest {
            role: self.role,
            task: self.task,
            shape: self.shape,
            expected_count: self.expected_count,
            max_attempts: self.max_attempts,
            field_check: self.field_check,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape() -> RecordShape {
        RecordShape::new().text("question").text("answer")
    }

    #[test]
    fn test_builder_defaults() {
        let req = GenerationRequest::builder("role", "task", shape())
            .build()
            .unwrap();
        assert_eq!(req.expected_count(), None);
        assert_eq!(req.max_attempts(), None);
        assert_eq!(req.field_check(), FieldCheck::Objects);
    }

    #[test]
    fn test_rejects_zero_attempts() {
        let err = GenerationRequest::builder("role", "task", shape())
            .max_attempts(0)
            .build()
            .unwrap_err();
        assert_eq!(
            err.context().and_then(|c| c.field_path.as_deref()),
            Some("request.max_attempts")
        );
    }

    #[test]
    fn test_rejects_zero_count() {
        assert!(GenerationRequest::builder("role", "task", shape())
            .expected_count(0)
            .build()
            .is_err());
    }

    #[test]
    fn test_rejects_empty_shape() {
        let err = GenerationRequest::builder("role", "task", RecordShape::new())
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }
}
